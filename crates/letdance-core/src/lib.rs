//! # LETDANCE-Core
//!
//! Core types shared by the LETDANCE movement-to-emotion engine: body
//! keypoints, keypoint frames, the motion history window and the bounded
//! movement-quality vector.

pub mod error;
pub mod geometry;
pub mod history;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use history::*;
pub use types::*;
