//! # LETDANCE-LMA
//!
//! Laban Movement Analysis over a sliding window of body keypoints, and
//! emotion recognition against a fixed template table.
//!
//! ## Effort Factors
//!
//! Each factor is scored in [-1, 1]:
//!
//! - **Weight**: Light vs Strong (body expansion and vertical bias)
//! - **Time**: Sustained vs Sudden (inter-frame displacement)
//! - **Flow**: Bound vs Free (steadiness of displacement over the window)
//! - **Space**: Direct vs Indirect (disparity of limb reach)
//!
//! ## Emotion Mapping
//!
//! The four-factor vector is matched against eight emotion templates tuned
//! for dance; weak matches fall back to neutral.

pub mod analyzer;
pub mod descriptor;
pub mod effort;
pub mod emotion;
pub mod quality;
pub mod space;

#[cfg(test)]
mod fixtures;

pub use analyzer::*;
pub use descriptor::*;
pub use effort::*;
pub use emotion::*;
pub use quality::*;
pub use space::*;
