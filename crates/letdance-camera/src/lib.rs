//! # LETDANCE-Camera
//!
//! Arbitration of the single physical camera shared by the installation's
//! two capture stages:
//!
//! 1. **One-shot capture**: a still image for the remote vision call
//! 2. **Realtime sampling**: a continuous frame stream for pose analysis
//!
//! The device driver allows only one open handle, so the stages run strictly
//! one after the other. The arbiter probes candidate devices, hands out a
//! single [`CameraHandle`], and refuses to acquire while a handle is still
//! live instead of letting two stages fight over frames.
//!
//! ## Probe Sequence
//!
//! ```text
//! open ─▶ settle delay ─▶ discard warm-up frames ─▶ read until non-empty
//!   │                                                   │
//!   └── next candidate ◀──────── close ◀── no frame ────┘
//! ```
//!
//! When every candidate fails, the arbiter waits once and re-probes before
//! reporting [`AcquisitionError::NoCameraAvailable`].

pub mod arbiter;
pub mod capture;
pub mod device;
pub mod error;
pub mod frame;
pub mod mock;

pub use arbiter::*;
pub use capture::*;
pub use device::*;
pub use error::*;
pub use frame::*;
pub use mock::*;
