//! # LETDANCE-Session
//!
//! Realtime movement-to-emotion sessions over the shared camera, and the
//! tool operations the installation's orchestration layer calls.
//!
//! ## Pipeline
//!
//! ```text
//! CameraArbiter ─▶ PoseDetector ─▶ MovementAnalyzer ─▶ AnalysisRecord
//!                                                          │
//!                        SessionSummary ◀── Finalizing ◀───┘
//! ```
//!
//! Collaborators (camera backend, detector, frame sink) are passed in by
//! the caller; nothing here is process-global.

pub mod config;
pub mod detector;
pub mod session;
pub mod sink;
pub mod summary;
pub mod tools;

pub use self::config::*;
pub use detector::*;
pub use session::*;
pub use sink::*;
pub use summary::*;
pub use tools::*;
