//! Camera error types.

use thiserror::Error;

use crate::frame::DeviceId;

/// Failure to obtain a camera handle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("No camera available after probing {probed:?}")]
    NoCameraAvailable { probed: Vec<DeviceId> },

    #[error("Camera handle for {device} is still held; release it before acquiring again")]
    HandleOutstanding { device: DeviceId },
}

/// Failure to open a single device
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("Device {0} not found")]
    NotFound(DeviceId),

    #[error("Device {0} is busy")]
    Busy(DeviceId),

    #[error("Device {device} failed to open: {reason}")]
    Driver { device: DeviceId, reason: String },
}

/// Single frame read failure; recoverable and counted by the caller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("Device handle already closed")]
    Closed,

    #[error("Frame read timed out after {0}ms")]
    Timeout(u64),

    #[error("Device read failed: {0}")]
    Driver(String),

    #[error("Device returned an empty frame")]
    EmptyFrame,
}

/// Failure of the one-shot capture stage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error("Camera {device} produced no usable frame in {attempts} reads")]
    NoFrame { device: DeviceId, attempts: usize },
}
