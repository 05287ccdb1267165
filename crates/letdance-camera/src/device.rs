//! Camera driver abstraction.

use async_trait::async_trait;

use crate::error::{OpenError, ReadError};
use crate::frame::{CaptureSettings, DeviceId, VideoFrame};

/// Platform capture API: opens devices by identifier
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn open(
        &self,
        device: DeviceId,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn CameraDevice>, OpenError>;
}

/// An open device
#[async_trait]
pub trait CameraDevice: Send {
    fn id(&self) -> DeviceId;

    /// Blocks until a frame arrives or the driver times out
    async fn read(&mut self) -> Result<VideoFrame, ReadError>;

    /// Close the device and drop any driver-side buffering. Idempotent.
    fn close(&mut self);
}
