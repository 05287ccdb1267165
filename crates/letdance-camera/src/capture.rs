//! One-shot still capture for the remote vision stage.

use tracing::{debug, info};

use crate::arbiter::CameraArbiter;
use crate::error::CaptureError;
use crate::frame::{DeviceId, VideoFrame};

/// Reads allowed to produce the still frame
pub const CAPTURE_READ_ATTEMPTS: usize = 3;

/// Acquire a camera, keep the first non-empty frame, and release.
///
/// The handle is released before returning on every path, so the sampling
/// stage can acquire right after.
pub async fn capture_once(
    arbiter: &CameraArbiter,
    candidates: &[DeviceId],
) -> Result<VideoFrame, CaptureError> {
    let mut handle = arbiter.acquire(candidates).await?;
    let device = handle.device_id();

    let mut captured = None;
    for attempt in 1..=CAPTURE_READ_ATTEMPTS {
        match handle.read().await {
            Ok(frame) if !frame.is_empty() => {
                captured = Some(frame);
                break;
            }
            Ok(_) => debug!("Capture read {} on {} was empty", attempt, device),
            Err(e) => debug!("Capture read {} on {} failed: {}", attempt, device, e),
        }
    }

    handle.release();

    match captured {
        Some(frame) => {
            info!(
                "Captured {}x{} frame from {}",
                frame.resolution.width, frame.resolution.height, device
            );
            Ok(frame)
        }
        None => Err(CaptureError::NoFrame {
            device,
            attempts: CAPTURE_READ_ATTEMPTS,
        }),
    }
}
