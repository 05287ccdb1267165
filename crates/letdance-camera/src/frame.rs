//! Raw video frames and device identifiers.

use std::fmt;

use letdance_core::Timestamp;
use serde::{Deserialize, Serialize};

/// Camera index as understood by the platform capture API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "camera{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(640, 480)
    }
}

/// Options applied when a device is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub resolution: Resolution,
    /// Driver-side frame queue; 1 keeps reads close to live
    pub buffer_frames: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            buffer_frames: 1,
        }
    }
}

/// One frame as delivered by the driver (packed BGR bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    pub device: DeviceId,
    pub sequence: u64,
    pub captured_at: Timestamp,
    pub resolution: Resolution,
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// A frame with no pixels is not evidence of a live feed
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() || self.resolution.pixels() == 0
    }
}

/// Frame metadata without pixel data, for logs and tool responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub device: DeviceId,
    pub sequence: u64,
    pub captured_at: Timestamp,
    pub resolution: Resolution,
    pub byte_len: usize,
}

impl From<&VideoFrame> for FrameInfo {
    fn from(frame: &VideoFrame) -> Self {
        Self {
            device: frame.device,
            sequence: frame.sequence,
            captured_at: frame.captured_at,
            resolution: frame.resolution,
            byte_len: frame.data.len(),
        }
    }
}
