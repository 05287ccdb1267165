//! Scripted camera backend for exercising acquisition and sampling without
//! hardware.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use letdance_core::Timestamp;
use parking_lot::Mutex;

use crate::device::{CameraBackend, CameraDevice};
use crate::error::{OpenError, ReadError};
use crate::frame::{CaptureSettings, DeviceId, Resolution, VideoFrame};

/// Outcome of one scripted read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStep {
    /// Non-empty frame at the configured resolution
    Frame,
    /// Frame with no pixel data
    Empty,
    /// Driver error
    Fail,
}

/// Behaviour of one simulated device
#[derive(Debug, Clone)]
pub struct MockDevice {
    opens: bool,
    script: VecDeque<ReadStep>,
    then: ReadStep,
}

impl MockDevice {
    /// Opens and streams frames indefinitely
    pub fn live() -> Self {
        Self {
            opens: true,
            script: VecDeque::new(),
            then: ReadStep::Frame,
        }
    }

    /// Opens but never delivers pixels
    pub fn dark() -> Self {
        Self {
            then: ReadStep::Empty,
            ..Self::live()
        }
    }

    /// Refuses to open
    pub fn unavailable() -> Self {
        Self {
            opens: false,
            ..Self::live()
        }
    }

    /// Reads consumed in order before falling back to the default step.
    /// The script is shared across opens, so probe reads consume it too.
    pub fn with_script(mut self, steps: Vec<ReadStep>) -> Self {
        self.script = steps.into();
        self
    }

    /// Step returned once the script is exhausted
    pub fn then(mut self, step: ReadStep) -> Self {
        self.then = step;
        self
    }

    fn next_step(&mut self) -> ReadStep {
        self.script.pop_front().unwrap_or(self.then)
    }
}

/// Counters observed by tests
#[derive(Debug, Default)]
pub struct MockStats {
    opens: AtomicUsize,
    closes: AtomicUsize,
    reads: AtomicUsize,
    open_handles: AtomicUsize,
}

impl MockStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Devices opened and not yet closed
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

/// Backend with a fixed set of scripted devices. Like a real driver it
/// allows a single open handle at a time.
#[derive(Debug, Default)]
pub struct MockCameraBackend {
    devices: HashMap<DeviceId, Arc<Mutex<MockDevice>>>,
    stats: Arc<MockStats>,
}

impl MockCameraBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, id: DeviceId, device: MockDevice) -> Self {
        self.devices.insert(id, Arc::new(Mutex::new(device)));
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl CameraBackend for MockCameraBackend {
    async fn open(
        &self,
        device: DeviceId,
        settings: &CaptureSettings,
    ) -> Result<Box<dyn CameraDevice>, OpenError> {
        let behaviour = self.devices.get(&device).ok_or(OpenError::NotFound(device))?;

        if !behaviour.lock().opens {
            return Err(OpenError::Driver {
                device,
                reason: "scripted open failure".into(),
            });
        }

        if self.stats.open_handles() > 0 {
            return Err(OpenError::Busy(device));
        }

        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        self.stats.open_handles.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockOpenDevice {
            id: device,
            resolution: settings.resolution,
            behaviour: Arc::clone(behaviour),
            stats: Arc::clone(&self.stats),
            sequence: 0,
            open: true,
        }))
    }
}

struct MockOpenDevice {
    id: DeviceId,
    resolution: Resolution,
    behaviour: Arc<Mutex<MockDevice>>,
    stats: Arc<MockStats>,
    sequence: u64,
    open: bool,
}

#[async_trait]
impl CameraDevice for MockOpenDevice {
    fn id(&self) -> DeviceId {
        self.id
    }

    async fn read(&mut self) -> Result<VideoFrame, ReadError> {
        if !self.open {
            return Err(ReadError::Closed);
        }

        self.stats.reads.fetch_add(1, Ordering::SeqCst);
        let step = self.behaviour.lock().next_step();
        self.sequence += 1;

        let data = match step {
            ReadStep::Fail => return Err(ReadError::Driver("scripted read failure".into())),
            ReadStep::Empty => Vec::new(),
            ReadStep::Frame => vec![0u8; self.resolution.pixels() * 3],
        };

        Ok(VideoFrame {
            device: self.id,
            sequence: self.sequence,
            captured_at: Timestamp::now(),
            resolution: self.resolution,
            data,
        })
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
            self.stats.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockOpenDevice {
    fn drop(&mut self) {
        // an unclosed device still frees the driver, but is not counted as a close
        if self.open {
            self.stats.open_handles.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
