//! Exclusive access to the single physical camera.
//!
//! At most one [`CameraHandle`] exists per arbiter. The handle closes its
//! device exactly once: either through [`CameraHandle::release`] or, as a
//! backstop, when dropped on an early-return path.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::{CameraBackend, CameraDevice};
use crate::error::{AcquisitionError, ReadError};
use crate::frame::{CaptureSettings, DeviceId, VideoFrame};

/// Probe timing and acceptance parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Wait after opening before trusting any frame (milliseconds)
    pub settle_delay_ms: u64,

    /// Frames read and thrown away after the settle delay
    pub warmup_frames: usize,

    /// Reads allowed to produce one non-empty frame
    pub probe_reads: usize,

    /// Wait before the single re-probe round (milliseconds)
    pub retry_delay_ms: u64,

    /// Settings applied on open
    pub capture: CaptureSettings,
}

impl ProbeConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 1000,
            warmup_frames: 2,
            probe_reads: 3,
            retry_delay_ms: 5000,
            capture: CaptureSettings::default(),
        }
    }
}

/// Shared record of which device, if any, is currently handed out
type Slot = Arc<Mutex<Option<DeviceId>>>;

/// Serializes access to one camera across capture stages
pub struct CameraArbiter {
    backend: Arc<dyn CameraBackend>,
    config: ProbeConfig,
    slot: Slot,
}

impl CameraArbiter {
    pub fn new(backend: Arc<dyn CameraBackend>, config: ProbeConfig) -> Self {
        Self {
            backend,
            config,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Device held by an unreleased handle
    pub fn outstanding(&self) -> Option<DeviceId> {
        *self.slot.lock()
    }

    /// Probe `candidates` in order and open the first live one.
    ///
    /// All candidates failing triggers one wait-and-reprobe round before
    /// surfacing [`AcquisitionError::NoCameraAvailable`]. An unreleased
    /// handle from an earlier stage fails immediately without touching the
    /// device.
    pub async fn acquire(&self, candidates: &[DeviceId]) -> Result<CameraHandle, AcquisitionError> {
        if candidates.is_empty() {
            return Err(AcquisitionError::NoCameraAvailable { probed: Vec::new() });
        }

        if let Some(device) = self.outstanding() {
            warn!("Camera {} still held by a previous stage", device);
            return Err(AcquisitionError::HandleOutstanding { device });
        }

        for round in 0..2 {
            if round > 0 {
                warn!(
                    "No camera among {:?}, re-probing in {:?}",
                    candidates,
                    self.config.retry_delay()
                );
                tokio::time::sleep(self.config.retry_delay()).await;
            }

            for &candidate in candidates {
                if let Some(device) = self.probe(candidate).await {
                    return self.claim(device);
                }
            }
        }

        Err(AcquisitionError::NoCameraAvailable {
            probed: candidates.to_vec(),
        })
    }

    /// Candidates that currently probe as live. Every probed device is closed
    /// again; nothing is probed while a handle is outstanding.
    pub async fn available(&self, candidates: &[DeviceId]) -> Vec<DeviceId> {
        if self.outstanding().is_some() {
            return Vec::new();
        }

        let mut live = Vec::new();
        for &candidate in candidates {
            if let Some(mut device) = self.probe(candidate).await {
                device.close();
                live.push(candidate);
            }
        }
        live
    }

    /// Explicit release; equivalent to [`CameraHandle::release`]
    pub fn release(&self, handle: CameraHandle) {
        handle.release();
    }

    async fn probe(&self, candidate: DeviceId) -> Option<Box<dyn CameraDevice>> {
        let mut device = match self.backend.open(candidate, &self.config.capture).await {
            Ok(device) => device,
            Err(e) => {
                debug!("Probe {}: {}", candidate, e);
                return None;
            }
        };

        tokio::time::sleep(self.config.settle_delay()).await;

        for _ in 0..self.config.warmup_frames {
            let _ = device.read().await;
        }

        for attempt in 1..=self.config.probe_reads {
            match device.read().await {
                Ok(frame) if !frame.is_empty() => {
                    debug!("Probe {}: live on read {}", candidate, attempt);
                    return Some(device);
                }
                Ok(_) => debug!("Probe {}: empty frame on read {}", candidate, attempt),
                Err(e) => debug!("Probe {}: read {} failed: {}", candidate, attempt, e),
            }
        }

        device.close();
        None
    }

    fn claim(&self, mut device: Box<dyn CameraDevice>) -> Result<CameraHandle, AcquisitionError> {
        let id = device.id();
        let mut slot = self.slot.lock();

        if let Some(holder) = *slot {
            device.close();
            return Err(AcquisitionError::HandleOutstanding { device: holder });
        }

        *slot = Some(id);
        info!("Camera {} acquired", id);

        Ok(CameraHandle {
            id,
            device: Some(device),
            slot: Arc::clone(&self.slot),
        })
    }
}

/// Open camera owned by exactly one stage
pub struct CameraHandle {
    id: DeviceId,
    device: Option<Box<dyn CameraDevice>>,
    slot: Slot,
}

impl CameraHandle {
    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub async fn read(&mut self) -> Result<VideoFrame, ReadError> {
        match self.device.as_mut() {
            Some(device) => device.read().await,
            None => Err(ReadError::Closed),
        }
    }

    /// Close the device and free the arbiter slot
    pub fn release(mut self) {
        self.close();
    }

    fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            *self.slot.lock() = None;
            info!("Camera {} released", self.id);
        }
    }
}

impl Drop for CameraHandle {
    fn drop(&mut self) {
        if self.device.is_some() {
            warn!("Camera {} handle dropped without release; closing", self.id);
            self.close();
        }
    }
}

impl std::fmt::Debug for CameraHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHandle")
            .field("id", &self.id)
            .field("open", &self.device.is_some())
            .finish()
    }
}
