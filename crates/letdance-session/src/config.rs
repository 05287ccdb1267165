//! Engine configuration.

use std::time::Duration;

use letdance_camera::{DeviceId, ProbeConfig};
use letdance_core::{Error, Result, DEFAULT_HISTORY_LENGTH};
use letdance_lma::{NEUTRAL_THRESHOLD, REFERENCE_DISPLACEMENT};
use serde::{Deserialize, Serialize};

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Camera discovery and probing
    pub camera: CameraConfig,

    /// Realtime sampling session
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device indices probed in order
    pub candidates: Vec<DeviceId>,

    /// Settle delay, warm-up, probe reads and retry delay
    pub probe: ProbeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Session length when the request names none (seconds)
    pub duration_secs: u64,

    /// Detector confidence threshold
    pub confidence_threshold: f32,

    /// Motion history window length (frames)
    pub max_history: usize,

    /// Pause after each sample (milliseconds)
    pub sample_interval_ms: u64,

    /// Pause after a failed read (milliseconds)
    pub failure_backoff_ms: u64,

    /// Consecutive read failures treated as device loss
    pub max_consecutive_failures: u32,

    /// Records kept in the summary
    pub recent_records: usize,

    /// Emit annotated samples to the frame sink
    pub save_frames: bool,

    /// Emit every Nth frame
    pub save_interval: u64,

    /// Similarity under which a match is reported as neutral
    pub neutral_threshold: f64,

    /// Per-frame displacement mapped to time = +1
    pub reference_displacement: f64,

    /// Completed session summaries kept for `get_summary`
    pub session_history: usize,
}

impl SamplingConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_millis(self.failure_backoff_ms)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            candidates: vec![DeviceId(0)],
            probe: ProbeConfig::default(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            duration_secs: 10,
            confidence_threshold: 0.5,
            max_history: DEFAULT_HISTORY_LENGTH,
            sample_interval_ms: 100,
            failure_backoff_ms: 100,
            max_consecutive_failures: 10,
            recent_records: 5,
            save_frames: true,
            save_interval: 30,
            neutral_threshold: NEUTRAL_THRESHOLD,
            reference_displacement: REFERENCE_DISPLACEMENT,
            session_history: 20,
        }
    }
}

/// `LETDANCE_SAMPLING__DURATION_SECS=5` sets `sampling.duration_secs`
fn env_source() -> ::config::Environment {
    ::config::Environment::with_prefix("LETDANCE")
        .prefix_separator("_")
        .separator("__")
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: &str) -> std::result::Result<Self, ::config::ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path))
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables
    pub fn from_env() -> std::result::Result<Self, ::config::ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(env_source())
            .build()?;

        settings.try_deserialize()
    }

    /// Reject values the sampling loop cannot run with
    pub fn validate(&self) -> Result<()> {
        let s = &self.sampling;

        if s.duration_secs == 0 {
            return Err(Error::Config("sampling.duration_secs must be positive".into()));
        }
        if !(0.0..=1.0).contains(&s.confidence_threshold) {
            return Err(Error::Config(format!(
                "sampling.confidence_threshold {} outside [0, 1]",
                s.confidence_threshold
            )));
        }
        if s.max_history == 0 {
            return Err(Error::Config("sampling.max_history must be positive".into()));
        }
        if s.max_consecutive_failures == 0 {
            return Err(Error::Config(
                "sampling.max_consecutive_failures must be positive".into(),
            ));
        }
        if s.save_interval == 0 {
            return Err(Error::Config("sampling.save_interval must be positive".into()));
        }
        if s.session_history == 0 {
            return Err(Error::Config("sampling.session_history must be positive".into()));
        }
        if s.reference_displacement <= 0.0 || !s.reference_displacement.is_finite() {
            return Err(Error::Config(
                "sampling.reference_displacement must be positive".into(),
            ));
        }
        Ok(())
    }
}
