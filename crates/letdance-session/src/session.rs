//! Realtime sampling session driver.
//!
//! ## State Machine
//!
//! ```text
//! Idle ─▶ Acquiring ─▶ Sampling ─▶ Finalizing ─▶ Done
//!             │            │
//!             └────────────┴──▶ Aborted
//! ```
//!
//! The camera handle is released on the way into `Finalizing` or `Aborted`,
//! whichever path the session takes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use letdance_camera::{CameraArbiter, CameraHandle, DeviceId, ReadError};
use letdance_core::{KeypointFrame, MovementQualityVector, SessionId};
use letdance_lma::{
    EmotionClassifier, MovementAnalyzer, QualityExtractor, RELIABILITY_THRESHOLD,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, SamplingConfig};
use crate::detector::PoseDetector;
use crate::sink::{FrameSink, SampleEvent, SkeletonOverlay};
use crate::summary::{AnalysisRecord, EmotionDistribution, SessionFailure, SessionSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Acquiring,
    Sampling,
    Finalizing,
    Done,
    Aborted,
}

/// Per-session request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub duration: Duration,
    pub confidence_threshold: f32,
    pub max_history: usize,
    pub save_frames: bool,
    pub save_interval: u64,
}

impl SessionParams {
    pub fn new(duration_secs: u64, confidence_threshold: f32, max_history: usize) -> Self {
        Self {
            duration: Duration::from_secs(duration_secs),
            confidence_threshold,
            max_history,
            save_frames: false,
            save_interval: 30,
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self {
            duration: Duration::from_secs(config.duration_secs),
            confidence_threshold: config.confidence_threshold,
            max_history: config.max_history,
            save_frames: config.save_frames,
            save_interval: config.save_interval,
        }
    }

    pub fn with_frame_saving(mut self, enabled: bool, interval: u64) -> Self {
        self.save_frames = enabled;
        self.save_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<(), SessionFailure> {
        if self.duration.is_zero() {
            return Err(SessionFailure::InvalidParameters(
                "duration must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(SessionFailure::InvalidParameters(format!(
                "confidence threshold {} outside [0, 1]",
                self.confidence_threshold
            )));
        }
        if self.max_history == 0 {
            return Err(SessionFailure::InvalidParameters(
                "max history must be positive".into(),
            ));
        }
        if self.save_interval == 0 {
            return Err(SessionFailure::InvalidParameters(
                "save interval must be positive".into(),
            ));
        }
        Ok(())
    }

    fn should_save(&self, frame_index: u64) -> bool {
        self.save_frames && frame_index % self.save_interval == 0
    }
}

/// Cancels a running session from outside the sampling task
#[derive(Debug, Clone)]
pub struct SessionControl {
    is_running: Arc<RwLock<bool>>,
}

impl SessionControl {
    pub async fn cancel(&self) {
        *self.is_running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }
}

/// State accumulated while sampling
struct AnalysisSession {
    id: SessionId,
    started_at: DateTime<Utc>,
    started: Instant,
    analyzer: MovementAnalyzer,
    records: Vec<AnalysisRecord>,
    distribution: EmotionDistribution,
    total_frames: u64,
    skipped_frames: u64,
    saved_frames: usize,
}

impl AnalysisSession {
    fn new(params: &SessionParams, config: &SamplingConfig) -> Result<Self, SessionFailure> {
        let analyzer = MovementAnalyzer::new(
            params.max_history,
            QualityExtractor::new(config.reference_displacement),
            EmotionClassifier::new(config.neutral_threshold),
        )
        .map_err(|e| SessionFailure::InvalidParameters(e.to_string()))?;

        Ok(Self {
            id: SessionId::new(),
            started_at: Utc::now(),
            started: Instant::now(),
            analyzer,
            records: Vec::new(),
            distribution: EmotionDistribution::default(),
            total_frames: 0,
            skipped_frames: 0,
            saved_frames: 0,
        })
    }

    fn analyze(&mut self, frame_index: u64, keypoints: KeypointFrame) -> &AnalysisRecord {
        let timestamp = keypoints.timestamp().to_datetime();
        let visible_keypoints = keypoints.visible_count(RELIABILITY_THRESHOLD);
        let analysis = self.analyzer.analyze(keypoints);

        self.distribution.record(analysis.classification.emotion);
        self.records.push(AnalysisRecord {
            timestamp,
            frame_index,
            quality: analysis.quality,
            emotion: analysis.classification.emotion,
            scores: analysis.classification.scores,
            visible_keypoints,
        });

        &self.records[self.records.len() - 1]
    }

    fn finalize(self, params: &SessionParams, recent: usize) -> Result<SessionSummary, SessionFailure> {
        let Some(dominant_emotion) = self.distribution.dominant() else {
            return Err(SessionFailure::NoValidAnalyses {
                total_frames: self.total_frames,
            });
        };

        let average_quality =
            MovementQualityVector::mean(self.records.iter().map(|r| &r.quality)).unwrap_or_default();
        let valid_analyses = self.records.len();
        let keep_from = valid_analyses.saturating_sub(recent);

        Ok(SessionSummary {
            session_id: self.id,
            started_at: self.started_at,
            duration_secs: self.started.elapsed().as_secs_f64(),
            total_frames: self.total_frames,
            valid_analyses,
            skipped_frames: self.skipped_frames,
            dominant_emotion,
            emotion_distribution: self.distribution,
            average_quality,
            recent_records: self.records.into_iter().skip(keep_from).collect(),
            saved_frames: self.saved_frames,
            frame_saving_enabled: params.save_frames,
            save_interval: params.save_interval,
        })
    }
}

/// Drives one realtime session at a time over the shared camera
pub struct SessionDriver {
    arbiter: Arc<CameraArbiter>,
    detector: Arc<dyn PoseDetector>,
    sink: Option<Arc<dyn FrameSink>>,
    candidates: Vec<DeviceId>,
    sampling: SamplingConfig,
    state: SessionState,
    is_running: Arc<RwLock<bool>>,
}

impl SessionDriver {
    pub fn new(
        arbiter: Arc<CameraArbiter>,
        detector: Arc<dyn PoseDetector>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            arbiter,
            detector,
            sink: None,
            candidates: config.camera.candidates.clone(),
            sampling: config.sampling.clone(),
            state: SessionState::Idle,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn control(&self) -> SessionControl {
        SessionControl {
            is_running: Arc::clone(&self.is_running),
        }
    }

    /// Acquire the camera, sample for `params.duration`, and summarise.
    ///
    /// Acquisition failures return before any session state exists. Every
    /// later path releases the camera before returning.
    pub async fn start_session(
        &mut self,
        params: SessionParams,
    ) -> Result<SessionSummary, SessionFailure> {
        self.state = SessionState::Idle;
        params.validate()?;
        *self.is_running.write().await = true;

        self.transition(SessionState::Acquiring);
        let mut handle = match self.arbiter.acquire(&self.candidates).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("Session could not acquire a camera: {}", e);
                *self.is_running.write().await = false;
                self.transition(SessionState::Aborted);
                return Err(SessionFailure::NoCameraAvailable(e));
            }
        };

        let mut session = match AnalysisSession::new(&params, &self.sampling) {
            Ok(session) => session,
            Err(failure) => {
                *self.is_running.write().await = false;
                self.transition(SessionState::Aborted);
                handle.release();
                return Err(failure);
            }
        };

        // a cancel issued while acquiring is seen by the first loop check
        self.transition(SessionState::Sampling);
        let sampled = self.sample(&mut handle, &mut session, &params).await;
        *self.is_running.write().await = false;

        match sampled {
            Ok(()) => {
                self.transition(SessionState::Finalizing);
                handle.release();
                let result = session.finalize(&params, self.sampling.recent_records);
                self.transition(SessionState::Done);

                match &result {
                    Ok(summary) => info!(
                        "Session {:?} done: {} frames, {} analyses, dominant {}",
                        summary.session_id,
                        summary.total_frames,
                        summary.valid_analyses,
                        summary.dominant_emotion
                    ),
                    Err(failure) => warn!("Session finished without result: {}", failure),
                }
                result
            }
            Err(failure) => {
                self.transition(SessionState::Aborted);
                handle.release();
                error!("Session {:?} aborted: {}", session.id, failure);
                Err(failure)
            }
        }
    }

    async fn sample(
        &self,
        handle: &mut CameraHandle,
        session: &mut AnalysisSession,
        params: &SessionParams,
    ) -> Result<(), SessionFailure> {
        let deadline = Instant::now() + params.duration;
        let max_failures = self.sampling.max_consecutive_failures;
        let mut consecutive_failures = 0u32;

        while Instant::now() < deadline {
            if !*self.is_running.read().await {
                info!("Session {:?} cancelled", session.id);
                break;
            }

            let frame = match handle.read().await {
                Ok(frame) if !frame.is_empty() => frame,
                outcome => {
                    consecutive_failures += 1;
                    let reason = outcome.err().unwrap_or(ReadError::EmptyFrame);

                    if consecutive_failures >= max_failures {
                        return Err(SessionFailure::DeviceLostDuringSampling {
                            consecutive_failures,
                            valid_analyses: session.records.len(),
                        });
                    }

                    warn!(
                        "Frame read failed ({}/{}): {}",
                        consecutive_failures, max_failures, reason
                    );
                    tokio::time::sleep(self.sampling.failure_backoff()).await;
                    continue;
                }
            };

            consecutive_failures = 0;
            session.total_frames += 1;
            let frame_index = session.total_frames;

            match self.detector.detect(&frame, params.confidence_threshold).await {
                Ok(Some(keypoints)) => {
                    let overlay = params
                        .should_save(frame_index)
                        .then(|| SkeletonOverlay::from_frame(&keypoints, params.confidence_threshold));

                    let record = session.analyze(frame_index, keypoints);
                    debug!(
                        "Frame {}: {} ({}/8 keypoints)",
                        frame_index, record.emotion, record.visible_keypoints
                    );

                    if let (Some(overlay), Some(sink)) = (overlay, self.sink.as_ref()) {
                        let event = SampleEvent {
                            frame_index,
                            frame,
                            overlay,
                            record: record.clone(),
                        };
                        if sink.emit(event) {
                            session.saved_frames += 1;
                        }
                    }
                }
                Ok(None) => {
                    session.skipped_frames += 1;
                    if frame_index % 10 == 0 {
                        debug!("Frame {}: no pose detected", frame_index);
                    }
                }
                Err(e) => {
                    session.skipped_frames += 1;
                    warn!("Frame {}: detector failed: {}", frame_index, e);
                }
            }

            tokio::time::sleep(self.sampling.sample_interval()).await;
        }

        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ScriptedDetector;
    use crate::sink::ChannelSink;
    use letdance_camera::{
        AcquisitionError, MockCameraBackend, MockDevice, MockStats, ProbeConfig, ReadStep,
    };
    use letdance_core::{Keypoint, Landmark};
    use letdance_lma::Emotion;

    /// Upright stance mirrored around x = 0, shifted by `dx`
    fn stance(dx: f64) -> [Keypoint; Landmark::COUNT] {
        [
            (-20.0, 0.0),
            (20.0, 0.0),
            (-30.0, 40.0),
            (30.0, 40.0),
            (-15.0, 100.0),
            (15.0, 100.0),
            (-20.0, 160.0),
            (20.0, 160.0),
        ]
        .map(|(x, y)| Keypoint::new(x + dx, y, 0.9))
    }

    fn setup(
        device: MockDevice,
        detector: ScriptedDetector,
        config: EngineConfig,
    ) -> (SessionDriver, Arc<CameraArbiter>, Arc<MockStats>) {
        let backend = MockCameraBackend::new().with_device(DeviceId(0), device);
        let stats = backend.stats();
        let arbiter = Arc::new(CameraArbiter::new(
            Arc::new(backend),
            ProbeConfig::default(),
        ));
        let driver = SessionDriver::new(Arc::clone(&arbiter), Arc::new(detector), &config);
        (driver, arbiter, stats)
    }

    #[tokio::test(start_paused = true)]
    async fn test_accelerating_movement_end_to_end() {
        // displacement grows by 0.5 px per frame
        let script = (0..30u32)
            .map(|i| Some(stance(0.25 * f64::from(i * (i + 1)))))
            .collect();
        let mut config = EngineConfig::default();
        config.sampling.recent_records = 30;
        let (mut driver, arbiter, stats) =
            setup(MockDevice::live(), ScriptedDetector::new(script), config);

        let summary = driver
            .start_session(SessionParams::new(4, 0.5, 10))
            .await
            .unwrap();

        assert_eq!(driver.state(), SessionState::Done);
        assert_eq!(summary.valid_analyses, 30);
        assert!(summary.total_frames >= 30);
        assert_eq!(summary.skipped_frames, summary.total_frames - 30);
        assert_eq!(summary.emotion_distribution.total(), 30);

        let records = &summary.recent_records;
        assert_eq!(records.len(), 30);
        for pair in records[15..].windows(2) {
            assert!(pair[1].quality.time > pair[0].quality.time);
        }
        assert!(records[17..].iter().all(|r| r.emotion == Emotion::Joyful));

        let early: EmotionDistribution = records[..15].iter().map(|r| r.emotion).collect();
        let late: EmotionDistribution = records[15..].iter().map(|r| r.emotion).collect();
        assert_eq!(early.dominant(), Some(Emotion::Relaxed));
        assert_eq!(late.dominant(), Some(Emotion::Joyful));

        assert!(records.iter().all(|r| r.visible_keypoints == 8));
        assert!(summary
            .average_quality
            .as_array()
            .iter()
            .all(|v| (-1.0..=1.0).contains(v)));

        assert_eq!(stats.closes(), 1);
        assert!(arbiter.outstanding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_read_failures_abort() {
        // three reads for probing, then twelve failures
        let mut steps = vec![ReadStep::Frame; 3];
        steps.extend([ReadStep::Fail; 12]);
        let device = MockDevice::live().with_script(steps);
        let (mut driver, arbiter, stats) = setup(
            device,
            ScriptedDetector::constant(stance(0.0)),
            EngineConfig::default(),
        );

        let result = driver.start_session(SessionParams::new(10, 0.5, 10)).await;

        assert_eq!(
            result.unwrap_err(),
            SessionFailure::DeviceLostDuringSampling {
                consecutive_failures: 10,
                valid_analyses: 0
            }
        );
        assert_eq!(driver.state(), SessionState::Aborted);
        assert_eq!(stats.closes(), 1);
        assert_eq!(stats.open_handles(), 0);
        assert!(arbiter.outstanding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_read_resets_failure_count() {
        let mut steps = vec![ReadStep::Frame; 3];
        steps.extend([ReadStep::Fail; 9]);
        steps.push(ReadStep::Frame);
        steps.extend([ReadStep::Fail; 9]);
        let device = MockDevice::live().with_script(steps);
        let (mut driver, _, stats) = setup(
            device,
            ScriptedDetector::constant(stance(0.0)),
            EngineConfig::default(),
        );

        let summary = driver
            .start_session(SessionParams::new(3, 0.5, 10))
            .await
            .unwrap();

        assert!(summary.valid_analyses > 1);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_subject_detected() {
        let (mut driver, arbiter, stats) = setup(
            MockDevice::live(),
            ScriptedDetector::empty(),
            EngineConfig::default(),
        );

        let result = driver.start_session(SessionParams::new(1, 0.5, 10)).await;

        match result {
            Err(SessionFailure::NoValidAnalyses { total_frames }) => assert!(total_frames > 0),
            other => panic!("expected NoValidAnalyses, got {other:?}"),
        }
        assert_eq!(driver.state(), SessionState::Done);
        assert_eq!(stats.closes(), 1);
        assert!(arbiter.outstanding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_camera_at_start() {
        let (mut driver, _, stats) = setup(
            MockDevice::unavailable(),
            ScriptedDetector::empty(),
            EngineConfig::default(),
        );

        let result = driver.start_session(SessionParams::new(5, 0.5, 10)).await;

        assert_eq!(
            result.unwrap_err(),
            SessionFailure::NoCameraAvailable(AcquisitionError::NoCameraAvailable {
                probed: vec![DeviceId(0)]
            })
        );
        assert_eq!(driver.state(), SessionState::Aborted);
        assert_eq!(stats.opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_capture_handle_fails_fast() {
        let (mut driver, arbiter, _) = setup(
            MockDevice::live(),
            ScriptedDetector::empty(),
            EngineConfig::default(),
        );
        let stale = arbiter.acquire(&[DeviceId(0)]).await.unwrap();

        let result = driver.start_session(SessionParams::new(5, 0.5, 10)).await;
        assert!(matches!(
            result,
            Err(SessionFailure::NoCameraAvailable(
                AcquisitionError::HandleOutstanding { .. }
            ))
        ));
        stale.release();
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_parameters_touch_nothing() {
        let (mut driver, _, stats) = setup(
            MockDevice::live(),
            ScriptedDetector::empty(),
            EngineConfig::default(),
        );

        let result = driver.start_session(SessionParams::new(5, 0.5, 0)).await;
        assert!(matches!(result, Err(SessionFailure::InvalidParameters(_))));

        let result = driver.start_session(SessionParams::new(0, 0.5, 10)).await;
        assert!(matches!(result, Err(SessionFailure::InvalidParameters(_))));
        assert_eq!(stats.opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_routes_through_finalizing() {
        let (mut driver, arbiter, stats) = setup(
            MockDevice::live(),
            ScriptedDetector::constant(stance(0.0)),
            EngineConfig::default(),
        );
        let control = driver.control();

        let (result, _) = tokio::join!(
            driver.start_session(SessionParams::new(10, 0.5, 10)),
            async move {
                // acquisition settles for one second first
                tokio::time::sleep(Duration::from_millis(1500)).await;
                control.cancel().await;
            }
        );

        let summary = result.unwrap();
        assert!(summary.duration_secs < 1.0);
        assert!(summary.valid_analyses > 0);
        assert_eq!(driver.state(), SessionState::Done);
        assert_eq!(stats.closes(), 1);
        assert!(arbiter.outstanding().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_acquiring() {
        let (mut driver, arbiter, stats) = setup(
            MockDevice::live(),
            ScriptedDetector::constant(stance(0.0)),
            EngineConfig::default(),
        );
        let control = driver.control();
        let started = Instant::now();

        let (result, _) = tokio::join!(
            driver.start_session(SessionParams::new(10, 0.5, 10)),
            async move {
                // still inside the one second settle delay
                tokio::time::sleep(Duration::from_millis(500)).await;
                control.cancel().await;
            }
        );

        assert_eq!(
            result.unwrap_err(),
            SessionFailure::NoValidAnalyses { total_frames: 0 }
        );
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(driver.state(), SessionState::Done);
        assert_eq!(stats.closes(), 1);
        assert_eq!(stats.open_handles(), 0);
        assert!(arbiter.outstanding().is_none());
        assert!(!driver.control().is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_receives_every_nth_frame() {
        let (driver, _, _) = setup(
            MockDevice::live(),
            ScriptedDetector::constant(stance(0.0)),
            EngineConfig::default(),
        );
        let (sink, mut rx) = ChannelSink::new(16);
        let mut driver = driver.with_sink(Arc::new(sink));

        let params = SessionParams::new(2, 0.5, 10).with_frame_saving(true, 5);
        let summary = driver.start_session(params).await.unwrap();

        let mut indices = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.overlay.bones.len(), 8);
            assert_eq!(event.overlay.markers.len(), 8);
            assert!(!event.frame.is_empty());
            indices.push(event.frame_index);
        }

        assert!(!indices.is_empty());
        assert!(indices.iter().all(|i| i % 5 == 0));
        assert_eq!(summary.saved_frames, indices.len());
        assert!(summary.frame_saving_enabled);
    }
}
