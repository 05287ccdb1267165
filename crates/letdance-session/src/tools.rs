//! Installation tool operations.
//!
//! The orchestration layer drives the engine with JSON requests tagged by
//! `action`:
//!
//! ```json
//! {"action": "capture_once"}
//! {"action": "analyze_realtime", "duration": 10, "confidence_threshold": 0.5}
//! {"action": "get_summary"}
//! ```
//!
//! Requests are validated before any camera work starts.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use letdance_camera::{capture_once, CameraArbiter, CameraBackend, DeviceId, FrameInfo};
use letdance_core::Landmark;
use letdance_lma::{EmotionClassifier, LabanDescription};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{EngineConfig, SamplingConfig};
use crate::detector::PoseDetector;
use crate::session::{SessionDriver, SessionParams};
use crate::sink::FrameSink;
use crate::summary::SessionSummary;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Malformed tool request: {0}")]
    Malformed(String),

    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

impl From<serde_json::Error> for ToolError {
    fn from(e: serde_json::Error) -> Self {
        ToolError::Malformed(e.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureParams {
    /// Overrides the configured camera candidates
    pub candidates: Option<Vec<DeviceId>>,
}

/// Unset fields fall back to [`SamplingConfig`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeParams {
    /// Seconds
    pub duration: Option<u64>,
    pub confidence_threshold: Option<f32>,
    pub max_history: Option<usize>,
    pub save_frames: Option<bool>,
    pub save_interval: Option<u64>,
}

impl RealtimeParams {
    pub fn resolve(&self, config: &SamplingConfig) -> SessionParams {
        let mut params = SessionParams::from_config(config);
        if let Some(secs) = self.duration {
            params.duration = Duration::from_secs(secs);
        }
        if let Some(threshold) = self.confidence_threshold {
            params.confidence_threshold = threshold;
        }
        if let Some(max_history) = self.max_history {
            params.max_history = max_history;
        }
        params.with_frame_saving(
            self.save_frames.unwrap_or(config.save_frames),
            self.save_interval.unwrap_or(config.save_interval),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ToolRequest {
    CaptureOnce(CaptureParams),
    AnalyzeRealtime(RealtimeParams),
    GetSummary,
}

impl ToolRequest {
    /// Parse and validate a JSON request
    pub fn from_json(raw: &str) -> Result<Self, ToolError> {
        let request: ToolRequest = serde_json::from_str(raw)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        match self {
            ToolRequest::CaptureOnce(params) => {
                if params.candidates.as_ref().is_some_and(|c| c.is_empty()) {
                    return Err(invalid("candidates", "must name at least one camera"));
                }
            }
            ToolRequest::AnalyzeRealtime(params) => {
                if params.duration == Some(0) {
                    return Err(invalid("duration", "must be a positive number of seconds"));
                }
                if let Some(t) = params.confidence_threshold {
                    if !(0.0..=1.0).contains(&t) {
                        return Err(invalid("confidence_threshold", format!("{t} outside [0, 1]")));
                    }
                }
                if params.max_history == Some(0) {
                    return Err(invalid("max_history", "must be positive"));
                }
                if params.save_interval == Some(0) {
                    return Err(invalid("save_interval", "must be positive"));
                }
            }
            ToolRequest::GetSummary => {}
        }
        Ok(())
    }

    pub fn action(&self) -> &'static str {
        match self {
            ToolRequest::CaptureOnce(_) => "capture_once",
            ToolRequest::AnalyzeRealtime(_) => "analyze_realtime",
            ToolRequest::GetSummary => "get_summary",
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidParameter {
        field,
        reason: reason.into(),
    }
}

/// Still frame for the remote vision call
#[derive(Debug, Clone, Serialize)]
pub struct CaptureReport {
    pub frame: FrameInfo,
    /// Raw pixels; forwarded by the caller, never serialized
    #[serde(skip)]
    pub image: Vec<u8>,
}

/// Engine status for `get_summary`
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    pub total_analyses: usize,
    pub sessions: Vec<SessionSummary>,
    pub available_cameras: Vec<DeviceId>,
    pub camera_count: usize,
    pub keypoint_names: Vec<&'static str>,
    pub emotion_categories: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ToolData {
    Capture(CaptureReport),
    Session(Box<SessionSummary>),
    Summary(ToolSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<ToolData>,
    pub laban_analysis: Option<LabanDescription>,
    /// Machine-readable failure kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl ToolResponse {
    fn ok(message: impl Into<String>, data: ToolData) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            laban_analysis: None,
            error: None,
        }
    }

    fn failure(message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            laban_analysis: None,
            error: Some(kind),
        }
    }
}

/// Runs tool requests one at a time against the shared camera.
///
/// Holding `&mut self` for the whole of each request keeps the capture and
/// sampling stages strictly sequential.
pub struct InstallationTools {
    config: EngineConfig,
    arbiter: Arc<CameraArbiter>,
    detector: Arc<dyn PoseDetector>,
    sink: Option<Arc<dyn FrameSink>>,
    sessions: VecDeque<SessionSummary>,
    completed: usize,
}

impl InstallationTools {
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn CameraBackend>,
        detector: Arc<dyn PoseDetector>,
    ) -> letdance_core::Result<Self> {
        config.validate()?;

        let arbiter = Arc::new(CameraArbiter::new(backend, config.camera.probe.clone()));
        Ok(Self {
            config,
            arbiter,
            detector,
            sink: None,
            sessions: VecDeque::new(),
            completed: 0,
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn arbiter(&self) -> &Arc<CameraArbiter> {
        &self.arbiter
    }

    /// Most recent completed sessions, oldest first
    pub fn sessions(&self) -> &VecDeque<SessionSummary> {
        &self.sessions
    }

    /// Sessions completed through this dispatcher, including evicted ones
    pub fn completed(&self) -> usize {
        self.completed
    }

    fn remember(&mut self, summary: SessionSummary) {
        if self.sessions.len() >= self.config.sampling.session_history {
            self.sessions.pop_front();
        }
        self.sessions.push_back(summary);
        self.completed += 1;
    }

    pub async fn dispatch_json(&mut self, raw: &str) -> ToolResponse {
        match ToolRequest::from_json(raw) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!("Rejected tool request: {}", e);
                ToolResponse::failure(e.to_string(), "invalid_request")
            }
        }
    }

    pub async fn dispatch(&mut self, request: ToolRequest) -> ToolResponse {
        if let Err(e) = request.validate() {
            return ToolResponse::failure(e.to_string(), "invalid_request");
        }

        info!("Running tool action {}", request.action());
        match request {
            ToolRequest::CaptureOnce(params) => self.capture(params).await,
            ToolRequest::AnalyzeRealtime(params) => self.analyze(params).await,
            ToolRequest::GetSummary => self.summary().await,
        }
    }

    async fn capture(&mut self, params: CaptureParams) -> ToolResponse {
        let candidates = params
            .candidates
            .unwrap_or_else(|| self.config.camera.candidates.clone());

        match capture_once(&self.arbiter, &candidates).await {
            Ok(frame) => ToolResponse::ok(
                format!("Captured frame from {}", frame.device),
                ToolData::Capture(CaptureReport {
                    frame: FrameInfo::from(&frame),
                    image: frame.data,
                }),
            ),
            Err(e) => ToolResponse::failure(e.to_string(), "capture_failed"),
        }
    }

    async fn analyze(&mut self, params: RealtimeParams) -> ToolResponse {
        let session_params = params.resolve(&self.config.sampling);
        let mut driver = SessionDriver::new(
            Arc::clone(&self.arbiter),
            Arc::clone(&self.detector),
            &self.config,
        );
        if let Some(sink) = &self.sink {
            driver = driver.with_sink(Arc::clone(sink));
        }

        match driver.start_session(session_params).await {
            Ok(summary) => {
                let description =
                    LabanDescription::describe(&summary.average_quality, summary.dominant_emotion);
                self.remember(summary.clone());

                let mut response = ToolResponse::ok(
                    format!(
                        "Realtime analysis finished: {} frames, {} valid analyses",
                        summary.total_frames, summary.valid_analyses
                    ),
                    ToolData::Session(Box::new(summary)),
                );
                response.laban_analysis = Some(description);
                response
            }
            Err(failure) => ToolResponse::failure(failure.to_string(), failure.kind()),
        }
    }

    async fn summary(&mut self) -> ToolResponse {
        let available_cameras = self.arbiter.available(&self.config.camera.candidates).await;

        ToolResponse::ok(
            "Analysis summary",
            ToolData::Summary(ToolSummary {
                total_analyses: self.completed,
                sessions: self.sessions.iter().cloned().collect(),
                camera_count: available_cameras.len(),
                available_cameras,
                keypoint_names: Landmark::ALL.iter().map(|lm| lm.name()).collect(),
                emotion_categories: EmotionClassifier::default()
                    .categories()
                    .iter()
                    .map(|e| e.label())
                    .collect(),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ScriptedDetector;
    use letdance_camera::{MockCameraBackend, MockDevice};
    use letdance_core::Keypoint;

    fn tools(device: MockDevice) -> InstallationTools {
        tools_with(device, EngineConfig::default())
    }

    fn tools_with(device: MockDevice, config: EngineConfig) -> InstallationTools {
        let backend = MockCameraBackend::new().with_device(DeviceId(0), device);
        let pose = [
            (-20.0, 0.0),
            (20.0, 0.0),
            (-30.0, 40.0),
            (30.0, 40.0),
            (-15.0, 100.0),
            (15.0, 100.0),
            (-20.0, 160.0),
            (20.0, 160.0),
        ]
        .map(|(x, y)| Keypoint::new(x, y, 0.9));
        InstallationTools::new(
            config,
            Arc::new(backend),
            Arc::new(ScriptedDetector::constant(pose)),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            ToolRequest::from_json(r#"{"action": "get_summary"}"#).unwrap(),
            ToolRequest::GetSummary
        );
        assert_eq!(
            ToolRequest::from_json(r#"{"action": "capture_once"}"#).unwrap(),
            ToolRequest::CaptureOnce(CaptureParams::default())
        );

        let request =
            ToolRequest::from_json(r#"{"action": "analyze_realtime", "duration": 5}"#).unwrap();
        let ToolRequest::AnalyzeRealtime(params) = request else {
            panic!("wrong variant");
        };
        let resolved = params.resolve(&SamplingConfig::default());
        assert_eq!(resolved.duration.as_secs(), 5);
        assert_eq!(resolved.confidence_threshold, 0.5);
        assert_eq!(resolved.save_interval, 30);
    }

    #[test]
    fn test_reject_bad_requests() {
        assert!(matches!(
            ToolRequest::from_json(r#"{"action": "dance"}"#),
            Err(ToolError::Malformed(_))
        ));
        assert!(matches!(
            ToolRequest::from_json(r#"{"action": "analyze_realtime", "duration": 0}"#),
            Err(ToolError::InvalidParameter { field: "duration", .. })
        ));
        assert!(matches!(
            ToolRequest::from_json(
                r#"{"action": "analyze_realtime", "confidence_threshold": 1.5}"#
            ),
            Err(ToolError::InvalidParameter {
                field: "confidence_threshold",
                ..
            })
        ));
        assert!(matches!(
            ToolRequest::from_json(r#"{"action": "capture_once", "candidates": []}"#),
            Err(ToolError::InvalidParameter { field: "candidates", .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_then_analyze_then_summary() {
        let mut tools = tools(MockDevice::live());

        let capture = tools.dispatch_json(r#"{"action": "capture_once"}"#).await;
        assert!(capture.success, "{}", capture.message);
        assert!(matches!(capture.data, Some(ToolData::Capture(ref c)) if !c.image.is_empty()));
        assert!(tools.arbiter().outstanding().is_none());

        let analysis = tools
            .dispatch_json(r#"{"action": "analyze_realtime", "duration": 2}"#)
            .await;
        assert!(analysis.success, "{}", analysis.message);
        let laban = analysis.laban_analysis.as_ref().unwrap();
        assert_eq!(laban.time.speed, "slow");

        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["data"]["emotion_distribution"].is_object());
        assert!(json["laban_analysis"]["space"]["direction"].is_string());

        let summary = tools.dispatch(ToolRequest::GetSummary).await;
        let Some(ToolData::Summary(status)) = summary.data else {
            panic!("expected summary data");
        };
        assert_eq!(status.total_analyses, 1);
        assert_eq!(status.available_cameras, vec![DeviceId(0)]);
        assert_eq!(status.keypoint_names.len(), 8);
        assert_eq!(status.emotion_categories.len(), 9);
        assert!(tools.arbiter().outstanding().is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.sampling.save_interval = 0;
        let result = InstallationTools::new(
            config,
            Arc::new(MockCameraBackend::new()),
            Arc::new(ScriptedDetector::empty()),
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_analyze_without_camera() {
        let mut tools = tools(MockDevice::unavailable());

        let response = tools
            .dispatch_json(r#"{"action": "analyze_realtime", "duration": 1}"#)
            .await;
        assert!(!response.success);
        assert_eq!(response.error, Some("no_camera_available"));
        assert!(response.laban_analysis.is_none());
        assert!(tools.sessions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_history_is_bounded() {
        let mut config = EngineConfig::default();
        config.sampling.session_history = 2;
        let mut tools = tools_with(MockDevice::live(), config);

        for _ in 0..3 {
            let response = tools
                .dispatch_json(r#"{"action": "analyze_realtime", "duration": 1}"#)
                .await;
            assert!(response.success, "{}", response.message);
        }

        assert_eq!(tools.sessions().len(), 2);
        assert_eq!(tools.completed(), 3);

        let summary = tools.dispatch(ToolRequest::GetSummary).await;
        let Some(ToolData::Summary(status)) = summary.data else {
            panic!("expected summary data");
        };
        assert_eq!(status.total_analyses, 3);
        assert_eq!(status.sessions.len(), 2);
        assert_eq!(status.sessions[1].session_id, tools.sessions()[1].session_id);
    }
}
