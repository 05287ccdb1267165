//! Fire-and-forget frame sink for an external persistence collaborator.

use letdance_camera::VideoFrame;
use letdance_core::{KeypointFrame, Landmark};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::summary::AnalysisRecord;

/// Line between two reliable landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bone {
    pub from: Landmark,
    pub to: Landmark,
    pub start: [f64; 2],
    pub end: [f64; 2],
}

/// Marker drawn on a reliable landmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Marker {
    pub landmark: Landmark,
    pub position: [f64; 2],
    pub confidence: f32,
}

/// Drawing instructions for the detected skeleton. The renderer decides how
/// pixels look; this only says what to draw.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SkeletonOverlay {
    pub bones: Vec<Bone>,
    pub markers: Vec<Marker>,
}

impl SkeletonOverlay {
    /// Bones and markers for landmarks whose confidence exceeds `threshold`
    pub fn from_frame(frame: &KeypointFrame, threshold: f32) -> Self {
        let bones = Landmark::skeleton_pairs()
            .iter()
            .filter_map(|&(from, to)| {
                let (a, b) = (frame.get(from), frame.get(to));
                (a.is_reliable(threshold) && b.is_reliable(threshold)).then_some(Bone {
                    from,
                    to,
                    start: [a.x, a.y],
                    end: [b.x, b.y],
                })
            })
            .collect();

        let markers = Landmark::ALL
            .iter()
            .filter_map(|&landmark| {
                let kp = frame.get(landmark);
                kp.is_reliable(threshold).then_some(Marker {
                    landmark,
                    position: [kp.x, kp.y],
                    confidence: kp.confidence,
                })
            })
            .collect();

        Self { bones, markers }
    }
}

/// One sample handed to the sink
#[derive(Debug, Clone)]
pub struct SampleEvent {
    pub frame_index: u64,
    pub frame: VideoFrame,
    pub overlay: SkeletonOverlay,
    pub record: AnalysisRecord,
}

/// Receives annotated samples. Must return promptly and never fail the
/// caller; the return value only reports whether the event was taken.
pub trait FrameSink: Send + Sync {
    fn emit(&self, event: SampleEvent) -> bool;
}

/// Forwards events over a bounded channel, dropping them when full
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<SampleEvent>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SampleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl FrameSink for ChannelSink {
    fn emit(&self, event: SampleEvent) -> bool {
        let index = event.frame_index;
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(e) => {
                debug!("Sink dropped frame {}: {}", index, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use letdance_core::{Keypoint, Timestamp};

    #[test]
    fn test_overlay_skips_unreliable_landmarks() {
        let mut keypoints = [Keypoint::new(1.0, 2.0, 0.9); Landmark::COUNT];
        keypoints[Landmark::LeftElbow.index()].confidence = 0.1;
        let frame = KeypointFrame::new(Timestamp::from_nanos(0), keypoints);

        let overlay = SkeletonOverlay::from_frame(&frame, 0.5);
        assert_eq!(overlay.markers.len(), 7);
        assert!(overlay
            .bones
            .iter()
            .all(|b| b.from != Landmark::LeftElbow && b.to != Landmark::LeftElbow));
        assert!(overlay.bones.len() < Landmark::skeleton_pairs().len());
    }
}
