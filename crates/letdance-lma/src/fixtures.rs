//! Synthetic poses shared by the unit tests.

use letdance_core::{Keypoint, KeypointFrame, MotionHistoryBuffer, Timestamp};

/// Upright stance mirrored around x = 0 (y grows downwards), shifted by `dx`
pub fn stance(dx: f64, confidence: f32) -> KeypointFrame {
    let points = [
        (-20.0, 0.0),
        (20.0, 0.0),
        (-30.0, 40.0),
        (30.0, 40.0),
        (-15.0, 100.0),
        (15.0, 100.0),
        (-20.0, 160.0),
        (20.0, 160.0),
    ];
    let keypoints = points.map(|(x, y)| Keypoint::new(x + dx, y, confidence));
    KeypointFrame::new(Timestamp::from_nanos(0), keypoints)
}

pub fn buffer_of(frames: impl IntoIterator<Item = KeypointFrame>) -> MotionHistoryBuffer {
    let mut buffer = MotionHistoryBuffer::default();
    for f in frames {
        buffer.push(f);
    }
    buffer
}
