//! Planar geometry helpers over keypoint positions.

use nalgebra::Point2;

use crate::types::Keypoint;

/// Euclidean distance between two keypoints, ignoring confidence.
///
/// Uses `hypot` so very large coordinates do not overflow on squaring.
pub fn distance(a: &Keypoint, b: &Keypoint) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Distance from a keypoint to an arbitrary point
pub fn distance_to_point(kp: &Keypoint, p: &Point2<f64>) -> f64 {
    (kp.x - p.x).hypot(kp.y - p.y)
}

pub fn midpoint(a: &Keypoint, b: &Keypoint) -> Point2<f64> {
    nalgebra::center(&a.position(), &b.position())
}

/// Unweighted centroid of the given keypoints
pub fn centroid(points: &[&Keypoint]) -> Option<Point2<f64>> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), kp| (sx + kp.x, sy + kp.y));
    Some(Point2::new(sx / n, sy / n))
}

/// Population mean and variance of a sample
pub fn mean_variance(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance))
}
