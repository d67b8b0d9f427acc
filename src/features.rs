//! Geometric features derived from one frame's keypoints.
//!
//! Eight joints are required (both shoulders, hips, knees and ankles). A
//! subject missing any of them yields no sample at all; partial detections
//! are never interpolated or zero-filled.

use serde::Serialize;

use crate::pose::{Joint, Keypoint, Subject};

/// Joints a subject must carry to produce a [`FeatureSample`], in the
/// order [`required_points`] returns them.
pub const REQUIRED_JOINTS: [Joint; 8] = [
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftHip,
    Joint::RightHip,
    Joint::LeftKnee,
    Joint::RightKnee,
    Joint::LeftAnkle,
    Joint::RightAnkle,
];

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

impl From<&Keypoint> for Point {
    fn from(k: &Keypoint) -> Self {
        Point::new(f64::from(k.x), f64::from(k.y))
    }
}

/// Angle in degrees at vertex `b` between rays `b->a` and `b->c`, in `[0, 180]`.
///
/// A zero-length ray makes the denominator 1, which yields 90 degrees.
pub fn angle(a: Point, b: Point, c: Point) -> f64 {
    let (abx, aby) = (a.x - b.x, a.y - b.y);
    let (cbx, cby) = (c.x - b.x, c.y - b.y);
    let dot = abx * cbx + aby * cby;
    let norm = abx.hypot(aby) * cbx.hypot(cby);
    let denom = if norm == 0.0 { 1.0 } else { norm };
    (dot / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// Direction of the line `p1 -> p2` in degrees, in `(-180, 180]`.
pub fn line_angle(p1: Point, p2: Point) -> f64 {
    (p2.y - p1.y).atan2(p2.x - p1.x).to_degrees()
}

/// Resolve every joint in [`REQUIRED_JOINTS`], or `None` if any is absent.
pub fn required_points(subject: &Subject) -> Option<[Point; 8]> {
    let mut points = [Point::new(0.0, 0.0); 8];
    for (slot, joint) in points.iter_mut().zip(REQUIRED_JOINTS) {
        *slot = Point::from(subject.keypoint(joint)?);
    }
    Some(points)
}

/// Per-frame biomechanical measurements, all in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FeatureSample {
    pub hip_angle: f64,
    pub knee_angle_left: f64,
    pub knee_angle_right: f64,
    /// Deviation of the hip-to-shoulder midline from vertical.
    pub spine_tilt: f64,
}

impl FeatureSample {
    /// Derive a sample from a subject, or `None` if any required joint is
    /// missing.
    pub fn from_subject(subject: &Subject) -> Option<Self> {
        let [ls, rs, lh, rh, lk, rk, la, ra] = required_points(subject)?;

        let mid_shoulder = Point::midpoint(ls, rs);
        let mid_hip = Point::midpoint(lh, rh);
        let mid_ankle = Point::midpoint(la, ra);

        Some(Self {
            hip_angle: angle(mid_shoulder, mid_hip, mid_ankle),
            knee_angle_left: angle(lh, lk, la),
            knee_angle_right: angle(rh, rk, ra),
            spine_tilt: (90.0 - line_angle(mid_hip, mid_shoulder).abs()).abs(),
        })
    }
}

/// Parallel per-frame feature arrays, in sampling order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureSeries {
    pub hip_angles: Vec<f64>,
    pub knee_left: Vec<f64>,
    pub knee_right: Vec<f64>,
    pub spine_tilts: Vec<f64>,
}

impl FeatureSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(sample: FeatureSample) -> Self {
        let mut series = Self::new();
        series.push(sample);
        series
    }

    pub fn push(&mut self, sample: FeatureSample) {
        self.hip_angles.push(sample.hip_angle);
        self.knee_left.push(sample.knee_angle_left);
        self.knee_right.push(sample.knee_angle_right);
        self.spine_tilts.push(sample.spine_tilt);
    }

    /// Number of usable frames collected.
    pub fn len(&self) -> usize {
        self.hip_angles.len()
    }

    /// True when no feature array holds a value.
    pub fn is_empty(&self) -> bool {
        self.hip_angles.is_empty()
            && self.knee_left.is_empty()
            && self.knee_right.is_empty()
            && self.spine_tilts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::standing_pose;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn angle_of_right_and_straight_corners() {
        let b = Point::new(0.0, 0.0);
        assert!(approx(angle(Point::new(1.0, 0.0), b, Point::new(0.0, 1.0)), 90.0));
        assert!(approx(angle(Point::new(-1.0, 0.0), b, Point::new(1.0, 0.0)), 180.0));
        assert!(approx(angle(Point::new(2.0, 0.0), b, Point::new(1.0, 0.0)), 0.0));
    }

    #[test]
    fn diagonal_rays_in_one_direction_are_near_zero() {
        let b = Point::new(0.0, 0.0);
        let a = angle(Point::new(2.0, 2.0), b, Point::new(1.0, 1.0));
        assert!(a.abs() < 1e-5, "got {a}");
    }

    #[test]
    fn zero_length_ray_does_not_divide_by_zero() {
        let b = Point::new(3.0, 3.0);
        let a = angle(b, b, Point::new(5.0, 3.0));
        assert!(a.is_finite());
        assert!(approx(a, 90.0));
    }

    #[test]
    fn upright_figure_has_straight_hips_and_no_tilt() {
        let subject = standing_pose(640.0, 480.0);
        let sample = FeatureSample::from_subject(&subject).expect("all joints present");
        assert!((sample.hip_angle - 180.0).abs() < 1e-3);
        assert!((sample.knee_angle_left - 180.0).abs() < 1e-3);
        assert!((sample.knee_angle_right - 180.0).abs() < 1e-3);
        assert!(sample.spine_tilt.abs() < 1e-3);
    }

    #[test]
    fn horizontal_torso_reads_as_full_tilt() {
        // Plank seen from the side: shoulders level with hips.
        let mut subject = standing_pose(640.0, 480.0);
        for joint in [Joint::LeftShoulder, Joint::RightShoulder] {
            let k = &mut subject.keypoints[joint.index()];
            k.x = 100.0;
            k.y = 264.0;
        }
        let sample = FeatureSample::from_subject(&subject).unwrap();
        assert!((sample.spine_tilt - 90.0).abs() < 1.0);
    }

    #[test]
    fn every_required_joint_is_checked() {
        for joint in REQUIRED_JOINTS {
            let mut subject = standing_pose(640.0, 480.0);
            subject.keypoints[joint.index()].y = f32::NAN;
            assert!(
                FeatureSample::from_subject(&subject).is_none(),
                "{} not required",
                joint.name()
            );
        }
        let mut subject = standing_pose(640.0, 480.0);
        subject.keypoints[Joint::Nose.index()].y = f32::NAN;
        assert!(FeatureSample::from_subject(&subject).is_some());
    }

    #[test]
    fn required_points_follow_joint_order() {
        let subject = standing_pose(640.0, 480.0);
        let points = required_points(&subject).unwrap();
        for (point, joint) in points.iter().zip(REQUIRED_JOINTS) {
            let k = subject.keypoint(joint).unwrap();
            assert_eq!(*point, Point::from(k));
        }
    }

    #[test]
    fn missing_required_joint_yields_nothing() {
        let mut subject = standing_pose(640.0, 480.0);
        subject.keypoints.truncate(Joint::RightAnkle.index());
        assert!(FeatureSample::from_subject(&subject).is_none());
    }

    #[test]
    fn series_keeps_arrays_parallel() {
        let sample = FeatureSample::from_subject(&standing_pose(100.0, 100.0)).unwrap();
        let mut series = FeatureSeries::single(sample);
        series.push(sample);
        assert_eq!(series.len(), 2);
        assert_eq!(series.knee_left.len(), 2);
        assert_eq!(series.knee_right.len(), 2);
        assert_eq!(series.spine_tilts.len(), 2);
    }
}
