use serde::{Deserialize, Serialize};

/// The 17-point skeleton topology every pose source must conform to.
///
/// The discriminant is the canonical positional index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

/// Lookup table: identity, name, canonical index.
const TOPOLOGY: [(Joint, &str); 17] = [
    (Joint::Nose, "nose"),
    (Joint::LeftEye, "left_eye"),
    (Joint::RightEye, "right_eye"),
    (Joint::LeftEar, "left_ear"),
    (Joint::RightEar, "right_ear"),
    (Joint::LeftShoulder, "left_shoulder"),
    (Joint::RightShoulder, "right_shoulder"),
    (Joint::LeftElbow, "left_elbow"),
    (Joint::RightElbow, "right_elbow"),
    (Joint::LeftWrist, "left_wrist"),
    (Joint::RightWrist, "right_wrist"),
    (Joint::LeftHip, "left_hip"),
    (Joint::RightHip, "right_hip"),
    (Joint::LeftKnee, "left_knee"),
    (Joint::RightKnee, "right_knee"),
    (Joint::LeftAnkle, "left_ankle"),
    (Joint::RightAnkle, "right_ankle"),
];

impl Joint {
    pub const ALL: [Joint; 17] = [
        Joint::Nose,
        Joint::LeftEye,
        Joint::RightEye,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        TOPOLOGY[self.index()].1
    }

    pub fn from_index(index: usize) -> Option<Joint> {
        TOPOLOGY.get(index).map(|(joint, _)| *joint)
    }

    pub fn from_name(name: &str) -> Option<Joint> {
        TOPOLOGY
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(joint, _)| *joint)
    }
}

/// One detected anatomical landmark in frame pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Confidence in `[0, 1]`, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Named identity, when the source labels its keypoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint: Option<Joint>,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            score: None,
            joint: None,
        }
    }

    pub fn named(joint: Joint, x: f32, y: f32, score: f32) -> Self {
        Self {
            x,
            y,
            score: Some(score),
            joint: Some(joint),
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A single detected person.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub keypoints: Vec<Keypoint>,
}

impl Subject {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Resolve a joint: a keypoint labelled with that identity wins, else the
    /// keypoint at the canonical index. Non-finite coordinates count as absent.
    pub fn keypoint(&self, joint: Joint) -> Option<&Keypoint> {
        let by_name = self.keypoints.iter().find(|k| k.joint == Some(joint));
        by_name
            .or_else(|| self.keypoints.get(joint.index()))
            .filter(|k| k.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_indices_match_discriminants() {
        for (i, joint) in Joint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(Joint::from_index(i), Some(*joint));
            assert_eq!(Joint::from_name(joint.name()), Some(*joint));
        }
        assert_eq!(Joint::LeftShoulder.index(), 5);
        assert_eq!(Joint::RightAnkle.index(), 16);
        assert_eq!(Joint::from_index(17), None);
        assert_eq!(Joint::from_name("left_toe"), None);
    }

    #[test]
    fn lookup_prefers_name_over_index() {
        let mut keypoints: Vec<Keypoint> = (0..17).map(|i| Keypoint::new(i as f32, 0.0)).collect();
        // A labelled left hip stored out of place.
        keypoints.push(Keypoint::named(Joint::LeftHip, 99.0, 1.0, 0.9));
        let subject = Subject::new(keypoints);

        assert_eq!(subject.keypoint(Joint::LeftHip).map(|k| k.x), Some(99.0));
        assert_eq!(subject.keypoint(Joint::RightHip).map(|k| k.x), Some(12.0));
    }

    #[test]
    fn lookup_falls_back_to_index_and_reports_absence() {
        let subject = Subject::new((0..6).map(|i| Keypoint::new(i as f32, 0.0)).collect());
        assert!(subject.keypoint(Joint::LeftShoulder).is_some());
        assert!(subject.keypoint(Joint::RightShoulder).is_none());
    }

    #[test]
    fn non_finite_keypoint_is_absent() {
        let mut keypoints: Vec<Keypoint> = (0..17).map(|i| Keypoint::new(i as f32, 0.0)).collect();
        keypoints[13].y = f32::NAN;
        let subject = Subject::new(keypoints);
        assert!(subject.keypoint(Joint::LeftKnee).is_none());
    }
}
