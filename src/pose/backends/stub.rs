use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::frame::Frame;
use crate::pose::backend::PoseBackend;
use crate::pose::{Joint, Keypoint, Subject};

/// Stub backend for tests and model-free runs.
///
/// Answers from a scripted queue first; once the queue is drained it falls
/// back to a fixed behaviour (an upright figure scaled to the frame by
/// default).
pub struct StubBackend {
    script: VecDeque<Scripted>,
    fallback: Fallback,
}

enum Scripted {
    Subjects(Vec<Subject>),
    Error(String),
}

enum Fallback {
    Standing,
    Fixed(Subject),
    Nothing,
}

impl StubBackend {
    /// Always reports one upright subject.
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Fallback::Standing,
        }
    }

    /// Replays the queued responses, then reports no subject.
    pub fn scripted() -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Fallback::Nothing,
        }
    }

    /// Always reports a copy of `subject`.
    pub fn repeating(subject: Subject) -> Self {
        Self {
            script: VecDeque::new(),
            fallback: Fallback::Fixed(subject),
        }
    }

    pub fn push_subjects(mut self, subjects: Vec<Subject>) -> Self {
        self.script.push_back(Scripted::Subjects(subjects));
        self
    }

    pub fn push_subject(self, subject: Subject) -> Self {
        self.push_subjects(vec![subject])
    }

    pub fn push_empty(self) -> Self {
        self.push_subjects(Vec::new())
    }

    pub fn push_error(mut self, reason: &str) -> Self {
        self.script.push_back(Scripted::Error(reason.to_string()));
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame, _max_subjects: usize) -> Result<Vec<Subject>> {
        if let Some(next) = self.script.pop_front() {
            return match next {
                Scripted::Subjects(subjects) => Ok(subjects),
                Scripted::Error(reason) => Err(anyhow!("stub detection failed: {}", reason)),
            };
        }
        Ok(match &self.fallback {
            Fallback::Standing => {
                vec![standing_pose(frame.width as f32, frame.height as f32)]
            }
            Fallback::Fixed(subject) => vec![subject.clone()],
            Fallback::Nothing => Vec::new(),
        })
    }
}

/// An upright, front-facing figure filling most of a `width` x `height` frame.
pub fn standing_pose(width: f32, height: f32) -> Subject {
    let cx = width / 2.0;
    let at = |joint: Joint, dx: f32, fy: f32| {
        Keypoint::named(joint, cx + dx * width, fy * height, 0.9)
    };
    Subject::new(vec![
        at(Joint::Nose, 0.0, 0.15),
        at(Joint::LeftEye, 0.02, 0.13),
        at(Joint::RightEye, -0.02, 0.13),
        at(Joint::LeftEar, 0.04, 0.14),
        at(Joint::RightEar, -0.04, 0.14),
        at(Joint::LeftShoulder, 0.08, 0.30),
        at(Joint::RightShoulder, -0.08, 0.30),
        at(Joint::LeftElbow, 0.10, 0.42),
        at(Joint::RightElbow, -0.10, 0.42),
        at(Joint::LeftWrist, 0.10, 0.55),
        at(Joint::RightWrist, -0.10, 0.55),
        at(Joint::LeftHip, 0.06, 0.55),
        at(Joint::RightHip, -0.06, 0.55),
        at(Joint::LeftKnee, 0.06, 0.75),
        at(Joint::RightKnee, -0.06, 0.75),
        at(Joint::LeftAnkle, 0.06, 0.95),
        at(Joint::RightAnkle, -0.06, 0.95),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_responses_replay_in_order() {
        let frame = Frame::blank(8, 8, 0);
        let mut backend = StubBackend::scripted()
            .push_subject(Subject::default())
            .push_error("decoder hiccup")
            .push_empty();

        assert_eq!(backend.detect(&frame, 1).unwrap().len(), 1);
        assert!(backend.detect(&frame, 1).is_err());
        assert!(backend.detect(&frame, 1).unwrap().is_empty());
        // Drained: scripted stubs report nothing.
        assert!(backend.detect(&frame, 1).unwrap().is_empty());
    }

    #[test]
    fn default_stub_reports_standing_figure() {
        let frame = Frame::blank(640, 480, 0);
        let mut backend = StubBackend::new();
        let subjects = backend.detect(&frame, 1).unwrap();
        assert_eq!(subjects.len(), 1);
        let subject = &subjects[0];
        assert_eq!(subject.keypoints.len(), 17);
        let shoulder = subject.keypoint(Joint::LeftShoulder).unwrap();
        let ankle = subject.keypoint(Joint::LeftAnkle).unwrap();
        assert!(shoulder.y < ankle.y);
    }
}
