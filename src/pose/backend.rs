use anyhow::Result;

use crate::frame::Frame;
use crate::pose::Subject;

/// Pose source backend trait.
///
/// A backend is the external pose-estimation capability: given one frame it
/// returns zero or more subjects, each with keypoints laid out in the
/// 17-point topology (see [`crate::pose::Joint`]). The analyzer consumes
/// only the first subject and never thresholds on confidence.
///
/// Backends are stateful (`&mut self`) and not assumed to be reentrant;
/// [`crate::pose::SharedDetector`] serialises access.
pub trait PoseBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, returning at most `max_subjects` subjects.
    fn detect(&mut self, frame: &Frame, max_subjects: usize) -> Result<Vec<Subject>>;

    /// Optional warm-up hook, run once after construction.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
