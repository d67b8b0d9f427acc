//! Pose source boundary.
//!
//! The pose-estimation model is an external capability. This module fixes
//! its I/O contract (the 17-point [`Joint`] topology, [`Keypoint`],
//! [`Subject`]), the [`PoseBackend`] trait implementations plug into, and the
//! lazily-initialised [`SharedDetector`] the analyzer receives by injection.

mod backend;
pub mod backends;
mod keypoint;
mod shared;

pub use backend::PoseBackend;
pub use backends::{factory_for, standing_pose, StubBackend};
pub use keypoint::{Joint, Keypoint, Subject};
pub use shared::{BackendFactory, DetectorHandle, SharedDetector};
