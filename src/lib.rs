//! Movement Scorer
//!
//! Scores the quality of an exercise movement (plank, squat, side bend, ...)
//! captured as a still image or a short clip, from 2D body keypoints.
//!
//! # Architecture
//!
//! Data flows leaves-first through five stages:
//!
//! 1. **Dispatch** (`media`): a `MediaDescriptor` is routed to the image or
//!    the video pipeline by declared type, falling back to the extension.
//! 2. **Sampling** (`sampler`): clips are sampled at 24 evenly spaced
//!    timestamps with strictly sequential seek-then-detect steps. Live
//!    streams get one best-effort snapshot.
//! 3. **Detection** (`pose`): a lazily initialised, shared `PoseBackend`
//!    returns keypoints in the 17-point COCO topology.
//! 4. **Features** (`features`): hip angle, knee angles and spine tilt per
//!    frame. Frames missing any of the 8 required joints are dropped whole.
//! 5. **Scoring** (`scoring`): a pure reduction into a 1..10 score with
//!    feedback, notes and display metrics.
//!
//! Media I/O failures (`MediaLoadError`) are the only hard failures. Missing
//! or incomplete detections become degraded results; failed seeks cost one
//! frame of coverage.
//!
//! # Module Structure
//!
//! - `analyzer`: the pipelines and the `Analyzer` entry point
//! - `live`: the live skeleton overlay loop
//! - `config`: `ScorerConfig` (JSON file plus env overrides)
//! - `error`: typed failures carried inside `anyhow::Error`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod analyzer;
pub mod config;
pub mod error;
pub mod features;
pub mod frame;
pub mod live;
pub mod media;
pub mod pose;
pub mod sampler;
pub mod scoring;

pub use analyzer::Analyzer;
pub use config::ScorerConfig;
pub use error::{MediaLoadError, SeekError};
pub use features::{FeatureSample, FeatureSeries};
pub use frame::Frame;
pub use live::{LiveOverlay, LiveStats, OverlaySink, Skeleton, StopHandle};
pub use media::{MediaDescriptor, MediaKind, SyntheticVideo, VideoMedia};
pub use pose::{DetectorHandle, Joint, Keypoint, PoseBackend, SharedDetector, StubBackend, Subject};
pub use sampler::{FrameSampler, SAMPLE_FRAMES};
pub use scoring::{score_from_metrics, Movement, Scorecard};

/// Final output of one analysis call.
///
/// Fields are private; a result never changes after it has been produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    score: i64,
    feedback: String,
    analysis: AnalysisSummary,
}

/// Details reported next to the score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    frames: usize,
    /// Fraction of requested frames that produced a usable sample, rounded
    /// to 2 decimals.
    coverage: f64,
    movement: String,
    metrics: BTreeMap<String, f64>,
    notes: Vec<String>,
}

impl AnalysisResult {
    /// Assemble a result from a scorecard. `coverage` is rounded here, after
    /// the scorer has consumed the exact value.
    pub fn from_scorecard(movement: &str, frames: usize, coverage: f64, card: Scorecard) -> Self {
        Self {
            score: card.score,
            feedback: card.feedback,
            analysis: AnalysisSummary {
                frames,
                coverage: scoring::round_to(coverage.clamp(0.0, 1.0), 2),
                movement: movement.to_string(),
                metrics: card.metrics,
                notes: card.notes,
            },
        }
    }

    /// A fixed low-score result for a detection-quality problem.
    pub fn degraded(movement: &str, score: i64, feedback: &str, coverage: f64, note: &str) -> Self {
        Self {
            score: score.clamp(scoring::MIN_SCORE, scoring::MAX_SCORE),
            feedback: feedback.to_string(),
            analysis: AnalysisSummary {
                frames: 1,
                coverage,
                movement: movement.to_string(),
                metrics: BTreeMap::new(),
                notes: vec![note.to_string()],
            },
        }
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn analysis(&self) -> &AnalysisSummary {
        &self.analysis
    }
}

impl AnalysisSummary {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    pub fn movement(&self) -> &str {
        &self.movement
    }

    pub fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metrics
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }
}
