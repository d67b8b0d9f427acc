//! Analysis entry point.
//!
//! `Analyzer` owns a handle to the shared pose detector and routes each
//! media descriptor to one of three paths:
//!
//! - still image: one detection, fixed degraded results for a missing or
//!   incomplete subject
//! - seekable clip: `FrameSampler` over 24 timestamps
//! - live stream (no finite duration): play, then one snapshot

use std::sync::Arc;

use anyhow::Result;

use crate::config::ScorerConfig;
use crate::features::{FeatureSample, FeatureSeries};
use crate::frame::Frame;
use crate::media::{self, video::is_seekable, MediaDescriptor, MediaKind, VideoMedia};
use crate::pose::{factory_for, SharedDetector};
use crate::sampler::FrameSampler;
use crate::scoring::score_from_metrics;
use crate::AnalysisResult;

/// Score given to image results whose pose could not be scored.
pub const DEGRADED_SCORE: i64 = 4;

pub struct Analyzer {
    detector: Arc<SharedDetector>,
    config: ScorerConfig,
}

impl Analyzer {
    /// Build an analyzer whose backend is chosen by `config.backend`. The
    /// backend itself is not constructed until first use or `warm_up`.
    pub fn from_config(config: ScorerConfig) -> Result<Self> {
        let factory = factory_for(&config.backend)?;
        Ok(Self::new(Arc::new(SharedDetector::new(factory)), config))
    }

    pub fn new(detector: Arc<SharedDetector>, config: ScorerConfig) -> Self {
        Self { detector, config }
    }

    pub fn detector(&self) -> &Arc<SharedDetector> {
        &self.detector
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Initialise the pose detector ahead of the first analysis.
    pub fn warm_up(&self) -> Result<()> {
        self.detector.warm_up()
    }

    /// Dispatch `media` to the image or video pipeline.
    pub fn analyze_media(&self, media: &MediaDescriptor, movement: &str) -> Result<AnalysisResult> {
        let kind = media.kind();
        log::info!("analyzing {} as {:?} ({})", media.url, kind, movement);
        match kind {
            MediaKind::Image => self.analyze_image(&media.url, movement),
            MediaKind::Video => self.analyze_video(&media.url, movement),
        }
    }

    pub fn analyze_image(&self, url: &str, movement: &str) -> Result<AnalysisResult> {
        let frame = media::load_image(url)?;
        self.analyze_frame(&frame, movement)
    }

    /// Single-frame pipeline on an already decoded frame.
    pub fn analyze_frame(&self, frame: &Frame, movement: &str) -> Result<AnalysisResult> {
        let detector = self.detector.handle()?;
        let subjects = detector.detect(frame, 1)?;
        let Some(subject) = subjects.first() else {
            log::info!("no subject detected");
            return Ok(AnalysisResult::degraded(
                movement,
                DEGRADED_SCORE,
                "Pose not detected",
                0.0,
                "no pose",
            ));
        };
        let Some(sample) = FeatureSample::from_subject(subject) else {
            log::info!("subject is missing required keypoints");
            return Ok(AnalysisResult::degraded(
                movement,
                DEGRADED_SCORE,
                "Keypoints low-confidence",
                0.5,
                "low confidence",
            ));
        };
        Ok(finish(movement, 1, FeatureSeries::single(sample), 1.0))
    }

    pub fn analyze_video(&self, url: &str, movement: &str) -> Result<AnalysisResult> {
        let mut video = media::open_video(url, &self.config.video)?;
        self.analyze_video_media(video.as_mut(), movement)
    }

    /// Multi-frame pipeline over an opened video. The caller must not touch
    /// `video` from anywhere else while this runs.
    pub fn analyze_video_media(
        &self,
        video: &mut dyn VideoMedia,
        movement: &str,
    ) -> Result<AnalysisResult> {
        let detector = self.detector.handle()?;
        let duration = video.duration();

        if !is_seekable(duration) {
            log::info!("live stream (duration {}), taking one snapshot", duration);
            if let Err(err) = video.play() {
                log::debug!("play failed: {:#}", err);
            }
            let sample = video
                .current_frame()
                .map_err(|err| log::debug!("snapshot frame unavailable: {:#}", err))
                .ok()
                .and_then(|frame| {
                    detector
                        .detect(&frame, 1)
                        .map_err(|err| log::debug!("snapshot detection failed: {:#}", err))
                        .ok()
                })
                .and_then(|subjects| subjects.first().and_then(FeatureSample::from_subject));
            let (series, coverage) = match sample {
                Some(sample) => (FeatureSeries::single(sample), 1.0),
                None => (FeatureSeries::new(), 0.0),
            };
            return Ok(finish(movement, 1, series, coverage));
        }

        let sampled = FrameSampler::new(&detector).sample(video);
        let coverage = sampled.coverage();
        Ok(finish(movement, sampled.requested, sampled.series, coverage))
    }
}

fn finish(movement: &str, frames: usize, series: FeatureSeries, coverage: f64) -> AnalysisResult {
    let card = score_from_metrics(movement, &series, coverage);
    log::info!(
        "{}: score {} from {} usable frame(s), coverage {:.2}",
        movement,
        card.score,
        series.len(),
        coverage
    );
    AnalysisResult::from_scorecard(movement, frames, coverage, card)
}
