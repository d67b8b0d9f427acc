//! Frame sampling for the multi-frame pipeline.
//!
//! A clip is sampled at a fixed number of evenly spaced timestamps. Each
//! sample is a seek followed by one detection, strictly in ascending order:
//! the next seek is only issued once the previous detection has returned,
//! because both act on the same playback position.

use crate::features::{FeatureSample, FeatureSeries};
use crate::frame::Frame;
use crate::media::VideoMedia;
use crate::pose::DetectorHandle;

/// Frames requested from every seekable clip.
pub const SAMPLE_FRAMES: usize = 24;

/// Sampling stops this far before the end so the last seek stays inside the
/// stream.
pub const END_OF_STREAM_MARGIN_S: f64 = 0.05;

/// Evenly spaced timestamps across `duration`, clamped to
/// `[0, max(0, duration - END_OF_STREAM_MARGIN_S)]`.
pub fn sample_timestamps(duration: f64, count: usize) -> Vec<f64> {
    let last = (count.saturating_sub(1)).max(1) as f64;
    let upper = (duration - END_OF_STREAM_MARGIN_S).max(0.0);
    (0..count)
        .map(|i| {
            let t = duration * i as f64 / last;
            if t.is_finite() {
                t.clamp(0.0, upper)
            } else {
                0.0
            }
        })
        .collect()
}

/// What one pass over a clip produced.
#[derive(Debug, Clone)]
pub struct SampledFeatures {
    pub series: FeatureSeries,
    pub requested: usize,
    pub usable: usize,
}

impl SampledFeatures {
    /// `min(1, usable / requested)`, unrounded.
    pub fn coverage(&self) -> f64 {
        if self.requested == 0 {
            return 0.0;
        }
        (self.usable as f64 / self.requested as f64).min(1.0)
    }
}

/// Drives seek-then-detect over a seekable clip.
pub struct FrameSampler<'a> {
    detector: &'a DetectorHandle,
    frames: usize,
}

impl<'a> FrameSampler<'a> {
    pub fn new(detector: &'a DetectorHandle) -> Self {
        Self {
            detector,
            frames: SAMPLE_FRAMES,
        }
    }

    /// Override the number of requested frames.
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn sample(&self, media: &mut dyn VideoMedia) -> SampledFeatures {
        let duration = media.duration();
        let mut series = FeatureSeries::new();

        for target in sample_timestamps(duration, self.frames) {
            // A seek that never reports its new position only costs this frame.
            let reached = match media.seek(target) {
                Ok(reached) => reached,
                Err(err) => {
                    log::warn!("skipping frame at {:.3}s: {}", target, err);
                    continue;
                }
            };
            let frame = match media.current_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    log::warn!("skipping frame at {:.3}s: {:#}", reached, err);
                    continue;
                }
            };
            match self.detect_sample(&frame) {
                Some(sample) => series.push(sample),
                None => log::debug!("no usable pose at {:.3}s", reached),
            }
        }

        let usable = series.len();
        log::info!(
            "sampled {} of {} frames over {:.2}s",
            usable,
            self.frames,
            duration
        );
        SampledFeatures {
            series,
            requested: self.frames,
            usable,
        }
    }

    /// One detection; any failure or incomplete subject yields `None`.
    fn detect_sample(&self, frame: &Frame) -> Option<FeatureSample> {
        let subjects = match self.detector.detect(frame, 1) {
            Ok(subjects) => subjects,
            Err(err) => {
                log::debug!("detection failed: {:#}", err);
                return None;
            }
        };
        subjects.first().and_then(FeatureSample::from_subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeekError;
    use crate::media::SyntheticVideo;
    use crate::pose::{SharedDetector, StubBackend, Subject};
    use anyhow::Result;

    fn detector(backend: StubBackend) -> DetectorHandle {
        SharedDetector::ready(backend).handle().unwrap()
    }

    #[test]
    fn timestamps_for_whole_second_clip() {
        let stamps = sample_timestamps(23.0, 24);
        assert_eq!(stamps.len(), 24);
        for (i, t) in stamps.iter().take(23).enumerate() {
            assert!((t - i as f64).abs() < 1e-9, "t[{}] = {}", i, t);
        }
        assert!((stamps[23] - 22.95).abs() < 1e-9);
    }

    #[test]
    fn timestamps_stay_in_range_for_tiny_clips() {
        for t in sample_timestamps(0.03, 24) {
            assert_eq!(t, 0.0);
        }
        let single = sample_timestamps(5.0, 1);
        assert_eq!(single, vec![0.0]);
    }

    #[test]
    fn non_finite_timestamps_become_zero() {
        assert!(sample_timestamps(f64::NAN, 4).iter().all(|t| *t == 0.0));
    }

    #[test]
    fn full_clip_is_fully_covered() {
        let handle = detector(StubBackend::new());
        let mut clip = SyntheticVideo::clip(12.0);
        let sampled = FrameSampler::new(&handle).sample(&mut clip);
        assert_eq!(sampled.requested, SAMPLE_FRAMES);
        assert_eq!(sampled.usable, SAMPLE_FRAMES);
        assert_eq!(sampled.coverage(), 1.0);
    }

    #[test]
    fn incomplete_and_failed_detections_are_skipped() {
        let partial = Subject::new(Vec::new());
        let backend = StubBackend::scripted()
            .push_subject(crate::pose::standing_pose(640.0, 480.0))
            .push_subject(partial)
            .push_error("model hiccup")
            .push_empty();
        let handle = detector(backend);
        let mut clip = SyntheticVideo::clip(4.0);
        let sampled = FrameSampler::new(&handle).with_frames(4).sample(&mut clip);
        assert_eq!(sampled.usable, 1);
        assert_eq!(sampled.series.len(), 1);
        assert_eq!(sampled.coverage(), 0.25);
    }

    struct FlakySeeks {
        inner: SyntheticVideo,
        seeks: usize,
    }

    impl VideoMedia for FlakySeeks {
        fn duration(&self) -> f64 {
            self.inner.duration()
        }
        fn play(&mut self) -> Result<()> {
            self.inner.play()
        }
        fn seek(&mut self, target: f64) -> Result<f64, SeekError> {
            self.seeks += 1;
            if self.seeks % 2 == 0 {
                return Err(SeekError::Timeout {
                    target,
                    timeout_ms: 10,
                });
            }
            self.inner.seek(target)
        }
        fn current_frame(&mut self) -> Result<Frame> {
            self.inner.current_frame()
        }
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            self.inner.next_frame()
        }
    }

    #[test]
    fn failed_seeks_only_cost_their_frame() {
        let handle = detector(StubBackend::new());
        let mut media = FlakySeeks {
            inner: SyntheticVideo::clip(10.0),
            seeks: 0,
        };
        let sampled = FrameSampler::new(&handle).sample(&mut media);
        assert_eq!(media.seeks, SAMPLE_FRAMES);
        assert_eq!(sampled.usable, SAMPLE_FRAMES / 2);
        assert_eq!(sampled.coverage(), 0.5);
    }
}
