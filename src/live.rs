//! Live skeleton overlay.
//!
//! A perpetual loop over a playing feed: one detection per tick, drawn as
//! points and bones onto an [`OverlaySink`]. Unlike the scoring pipelines
//! this loop never gives up on a detection error; it logs it and tries
//! again on the next tick. It runs until the feed ends, a frame limit is
//! hit, or its [`StopHandle`] fires.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;

use crate::config::OverlaySettings;
use crate::frame::Frame;
use crate::media::VideoMedia;
use crate::pose::{DetectorHandle, Joint, SharedDetector, Subject};

/// Default minimum keypoint confidence for drawing.
pub const OVERLAY_CONFIDENCE: f32 = 0.3;

/// Bones drawn between joints.
pub const SKELETON_EDGES: [(Joint, Joint); 12] = [
    (Joint::LeftShoulder, Joint::LeftElbow),
    (Joint::LeftElbow, Joint::LeftWrist),
    (Joint::RightShoulder, Joint::RightElbow),
    (Joint::RightElbow, Joint::RightWrist),
    (Joint::LeftHip, Joint::LeftKnee),
    (Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightHip, Joint::RightKnee),
    (Joint::RightKnee, Joint::RightAnkle),
    (Joint::LeftShoulder, Joint::RightShoulder),
    (Joint::LeftHip, Joint::RightHip),
    (Joint::LeftShoulder, Joint::LeftHip),
    (Joint::RightShoulder, Joint::RightHip),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joint: Option<Joint>,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub from: [f32; 2],
    pub to: [f32; 2],
}

/// One frame's worth of overlay geometry, in frame pixels.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Skeleton {
    pub width: u32,
    pub height: u32,
    pub points: Vec<OverlayPoint>,
    pub segments: Vec<Segment>,
}

fn confident(score: Option<f32>, threshold: f32) -> bool {
    // Backends without scores are trusted.
    score.unwrap_or(1.0) > threshold
}

/// Points above `threshold` and every edge whose two ends are above it.
pub fn build_skeleton(subject: &Subject, width: u32, height: u32, threshold: f32) -> Skeleton {
    let points = subject
        .keypoints
        .iter()
        .filter(|k| k.x.is_finite() && k.y.is_finite() && confident(k.score, threshold))
        .map(|k| OverlayPoint {
            joint: k.joint,
            x: k.x,
            y: k.y,
        })
        .collect();

    let segments = SKELETON_EDGES
        .iter()
        .filter_map(|(a, b)| {
            let ka = subject.keypoint(*a)?;
            let kb = subject.keypoint(*b)?;
            if confident(ka.score, threshold) && confident(kb.score, threshold) {
                Some(Segment {
                    from: [ka.x, ka.y],
                    to: [kb.x, kb.y],
                })
            } else {
                None
            }
        })
        .collect();

    Skeleton {
        width,
        height,
        points,
        segments,
    }
}

/// Drawing surface for the overlay.
pub trait OverlaySink {
    fn draw(&mut self, skeleton: &Skeleton) -> Result<()>;
    fn clear(&mut self);
}

/// Cancels a running overlay loop. Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Counters reported when the loop exits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LiveStats {
    pub ticks: u64,
    pub skipped_empty: u64,
    pub detection_errors: u64,
    pub draws: u64,
}

pub struct LiveOverlay {
    detector: Arc<SharedDetector>,
    threshold: f32,
    interval: Duration,
    max_frames: Option<u64>,
}

impl LiveOverlay {
    pub fn new(detector: Arc<SharedDetector>, settings: &OverlaySettings) -> Self {
        Self {
            detector,
            threshold: settings.confidence_threshold,
            interval: settings.frame_interval(),
            max_frames: None,
        }
    }

    /// Stop after this many ticks.
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Minimum time between ticks. Zero runs as fast as the feed allows.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn run(
        &self,
        feed: &mut dyn VideoMedia,
        sink: &mut dyn OverlaySink,
        stop: &StopHandle,
    ) -> Result<LiveStats> {
        let detector = self.detector.handle()?;
        feed.play()?;
        let mut stats = LiveStats::default();
        // A sink failure ends the loop, but the surface is still cleared.
        let mut outcome = Ok(());

        while !stop.is_stopped() {
            if self.max_frames.is_some_and(|max| stats.ticks >= max) {
                break;
            }
            let started = Instant::now();
            stats.ticks += 1;

            let frame = match feed.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("live feed ended after {} ticks", stats.ticks);
                    break;
                }
                Err(err) => {
                    log::debug!("feed frame unavailable, retrying: {:#}", err);
                    self.pace(started);
                    continue;
                }
            };
            if let Err(err) = self.tick(&detector, &frame, sink, &mut stats) {
                outcome = Err(err);
                break;
            }
            self.pace(started);
        }

        sink.clear();
        outcome?;
        log::info!(
            "live overlay stopped: {} ticks, {} draws, {} detection errors",
            stats.ticks,
            stats.draws,
            stats.detection_errors
        );
        Ok(stats)
    }

    fn tick(
        &self,
        detector: &DetectorHandle,
        frame: &Frame,
        sink: &mut dyn OverlaySink,
        stats: &mut LiveStats,
    ) -> Result<()> {
        if frame.has_no_area() {
            stats.skipped_empty += 1;
            return Ok(());
        }
        // Detection errors are retried on the next tick with no backoff.
        let subjects = match detector.detect(frame, 1) {
            Ok(subjects) => subjects,
            Err(err) => {
                stats.detection_errors += 1;
                log::debug!("live detection failed: {:#}", err);
                return Ok(());
            }
        };
        if let Some(subject) = subjects.first() {
            let skeleton = build_skeleton(subject, frame.width, frame.height, self.threshold);
            sink.draw(&skeleton)?;
            stats.draws += 1;
        }
        Ok(())
    }

    fn pace(&self, started: Instant) {
        if let Some(rest) = self.interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeekError;
    use crate::media::SyntheticVideo;
    use crate::pose::{standing_pose, Keypoint, StubBackend};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingSink {
        drawn: Vec<Skeleton>,
        cleared: usize,
    }

    impl OverlaySink for RecordingSink {
        fn draw(&mut self, skeleton: &Skeleton) -> Result<()> {
            self.drawn.push(skeleton.clone());
            Ok(())
        }

        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    struct QueuedFeed {
        frames: VecDeque<Frame>,
    }

    impl VideoMedia for QueuedFeed {
        fn duration(&self) -> f64 {
            0.0
        }
        fn play(&mut self) -> Result<()> {
            Ok(())
        }
        fn seek(&mut self, target: f64) -> Result<f64, SeekError> {
            Err(SeekError::Rejected {
                target,
                reason: "live".to_string(),
            })
        }
        fn current_frame(&mut self) -> Result<Frame> {
            Ok(Frame::empty())
        }
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.pop_front())
        }
    }

    fn overlay(backend: StubBackend) -> LiveOverlay {
        LiveOverlay::new(
            Arc::new(SharedDetector::ready(backend)),
            &crate::config::ScorerConfig::default().overlay,
        )
        .with_frame_interval(Duration::ZERO)
    }

    #[test]
    fn skeleton_uses_threshold_and_twelve_edges() {
        let full = build_skeleton(&standing_pose(100.0, 200.0), 100, 200, OVERLAY_CONFIDENCE);
        assert_eq!(full.points.len(), 17);
        assert_eq!(full.segments.len(), 12);

        let mut subject = standing_pose(100.0, 200.0);
        subject.keypoints[Joint::LeftElbow.index()].score = Some(0.3);
        let trimmed = build_skeleton(&subject, 100, 200, OVERLAY_CONFIDENCE);
        assert_eq!(trimmed.points.len(), 16);
        assert_eq!(trimmed.segments.len(), 10);
    }

    #[test]
    fn missing_scores_count_as_confident() {
        let subject = Subject::new(vec![
            Keypoint::new(1.0, 2.0),
            Keypoint::new(3.0, 4.0),
        ]);
        let skeleton = build_skeleton(&subject, 10, 10, 0.99);
        assert_eq!(skeleton.points.len(), 2);
        assert!(skeleton.segments.is_empty());
    }

    #[test]
    fn zero_area_frames_are_skipped_and_errors_retried() {
        let backend = StubBackend::scripted()
            .push_error("reshape failed")
            .push_subject(standing_pose(64.0, 48.0));
        let mut feed = QueuedFeed {
            frames: VecDeque::from(vec![
                Frame::empty(),
                Frame::blank(64, 48, 0),
                Frame::blank(64, 48, 0),
            ]),
        };
        let mut sink = RecordingSink::default();
        let stats = overlay(backend)
            .run(&mut feed, &mut sink, &StopHandle::new())
            .unwrap();

        assert_eq!(stats.skipped_empty, 1);
        assert_eq!(stats.detection_errors, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(sink.drawn.len(), 1);
        assert_eq!(sink.cleared, 1);
    }

    #[test]
    fn stop_handle_halts_a_live_feed() {
        let stop = StopHandle::new();
        let remote = stop.clone();
        let handle = std::thread::spawn(move || {
            let mut feed = SyntheticVideo::clip(0.0);
            let mut sink = RecordingSink::default();
            let overlay = overlay(StubBackend::new())
                .with_frame_interval(Duration::from_millis(5));
            overlay.run(&mut feed, &mut sink, &stop).map(|s| (s, sink.cleared))
        });
        std::thread::sleep(Duration::from_millis(50));
        remote.stop();
        let (stats, cleared) = handle.join().unwrap().unwrap();
        assert!(stats.draws > 0);
        assert_eq!(cleared, 1);
    }

    struct LostSurface {
        attempts: usize,
        cleared: usize,
    }

    impl OverlaySink for LostSurface {
        fn draw(&mut self, _skeleton: &Skeleton) -> Result<()> {
            self.attempts += 1;
            anyhow::bail!("surface lost")
        }

        fn clear(&mut self) {
            self.cleared += 1;
        }
    }

    #[test]
    fn sink_failure_still_clears_the_surface() {
        let mut feed = SyntheticVideo::clip(0.0);
        let mut sink = LostSurface {
            attempts: 0,
            cleared: 0,
        };
        let err = overlay(StubBackend::new())
            .with_max_frames(3)
            .run(&mut feed, &mut sink, &StopHandle::new())
            .unwrap_err();
        assert!(err.to_string().contains("surface lost"));
        assert_eq!(sink.attempts, 1);
        assert_eq!(sink.cleared, 1);
    }

    #[test]
    fn frame_limit_ends_the_loop() {
        let mut feed = SyntheticVideo::clip(0.0);
        let mut sink = RecordingSink::default();
        let stats = overlay(StubBackend::new())
            .with_max_frames(5)
            .run(&mut feed, &mut sink, &StopHandle::new())
            .unwrap();
        assert_eq!(stats.ticks, 5);
        assert_eq!(sink.drawn.len(), 5);
    }
}
