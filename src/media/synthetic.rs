//! Synthetic `stub://` media.
//!
//! `stub://<name>?duration=<secs>&width=<px>&height=<px>&fps=<n>` yields a
//! seekable clip of grey frames whose shade follows the playback position.
//! `duration=0` (or `inf`) models a live stream. These sources exist so the
//! pipelines can run end to end without a decoder or a camera.

use anyhow::Result;
use url::Url;

use super::video::{is_seekable, VideoMedia};
use crate::error::{MediaLoadError, SeekError};
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_DURATION_S: f64 = 10.0;
const DEFAULT_FPS: u32 = 24;

#[derive(Clone, Debug)]
struct StubParams {
    width: u32,
    height: u32,
    duration: f64,
    fps: u32,
}

fn parse_params(url: &Url) -> Result<StubParams, MediaLoadError> {
    let mut params = StubParams {
        width: DEFAULT_WIDTH,
        height: DEFAULT_HEIGHT,
        duration: DEFAULT_DURATION_S,
        fps: DEFAULT_FPS,
    };
    for (key, value) in url.query_pairs() {
        let key: &str = &key;
        let value: &str = &value;
        match key {
            "width" => params.width = value.parse().map_err(|_| invalid(url, key, value))?,
            "height" => params.height = value.parse().map_err(|_| invalid(url, key, value))?,
            "duration" => params.duration = value.parse().map_err(|_| invalid(url, key, value))?,
            "fps" => params.fps = value.parse().map_err(|_| invalid(url, key, value))?,
            _ => {}
        }
    }
    if params.fps == 0 {
        return Err(invalid(url, "fps", "0"));
    }
    Ok(params)
}

fn invalid(url: &Url, key: &str, value: &str) -> MediaLoadError {
    MediaLoadError::Unsupported {
        url: url.to_string(),
        reason: format!("invalid stub parameter {}={}", key, value),
    }
}

/// A single still frame described by a `stub://` URL.
pub(crate) fn still_frame(url: &Url) -> Result<Frame, MediaLoadError> {
    let params = parse_params(url)?;
    Ok(Frame::blank(params.width, params.height, 128))
}

/// Seekable synthetic clip (or endless live stream).
pub struct SyntheticVideo {
    params: StubParams,
    position: f64,
    playing: bool,
}

impl SyntheticVideo {
    pub fn from_url(url: &Url) -> Result<Self, MediaLoadError> {
        Ok(Self {
            params: parse_params(url)?,
            position: 0.0,
            playing: false,
        })
    }

    /// A clip of `duration` seconds at the default size.
    pub fn clip(duration: f64) -> Self {
        Self {
            params: StubParams {
                width: DEFAULT_WIDTH,
                height: DEFAULT_HEIGHT,
                duration,
                fps: DEFAULT_FPS,
            },
            position: 0.0,
            playing: false,
        }
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    fn frame_at_position(&self) -> Frame {
        let shade = ((self.position * 10.0) as u64 % 256) as u8;
        Frame::blank(self.params.width, self.params.height, shade)
    }
}

impl VideoMedia for SyntheticVideo {
    fn duration(&self) -> f64 {
        self.params.duration
    }

    fn play(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }

    fn seek(&mut self, target: f64) -> Result<f64, SeekError> {
        if !is_seekable(self.params.duration) {
            return Err(SeekError::Rejected {
                target,
                reason: "live stream is not seekable".to_string(),
            });
        }
        if !target.is_finite() || target < 0.0 || target > self.params.duration {
            return Err(SeekError::Rejected {
                target,
                reason: format!("outside clip of {:.3}s", self.params.duration),
            });
        }
        self.position = target;
        Ok(self.position)
    }

    fn current_frame(&mut self) -> Result<Frame> {
        Ok(self.frame_at_position())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let live = !is_seekable(self.params.duration);
        if !live && self.position >= self.params.duration {
            return Ok(None);
        }
        let frame = self.frame_at_position();
        self.position += 1.0 / f64::from(self.params.fps);
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn parses_query_parameters() {
        let video = SyntheticVideo::from_url(&stub("stub://clip?duration=23&width=64&height=48")).unwrap();
        assert_eq!(video.duration(), 23.0);
        let mut video = video;
        let frame = video.current_frame().unwrap();
        assert_eq!((frame.width, frame.height), (64, 48));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(SyntheticVideo::from_url(&stub("stub://clip?duration=soon")).is_err());
        assert!(SyntheticVideo::from_url(&stub("stub://clip?fps=0")).is_err());
    }

    #[test]
    fn seek_moves_position_within_clip() {
        let mut video = SyntheticVideo::clip(5.0);
        assert_eq!(video.seek(2.5).unwrap(), 2.5);
        assert_eq!(video.position(), 2.5);
        assert!(video.seek(6.0).is_err());
        assert_eq!(video.position(), 2.5);
    }

    #[test]
    fn live_stream_cannot_seek_but_never_ends() {
        let mut live = SyntheticVideo::from_url(&stub("stub://cam?duration=0")).unwrap();
        assert!(live.seek(0.0).is_err());
        live.play().unwrap();
        assert!(live.is_playing());
        for _ in 0..100 {
            assert!(live.next_frame().unwrap().is_some());
        }
    }

    #[test]
    fn finite_clip_ends() {
        let mut video = SyntheticVideo::from_url(&stub("stub://clip?duration=0.5&fps=4")).unwrap();
        let mut frames = 0;
        while video.next_frame().unwrap().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 2);
    }
}
