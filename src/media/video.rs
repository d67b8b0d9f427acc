use anyhow::Result;

use crate::error::SeekError;
use crate::frame::Frame;

/// Playback contract for a single video resource.
///
/// A `VideoMedia` has one playback position. Methods take `&mut self`, so
/// only one owner can seek it at a time and seeks can never overlap.
pub trait VideoMedia {
    /// Total duration in seconds. Live streams report zero or a non-finite
    /// value.
    fn duration(&self) -> f64;

    /// Start playback. Only meaningful for live sources.
    fn play(&mut self) -> Result<()>;

    /// Move the playback position and block until the source signals that
    /// the position was updated. Returns the position actually reached.
    fn seek(&mut self, target: f64) -> Result<f64, SeekError>;

    /// The frame at the current playback position.
    fn current_frame(&mut self) -> Result<Frame>;

    /// Advance sequential playback by one frame. `None` once the media has
    /// ended; live sources never end.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// True when `duration` describes a seekable clip rather than a live stream.
pub fn is_seekable(duration: f64) -> bool {
    duration.is_finite() && duration > 0.0
}

impl<V: VideoMedia + ?Sized> VideoMedia for Box<V> {
    fn duration(&self) -> f64 {
        (**self).duration()
    }

    fn play(&mut self) -> Result<()> {
        (**self).play()
    }

    fn seek(&mut self, target: f64) -> Result<f64, SeekError> {
        (**self).seek(target)
    }

    fn current_frame(&mut self) -> Result<Frame> {
        (**self).current_frame()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
