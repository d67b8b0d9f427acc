//! Typed failures that callers may want to tell apart.
//!
//! Everything else in the crate travels as `anyhow::Error`; these types ride
//! inside it and can be recovered with `downcast_ref`.

use thiserror::Error;

/// The media resource could not be decoded. Fatal to one analysis call.
#[derive(Debug, Error)]
pub enum MediaLoadError {
    #[error("image load error: {path}: {reason}")]
    Image { path: String, reason: String },
    #[error("video load error: {url}: {reason}")]
    Video { url: String, reason: String },
    #[error("unsupported media source '{url}': {reason}")]
    Unsupported { url: String, reason: String },
}

/// A seek that never reported an updated playback position.
///
/// Only ever affects a single sampled frame.
#[derive(Debug, Error)]
pub enum SeekError {
    #[error("seek to {target:.3}s rejected: {reason}")]
    Rejected { target: f64, reason: String },
    #[error("seek to {target:.3}s timed out after {timeout_ms} ms")]
    Timeout { target: f64, timeout_ms: u64 },
    #[error("playback worker is gone")]
    WorkerGone,
}
