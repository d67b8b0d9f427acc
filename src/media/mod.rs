//! Media sources and dispatch.
//!
//! - `MediaDescriptor` / `MediaKind`: decide between the single-frame image
//!   pipeline and the multi-frame video pipeline
//! - `image`: still image decoding
//! - `video`: the `VideoMedia` playback contract the frame sampler drives
//! - `synthetic`: `stub://` sources for tests and model-free demos
//! - `ffmpeg` (feature: video-ffmpeg): local video files
//!
//! Sources accept local paths, `file://` URLs and `stub://` URLs. Remote
//! URLs are rejected; fetching media is the caller's job.

#[cfg(feature = "video-ffmpeg")]
mod ffmpeg;
pub mod image;
pub mod synthetic;
pub mod video;

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::VideoSettings;
use crate::error::MediaLoadError;

pub use self::image::load_image;
pub use synthetic::SyntheticVideo;
pub use video::VideoMedia;

/// Extensions treated as still images when no usable type is declared.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Input boundary: where the media lives and what the caller says it is.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub url: String,
    #[serde(default, rename = "declaredType", skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
}

impl MediaDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            declared_type: None,
        }
    }

    pub fn with_type(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    /// Lower-cased file extension of the URL, ignoring query and fragment.
    pub fn extension(&self) -> Option<String> {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        let file_name = path.rsplit(['/', '\\']).next().unwrap_or_default();
        let (_, ext) = file_name.rsplit_once('.')?;
        if ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::of(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Declared `image/*` or `video/*` types decide outright. Anything else
    /// falls back to the extension; unknown media is treated as video.
    pub fn of(media: &MediaDescriptor) -> MediaKind {
        let declared = media
            .declared_type
            .as_deref()
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if declared.starts_with("image/") {
            return MediaKind::Image;
        }
        if declared.starts_with("video/") {
            return MediaKind::Video;
        }
        match media.extension() {
            Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => MediaKind::Image,
            _ => MediaKind::Video,
        }
    }
}

/// Resolved location of a media resource.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum MediaLocation {
    File(PathBuf),
    Synthetic(Url),
}

impl MediaLocation {
    pub(crate) fn parse(raw: &str) -> Result<Self, MediaLoadError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MediaLoadError::Unsupported {
                url: raw.to_string(),
                reason: "empty media url".to_string(),
            });
        }
        // Single-letter schemes are Windows drive letters, not URLs.
        let url = match Url::parse(trimmed) {
            Ok(url) if url.scheme().len() > 1 => url,
            _ => return Ok(MediaLocation::File(PathBuf::from(trimmed))),
        };
        match url.scheme() {
            "stub" => Ok(MediaLocation::Synthetic(url)),
            "file" => url
                .to_file_path()
                .map(MediaLocation::File)
                .map_err(|_| MediaLoadError::Unsupported {
                    url: raw.to_string(),
                    reason: "file url does not name a local path".to_string(),
                }),
            other => Err(MediaLoadError::Unsupported {
                url: raw.to_string(),
                reason: format!("'{}' sources are not supported; pass a local file", other),
            }),
        }
    }
}

/// Open a video resource for sampling.
pub fn open_video(url: &str, settings: &VideoSettings) -> Result<Box<dyn VideoMedia>> {
    match MediaLocation::parse(url)? {
        MediaLocation::Synthetic(stub) => Ok(Box::new(SyntheticVideo::from_url(&stub)?)),
        MediaLocation::File(path) => open_file_video(url, path, settings),
    }
}

#[cfg(feature = "video-ffmpeg")]
fn open_file_video(
    url: &str,
    path: PathBuf,
    settings: &VideoSettings,
) -> Result<Box<dyn VideoMedia>> {
    if !path.is_file() {
        return Err(MediaLoadError::Video {
            url: url.to_string(),
            reason: "no such file".to_string(),
        }
        .into());
    }
    Ok(Box::new(ffmpeg::FfmpegVideo::open(
        url,
        &path,
        settings.seek_timeout,
    )?))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_file_video(
    url: &str,
    _path: PathBuf,
    _settings: &VideoSettings,
) -> Result<Box<dyn VideoMedia>> {
    Err(MediaLoadError::Unsupported {
        url: url.to_string(),
        reason: "video decoding requires the video-ffmpeg feature".to_string(),
    }
    .into())
}
