//! Still image decoding for the single-frame pipeline.

use anyhow::Result;

use super::synthetic;
use super::MediaLocation;
use crate::error::MediaLoadError;
use crate::frame::Frame;

/// Decode the image at `url` into an RGB frame.
///
/// Any read or decode failure surfaces as [`MediaLoadError::Image`].
pub fn load_image(url: &str) -> Result<Frame> {
    match MediaLocation::parse(url)? {
        MediaLocation::Synthetic(stub) => Ok(synthetic::still_frame(&stub)?),
        MediaLocation::File(path) => {
            let decoded = image::open(&path).map_err(|e| MediaLoadError::Image {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let frame = Frame::from(decoded.to_rgb8());
            log::debug!(
                "decoded image {} ({}x{})",
                path.display(),
                frame.width,
                frame.height
            );
            Ok(frame)
        }
    }
}
