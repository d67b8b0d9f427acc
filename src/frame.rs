//! Decoded frames handed to the pose source.
//!
//! A `Frame` is transient: it is produced by an image decode, a video seek
//! or a live feed tick, passed to one detection call and then dropped.

use image::RgbImage;

/// One decoded RGB24 frame.
#[derive(Clone)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Build a frame from packed RGB24 pixels.
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        if data.len() != expected {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
        })
    }

    /// A frame with no pixels, as a live feed reports before the first
    /// picture arrives.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    /// Solid grey frame, used by synthetic sources.
    pub fn blank(width: u32, height: u32, shade: u8) -> Self {
        let len = (width as usize) * (height as usize) * 3;
        Self {
            data: vec![shade; len],
            width,
            height,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// True when either dimension is zero; such frames are never sent to a
    /// detector.
    pub fn has_no_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}
