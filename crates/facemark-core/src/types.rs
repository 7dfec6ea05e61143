use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

use crate::input;

/// Bytes per pixel in a normalized buffer (RGBA).
pub const CHANNELS: usize = 4;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("png encoding failed: {0}")]
    Png(#[from] image::ImageError),
}

/// Fixed-size square RGBA fingerprint produced by [`normalize`](crate::normalize).
///
/// Two fingerprints of the same size are comparable byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    image: RgbaImage,
}

impl NormalizedImage {
    /// Wrap a square, non-empty RGBA raster. Returns `None` for anything else.
    pub fn from_rgba(image: RgbaImage) -> Option<Self> {
        (image.width() > 0 && image.width() == image.height()).then_some(Self { image })
    }

    /// Build from a raw RGBA buffer of exactly `size * size * 4` bytes.
    pub fn from_raw(size: u32, pixels: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(size, size, pixels).and_then(Self::from_rgba)
    }

    /// Edge length in pixels.
    pub fn size(&self) -> u32 {
        self.image.width()
    }

    /// Raw RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels().len() / CHANNELS
    }

    pub fn as_rgba_image(&self) -> &RgbaImage {
        &self.image
    }

    /// Lossless PNG encoding, used as the storage representation.
    pub fn to_png(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// PNG encoding wrapped as a `data:image/png;base64,...` URI.
    pub fn to_data_uri(&self) -> Result<String, EncodeError> {
        Ok(input::encode_data_uri("image/png", &self.to_png()?))
    }
}

/// A registered comparison target.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub image: NormalizedImage,
}

/// One successful verification event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "time", alias = "timestamp")]
    pub timestamp: i64,
}

/// Nearest reference to a probe, as reported by a [`Matcher`](crate::Matcher).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub name: String,
    /// Mean absolute RGB difference in [0, 255]. Lower = more similar.
    pub distance: f64,
    /// Position of the winning reference in store order.
    pub index: usize,
}
