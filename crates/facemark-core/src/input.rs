//! Probe and reference image input: decoded handles, encoded file bytes,
//! or base64 data URIs as produced by browser canvases and file readers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("malformed data URI: {0}")]
    MalformedDataUri(&'static str),
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("target size must be at least 1px")]
    ZeroTargetSize,
}

/// An image as handed to the engine by the host application.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Already decoded by the caller.
    Decoded(DynamicImage),
    /// Encoded file contents; the format is sniffed from the bytes.
    Bytes(Vec<u8>),
    /// `data:<mime>;base64,<payload>`.
    DataUri(String),
}

impl ImageSource {
    pub fn decode(self) -> Result<DynamicImage, DecodeError> {
        let image = match self {
            ImageSource::Decoded(image) => image,
            ImageSource::Bytes(bytes) => image::load_from_memory(&bytes)?,
            ImageSource::DataUri(uri) => image::load_from_memory(&decode_data_uri(&uri)?)?,
        };

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage);
        }
        Ok(image)
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Decoded(image)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

/// Extract the binary payload of a base64 data URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, DecodeError> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or(DecodeError::MalformedDataUri("missing data: scheme"))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or(DecodeError::MalformedDataUri("missing payload separator"))?;

    if !header.split(';').any(|param| param.eq_ignore_ascii_case("base64")) {
        return Err(DecodeError::MalformedDataUri("payload is not base64-encoded"));
    }

    Ok(STANDARD.decode(payload.trim())?)
}

pub fn encode_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_decode_bytes() {
        let img = ImageSource::Bytes(png_bytes(3, 5)).decode().unwrap();
        assert_eq!(img.dimensions(), (3, 5));
    }

    #[test]
    fn test_decode_data_uri() {
        let uri = encode_data_uri("image/png", &png_bytes(4, 2));
        let img = ImageSource::DataUri(uri).decode().unwrap();
        assert_eq!(img.dimensions(), (4, 2));
    }

    #[test]
    fn test_decode_garbage_bytes_fails() {
        let err = ImageSource::Bytes(b"not an image".to_vec()).decode().unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn test_data_uri_missing_scheme() {
        let err = decode_data_uri("image/png;base64,AAAA").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedDataUri(_)));
    }

    #[test]
    fn test_data_uri_missing_separator() {
        let err = decode_data_uri("data:image/png;base64").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedDataUri(_)));
    }

    #[test]
    fn test_data_uri_not_base64() {
        let err = decode_data_uri("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedDataUri(_)));
    }

    #[test]
    fn test_data_uri_bad_payload() {
        let err = decode_data_uri("data:image/png;base64,@@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_decoded_empty_image_rejected() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 7));
        assert!(matches!(ImageSource::from(empty).decode(), Err(DecodeError::EmptyImage)));
    }
}
