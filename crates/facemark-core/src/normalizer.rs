//! Cover-fit resampling of arbitrary images into a square fingerprint.

use crate::input::DecodeError;
use crate::types::NormalizedImage;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Edge length of a fingerprint unless configured otherwise.
pub const DEFAULT_TARGET_SIZE: u32 = 160;

/// Placement of a source image on the square canvas.
///
/// The scale fills the canvas completely; the overflowing axis is centered
/// and cropped, so `dx`/`dy` may be negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverFit {
    pub ratio: f32,
    pub scaled_width: f32,
    pub scaled_height: f32,
    pub dx: f32,
    pub dy: f32,
}

impl CoverFit {
    pub fn compute(width: u32, height: u32, target_size: u32) -> Self {
        let size = target_size as f32;
        let ratio = (size / width as f32).max(size / height as f32);
        let scaled_width = width as f32 * ratio;
        let scaled_height = height as f32 * ratio;
        Self {
            ratio,
            scaled_width,
            scaled_height,
            dx: (size - scaled_width) / 2.0,
            dy: (size - scaled_height) / 2.0,
        }
    }
}

/// Render `image` onto a fresh `target_size`×`target_size` canvas and read
/// back the RGBA buffer.
///
/// Each output pixel center is mapped back into source space and sampled
/// bilinearly with edge clamping. At a 1:1 ratio with zero offset the mapping
/// lands exactly on source pixels, so normalizing an already-normalized
/// fingerprint is the identity.
pub fn normalize(image: &DynamicImage, target_size: u32) -> Result<NormalizedImage, DecodeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }
    if target_size == 0 {
        return Err(DecodeError::ZeroTargetSize);
    }

    let src = image.to_rgba8();
    let fit = CoverFit::compute(width, height, target_size);

    let mut canvas = RgbaImage::new(target_size, target_size);
    for (ox, oy, pixel) in canvas.enumerate_pixels_mut() {
        let sx = (ox as f32 + 0.5 - fit.dx) / fit.ratio - 0.5;
        let sy = (oy as f32 + 0.5 - fit.dy) / fit.ratio - 0.5;
        *pixel = sample_bilinear(&src, sx, sy);
    }

    NormalizedImage::from_rgba(canvas).ok_or(DecodeError::EmptyImage)
}

fn sample_bilinear(src: &RgbaImage, sx: f32, sy: f32) -> Rgba<u8> {
    let clamp = |v: f32, len: u32| -> u32 { (v as i64).clamp(0, len as i64 - 1) as u32 };

    let x0f = sx.floor();
    let y0f = sy.floor();
    let fx = sx - x0f;
    let fy = sy - y0f;

    let (x0, x1) = (clamp(x0f, src.width()), clamp(x0f + 1.0, src.width()));
    let (y0, y1) = (clamp(y0f, src.height()), clamp(y0f + 1.0, src.height()));

    let tl = src.get_pixel(x0, y0);
    let tr = src.get_pixel(x1, y0);
    let bl = src.get_pixel(x0, y1);
    let br = src.get_pixel(x1, y1);

    let mut out = [0u8; 4];
    for (c, value) in out.iter_mut().enumerate() {
        let top = tl[c] as f32 * (1.0 - fx) + tr[c] as f32 * fx;
        let bot = bl[c] as f32 * (1.0 - fx) + br[c] as f32 * fx;
        *value = (top * (1.0 - fy) + bot * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
        }))
    }

    #[test]
    fn test_cover_fit_landscape_crops_width() {
        let fit = CoverFit::compute(320, 160, 160);
        assert!((fit.ratio - 1.0).abs() < 1e-6);
        assert!((fit.dx + 80.0).abs() < 1e-4, "dx = {}", fit.dx);
        assert!(fit.dy.abs() < 1e-6);
    }

    #[test]
    fn test_cover_fit_portrait_upscales() {
        let fit = CoverFit::compute(40, 80, 160);
        assert!((fit.ratio - 4.0).abs() < 1e-6);
        assert!((fit.scaled_height - 320.0).abs() < 1e-4);
        assert!((fit.dy + 80.0).abs() < 1e-4, "dy = {}", fit.dy);
    }

    #[test]
    fn test_normalize_identity_at_target_size() {
        let src = gradient(16, 16);
        let out = normalize(&src, 16).unwrap();
        assert_eq!(out.pixels(), src.to_rgba8().as_raw().as_slice());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(&gradient(50, 30), 24).unwrap();
        let twice = normalize(&DynamicImage::ImageRgba8(once.as_rgba_image().clone()), 24).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_centers_crop() {
        // Left third red, middle third green, right third blue. A square crop
        // of a 3:1 image keeps only the middle.
        let src = DynamicImage::ImageRgba8(RgbaImage::from_fn(30, 10, |x, _| match x / 10 {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        }));
        let out = normalize(&src, 10).unwrap();
        assert!(out.as_rgba_image().pixels().all(|p| *p == Rgba([0, 255, 0, 255])));
    }

    #[test]
    fn test_normalize_uniform_stays_uniform() {
        let src = DynamicImage::ImageRgba8(RgbaImage::from_pixel(7, 13, Rgba([56, 56, 56, 255])));
        let out = normalize(&src, 160).unwrap();
        assert!(out.as_rgba_image().pixels().all(|p| *p == Rgba([56, 56, 56, 255])));
    }

    #[test]
    fn test_normalize_rejects_zero_target() {
        assert!(matches!(normalize(&gradient(4, 4), 0), Err(DecodeError::ZeroTargetSize)));
    }

    #[test]
    fn test_normalize_rejects_empty_source() {
        let empty = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        assert!(matches!(normalize(&empty, 8), Err(DecodeError::EmptyImage)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_output_is_always_square(width in 1u32..200, height in 1u32..200, size in 1u32..48) {
            let out = normalize(&gradient(width, height), size).unwrap();
            prop_assert_eq!(out.size(), size);
            prop_assert_eq!(out.pixels().len(), (size * size * 4) as usize);
        }
    }
}
