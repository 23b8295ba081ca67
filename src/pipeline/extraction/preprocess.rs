//! Image preparation ahead of OCR.
//!
//! Phone photos of pharmacy labels arrive as color JPEGs with EXIF rotation.
//! The engine gets an upright, single-channel, lossless PNG.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::debug;

use super::RecognitionError;

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Decode, orient, convert to 8-bit grayscale, re-encode as PNG.
pub fn prepare_for_ocr(raw_bytes: &[u8]) -> Result<Vec<u8>, RecognitionError> {
    if raw_bytes.len() < MIN_IMAGE_BYTES {
        return Err(RecognitionError::ImageDecode(format!(
            "image too small ({} bytes)",
            raw_bytes.len()
        )));
    }

    let decoded = image::load_from_memory(raw_bytes)
        .map_err(|e| RecognitionError::ImageDecode(e.to_string()))?;

    let orientation = read_exif_orientation(raw_bytes);
    let oriented = apply_orientation(decoded, orientation);
    let gray = to_grayscale(oriented);

    debug!(
        width = gray.width(),
        height = gray.height(),
        orientation,
        "Prepared image for OCR"
    );

    let mut cursor = Cursor::new(Vec::new());
    gray.write_to(&mut cursor, ImageOutputFormat::Png)
        .map_err(|e| RecognitionError::ImageDecode(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}

/// Single-channel images pass through untouched.
fn to_grayscale(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) => img,
        other => DynamicImage::ImageLuma8(other.to_luma8()),
    }
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn rgb_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 120, 240])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn color_image_becomes_grayscale_png() {
        let prepared = prepare_for_ocr(&rgb_png(40, 20)).unwrap();
        assert!(prepared.starts_with(&[0x89, 0x50, 0x4E, 0x47]));
        let decoded = image::load_from_memory(&prepared).unwrap();
        assert!(matches!(decoded, DynamicImage::ImageLuma8(_)));
        assert_eq!(decoded.dimensions(), (40, 20));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let garbage = vec![0x42u8; 256];
        assert!(matches!(
            prepare_for_ocr(&garbage),
            Err(RecognitionError::ImageDecode(_))
        ));
    }

    #[test]
    fn tiny_input_is_rejected() {
        assert!(matches!(
            prepare_for_ocr(b"GIF89a"),
            Err(RecognitionError::ImageDecode(_))
        ));
    }

    #[test]
    fn no_exif_means_upright() {
        assert_eq!(read_exif_orientation(&rgb_png(4, 4)), 1);
    }

    #[test]
    fn apply_orientation_rotate90() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([100, 100, 100])));
        let result = apply_orientation(img, 6);
        assert_eq!(result.width(), 20);
        assert_eq!(result.height(), 10);
    }

    #[test]
    fn apply_orientation_rotate180_keeps_size() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([100, 100, 100])));
        let result = apply_orientation(img, 3);
        assert_eq!(result.dimensions(), (10, 20));
    }

    #[test]
    fn apply_orientation_unknown_is_identity() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 20, Rgb([100, 100, 100])));
        let result = apply_orientation(img, 99);
        assert_eq!(result.dimensions(), (10, 20));
    }
}
