//! JPEG encoding for crop results.
//!
//! The compression loop works on a 0.0-1.0 quality scale; [`jpeg_quality`]
//! maps it onto the encoder's 1-100 scale.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::{validate_rgb, EncodeError, EncodeFormat};

/// Map a `(0, 1]` quality onto the JPEG encoder's `1..=100` scale.
///
/// Out-of-range and NaN values are clamped to the nearest valid quality.
pub fn jpeg_quality(quality: f32) -> u8 {
    let scaled = (quality * 100.0).round();
    if scaled.is_nan() {
        return 1;
    }
    scaled.clamp(1.0, 100.0) as u8
}

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100; values outside are clamped)
///
/// # Example
///
/// ```
/// use cardcrop_core::encode::encode_jpeg;
///
/// let pixels = vec![128u8; 100 * 100 * 3];
/// let jpeg = encode_jpeg(&pixels, 100, 100, 70).unwrap();
/// assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
/// ```
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate_rgb(pixels, width, height)?;

    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: EncodeFormat::Jpeg,
            message: e.to_string(),
        })?;

    Ok(buffer)
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any valid input encodes to a well-formed JPEG.
        #[test]
        fn prop_valid_input_produces_valid_jpeg(
            (width, height) in (1u32..=40, 1u32..=40),
            quality in 0u8..=255,
        ) {
            let pixels = vec![128u8; (width * height * 3) as usize];
            let jpeg = encode_jpeg(&pixels, width, height, quality).unwrap();

            prop_assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
            prop_assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
        }

        /// Property: encoding is deterministic.
        #[test]
        fn prop_deterministic_output(
            (width, height) in (1u32..=20, 1u32..=20),
            quality in 1u8..=100,
        ) {
            let pixels = vec![100u8; (width * height * 3) as usize];
            prop_assert_eq!(
                encode_jpeg(&pixels, width, height, quality).unwrap(),
                encode_jpeg(&pixels, width, height, quality).unwrap()
            );
        }

        /// Property: the 0-1 quality scale always maps into 1..=100.
        #[test]
        fn prop_quality_mapping_in_range(quality in -5.0f32..5.0) {
            let q = jpeg_quality(quality);
            prop_assert!((1..=100).contains(&q));
        }
    }
}
