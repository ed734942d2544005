//! Downscaling of cropped rasters to a maximum edge length.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Errors
///
/// Returns `DecodeError::EmptyImage` if a target dimension is zero and
/// `DecodeError::CorruptedFile` if the pixel buffer does not match the
/// image dimensions.
pub fn resize(
    image: DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::EmptyImage);
    }
    if image.width == width && image.height == height {
        return Ok(image);
    }

    let rgb_image = image
        .into_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("pixel buffer size mismatch".to_string()))?;
    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Dimensions after a uniform downscale by `max_edge / max(width, height)`.
///
/// Both dimensions are rounded and kept at least 1. Sizes already within
/// `max_edge` are returned unchanged.
pub fn fit_to_edge(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_edge || width == 0 || height == 0 {
        return (width, height);
    }

    let scale = max_edge as f64 / longest as f64;
    let scaled = |v: u32| ((v as f64 * scale).round() as u32).clamp(1, max_edge);
    (scaled(width), scaled(height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_image(width: u32, height: u32) -> DecodedImage {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8);
                pixels.push(((y * 255) / height.max(1)) as u8);
                pixels.push(128);
            }
        }
        DecodedImage::new(width, height, pixels)
    }

    #[test]
    fn test_resize_basic() {
        let resized = resize(create_test_image(100, 50), 50, 25, FilterType::Bilinear).unwrap();

        assert_eq!((resized.width, resized.height), (50, 25));
        assert_eq!(resized.pixels.len(), 50 * 25 * 3);
    }

    #[test]
    fn test_resize_zero_dimensions_error() {
        assert!(resize(create_test_image(10, 5), 0, 5, FilterType::Bilinear).is_err());
        assert!(resize(create_test_image(10, 5), 5, 0, FilterType::Bilinear).is_err());
    }

    #[test]
    fn test_fit_to_edge_card_photo() {
        // scale = 1400 / 4000 = 0.35
        assert_eq!(fit_to_edge(4000, 3000, 1400), (1400, 1050));
    }

    #[test]
    fn test_fit_to_edge_portrait() {
        assert_eq!(fit_to_edge(3024, 4032, 1600), (1200, 1600));
    }

    #[test]
    fn test_fit_to_edge_extreme_strip() {
        // A 1px-high strip must not round to zero
        assert_eq!(fit_to_edge(10_000, 1, 100), (100, 1));
    }

    #[test]
    fn test_fit_to_edge_within_limit() {
        assert_eq!(fit_to_edge(800, 600, 1400), (800, 600));
        assert_eq!(fit_to_edge(1400, 1400, 1400), (1400, 1400));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: fitted dimensions never exceed the edge limit and stay non-zero.
        #[test]
        fn prop_fit_respects_edge(
            width in 1u32..=20_000,
            height in 1u32..=20_000,
            max_edge in 1u32..=4000,
        ) {
            let (w, h) = fit_to_edge(width, height, max_edge);
            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w.max(h) <= max_edge);
            prop_assert!(w <= width && h <= height);
        }
    }
}
