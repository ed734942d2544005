//! Pixel-region cropping.
//!
//! Regions are in source pixels, as produced by
//! [`map_to_source`](crate::mapping::map_to_source). Out-of-range regions are
//! clamped to the image instead of rejected, so the output is always a
//! non-empty sub-raster.

use crate::decode::DecodedImage;
use crate::mapping::SourceRegion;

/// Copy the pixels of `region` out of `image`.
///
/// # Behavior
///
/// - The region origin is clamped inside the image
/// - The region size is clamped so it ends at the image edge
/// - Minimum output dimension is 1x1 pixels
/// - A region covering the whole image returns the image unchanged
pub fn crop_region(image: DecodedImage, region: SourceRegion) -> DecodedImage {
    if image.is_empty() {
        return image;
    }

    let x = region.x.min(image.width - 1);
    let y = region.y.min(image.height - 1);
    let out_width = region.width.clamp(1, image.width - x);
    let out_height = region.height.clamp(1, image.height - y);

    if x == 0 && y == 0 && out_width == image.width && out_height == image.height {
        return image;
    }

    let src_stride = image.width as usize * 3;
    let row_len = out_width as usize * 3;
    let mut output = Vec::with_capacity(row_len * out_height as usize);

    for src_row in image
        .pixels
        .chunks_exact(src_stride)
        .skip(y as usize)
        .take(out_height as usize)
    {
        let start = x as usize * 3;
        output.extend_from_slice(&src_row[start..start + row_len]);
    }

    DecodedImage::new(out_width, out_height, output)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
