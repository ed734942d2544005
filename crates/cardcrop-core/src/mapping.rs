//! Display-space to source-space coordinate mapping.
//!
//! The crop overlay works on the rendered (usually scaled-down) photo, while
//! the codec crops the full-resolution original. These functions convert
//! between the two using the display/source size ratio on each axis.
//!
//! # Guarantees
//!
//! - The mapped region is always at least 1x1 and fully inside the image
//!   (an image with a zero dimension maps to an empty region)
//! - Rounding moves each edge by at most one source pixel and never pushes
//!   the region out of bounds

use serde::{Deserialize, Serialize};

use crate::geometry::{CropRect, DisplaySize, GeometryError};

/// Pixel dimensions of the original photo (after EXIF orientation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    /// Create an image size, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, GeometryError> {
        if width == 0 || height == 0 {
            return Err(GeometryError::InvalidImageSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn longest_edge(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Integer crop region in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SourceRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole image.
    pub fn full(image: ImageSize) -> Self {
        Self::new(0, 0, image.width, image.height)
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn is_within(&self, image: ImageSize) -> bool {
        self.width > 0
            && self.height > 0
            && self.right() <= image.width
            && self.bottom() <= image.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Map a display-space crop rectangle to a source-space pixel region.
///
/// Origins are rounded and clamped to the image; sizes are rounded, then
/// clamped so the region ends inside the image.
pub fn map_to_source(rect: CropRect, display: DisplaySize, image: ImageSize) -> SourceRegion {
    let (x, width) = map_span(rect.left, rect.width(), display.width, image.width);
    let (y, height) = map_span(rect.top, rect.height(), display.height, image.height);
    SourceRegion::new(x, y, width, height)
}

/// Map a source-space region back into display space.
pub fn map_to_display(region: SourceRegion, display: DisplaySize, image: ImageSize) -> CropRect {
    let sx = display.width / image.width as f64;
    let sy = display.height / image.height as f64;

    CropRect::new(
        region.x as f64 * sx,
        region.y as f64 * sy,
        region.right() as f64 * sx,
        region.bottom() as f64 * sy,
    )
}

fn map_span(start: f64, length: f64, display_extent: f64, image_extent: u32) -> (u32, u32) {
    let scale = image_extent as f64 / display_extent;

    // `as u32` saturates: negatives and NaN become 0
    let origin = ((start * scale).round().max(0.0) as u32).min(image_extent.saturating_sub(1));
    let size = ((length * scale).round() as u32)
        .max(1)
        .min(image_extent.saturating_sub(origin));

    (origin, size)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
