//! Display-space value types: rendered area, crop rectangle, crop config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mapping::ImageSize;

/// Default minimum crop edge length in display pixels.
pub const DEFAULT_MIN_SIZE: f64 = 80.0;

/// Default inset of the initial rectangle, as a fraction of each dimension.
pub const DEFAULT_INSET_RATIO: f64 = 0.08;

/// Tolerance used when checking invariants on float coordinates.
pub const GEOMETRY_EPSILON: f64 = 1e-9;

/// Errors raised when building geometry from untrusted dimensions.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    /// Display dimensions are zero, negative, or not finite.
    #[error("Invalid display size: {width}x{height} (both dimensions must be positive)")]
    InvalidDisplaySize { width: f64, height: f64 },

    /// Source image dimensions are zero.
    #[error("Invalid image size: {width}x{height} (both dimensions must be non-zero)")]
    InvalidImageSize { width: u32, height: u32 },

    /// Crop configuration values are out of range.
    #[error("Invalid crop config: {0}")]
    InvalidConfig(String),
}

/// Size of the rendered image area in display pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: f64,
    pub height: f64,
}

impl DisplaySize {
    /// Create a display size, rejecting non-positive or non-finite values.
    pub fn new(width: f64, height: f64) -> Result<Self, GeometryError> {
        Self { width, height }.validated()
    }

    /// Size of an image rendered "contain"-fitted inside a container.
    ///
    /// The image is scaled uniformly so that it touches the container on
    /// at least one axis and overflows on neither.
    ///
    /// # Errors
    ///
    /// Returns `GeometryError::InvalidDisplaySize` if the container is not a
    /// valid display size.
    pub fn fit_within(image: ImageSize, container: DisplaySize) -> Result<Self, GeometryError> {
        let container = container.validated()?;
        let img_w = image.width as f64;
        let img_h = image.height as f64;

        // cross-multiplied aspect comparison keeps exact sizes exact
        let fitted = if img_w * container.height > container.width * img_h {
            Self {
                width: container.width,
                height: container.width * img_h / img_w,
            }
        } else {
            Self {
                width: container.height * img_w / img_h,
                height: container.height,
            }
        };
        fitted.validated()
    }

    /// Return `self` if both dimensions are positive and finite.
    pub fn validated(self) -> Result<Self, GeometryError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.width) && ok(self.height) {
            Ok(self)
        } else {
            Err(GeometryError::InvalidDisplaySize {
                width: self.width,
                height: self.height,
            })
        }
    }
}

/// Crop rectangle in display space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CropRect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// The whole display area.
    pub fn full(display: DisplaySize) -> Self {
        Self::new(0.0, 0.0, display.width, display.height)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Rectangle centered in `display` with `inset_ratio` margins on every
    /// side, widened to the minimum size when the margins would make it
    /// too small.
    pub(crate) fn centered(display: DisplaySize, inset_ratio: f64, min_w: f64, min_h: f64) -> Self {
        let (left, right) = centered_span(display.width, inset_ratio, min_w);
        let (top, bottom) = centered_span(display.height, inset_ratio, min_h);
        Self::new(left, top, right, bottom)
    }

    /// Check all display-space invariants against the given minimum size.
    pub fn is_valid_in(&self, display: DisplaySize, min_w: f64, min_h: f64) -> bool {
        let eps = GEOMETRY_EPSILON;
        let finite = [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite());

        finite
            && self.left >= 0.0
            && self.top >= 0.0
            && self.left < self.right
            && self.top < self.bottom
            && self.right <= display.width + eps
            && self.bottom <= display.height + eps
            && self.width() >= min_w - eps
            && self.height() >= min_h - eps
    }

    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.right.is_finite()
            && self.bottom.is_finite()
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
    }
}

fn centered_span(extent: f64, inset_ratio: f64, min: f64) -> (f64, f64) {
    let inset = extent * inset_ratio;
    if extent - 2.0 * inset >= min {
        (inset, extent - inset)
    } else {
        let lo = (extent - min) / 2.0;
        (lo, lo + min)
    }
}

/// Tunables for the crop overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropConfig {
    /// Minimum crop edge length in display pixels.
    pub min_size: f64,
    /// Initial inset on each side as a fraction of the display dimension.
    pub inset_ratio: f64,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            inset_ratio: DEFAULT_INSET_RATIO,
        }
    }
}

impl CropConfig {
    pub fn validated(self) -> Result<Self, GeometryError> {
        if !(self.min_size.is_finite() && self.min_size > 0.0) {
            return Err(GeometryError::InvalidConfig(format!(
                "min_size must be positive, got {}",
                self.min_size
            )));
        }
        if !(0.0..0.5).contains(&self.inset_ratio) {
            return Err(GeometryError::InvalidConfig(format!(
                "inset_ratio must be in [0, 0.5), got {}",
                self.inset_ratio
            )));
        }
        Ok(self)
    }
}
