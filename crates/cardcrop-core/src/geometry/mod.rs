//! Crop geometry in display space.
//!
//! This module owns the crop rectangle shown over the rendered photo and the
//! constraint engine that mutates it during drag sessions.
//!
//! # Coordinate System
//!
//! - Coordinates are floating-point display pixels of the rendered image area
//! - Origin is the top-left corner of the rendered image (not the container)
//! - `right`/`bottom` are exclusive edges, so `width = right - left`
//!
//! # Invariants
//!
//! After every engine call the rectangle satisfies:
//! - `0 <= left < right <= display.width`
//! - `0 <= top < bottom <= display.height`
//! - `right - left >= min_width` and `bottom - top >= min_height`

mod engine;
mod rect;

pub use engine::{CropEngine, DragDelta, Handle, SessionError};
pub use rect::{
    CropConfig, CropRect, DisplaySize, GeometryError, DEFAULT_INSET_RATIO, DEFAULT_MIN_SIZE,
    GEOMETRY_EPSILON,
};
