//! Source photo decoding.
//!
//! This module provides functionality for:
//! - Probing a photo's oriented dimensions without decoding pixels
//! - Decoding JPEG/PNG photos to RGB with EXIF orientation applied
//! - Resizing decoded rasters to fit a maximum edge length
//!
//! Phone cameras usually store pixels sideways and record the rotation in
//! EXIF. Every size reported here is the *oriented* size, which is what the
//! crop overlay displays and what the mapper scales against.

mod resize;
mod source;
mod types;

pub use resize::{fit_to_edge, resize};
pub use source::{decode_image, probe_image};
pub use types::{DecodeError, DecodedImage, FilterType, ImageMetadata, Orientation};
