//! Raster encoding for crop results.
//!
//! This module provides:
//! - JPEG encoding with a 0.0-1.0 quality scale (the codec-facing scale)
//! - Lossless PNG encoding
//! - Base64 payload helpers and the payload size estimate

mod jpeg;
mod png;
mod size;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::DecodedImage;

pub use jpeg::{encode_jpeg, jpeg_quality};
pub use png::encode_png;
pub use size::{encode_base64, estimate_base64_bytes};

/// Errors that can occur while encoding a raster.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying encoder failed
    #[error("{format} encoding failed: {message}")]
    EncodingFailed {
        format: EncodeFormat,
        message: String,
    },
}

/// Output container for crop results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    #[default]
    Jpeg,
    /// Lossless; quality settings are ignored.
    Png,
}

impl EncodeFormat {
    pub fn extension(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "jpg",
            EncodeFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            EncodeFormat::Jpeg => "image/jpeg",
            EncodeFormat::Png => "image/png",
        }
    }
}

impl std::fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncodeFormat::Jpeg => f.write_str("JPEG"),
            EncodeFormat::Png => f.write_str("PNG"),
        }
    }
}

/// Encode a decoded raster in `format`. `quality` is in `(0, 1]`.
pub fn encode_image(
    image: &DecodedImage,
    format: EncodeFormat,
    quality: f32,
) -> Result<Vec<u8>, EncodeError> {
    match format {
        EncodeFormat::Jpeg => {
            encode_jpeg(&image.pixels, image.width, image.height, jpeg_quality(quality))
        }
        EncodeFormat::Png => encode_png(&image.pixels, image.width, image.height),
    }
}

pub(crate) fn validate_rgb(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_image_dispatches_by_format() {
        let img = DecodedImage::new(8, 8, vec![90u8; 8 * 8 * 3]);

        let jpeg = encode_image(&img, EncodeFormat::Jpeg, 0.7).unwrap();
        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);

        let png = encode_image(&img, EncodeFormat::Png, 0.7).unwrap();
        assert_eq!(&png[0..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_format_serde_names() {
        assert_eq!(EncodeFormat::Jpeg.extension(), "jpg");
        assert_eq!(EncodeFormat::Png.mime_type(), "image/png");
        assert_eq!(EncodeFormat::Jpeg.to_string(), "JPEG");
    }

    #[test]
    fn test_validate_rgb() {
        assert!(validate_rgb(&[0; 12], 2, 2).is_ok());
        assert!(matches!(
            validate_rgb(&[0; 11], 2, 2),
            Err(EncodeError::InvalidPixelData { expected: 12, actual: 11 })
        ));
        assert!(matches!(
            validate_rgb(&[], 0, 2),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }
}
