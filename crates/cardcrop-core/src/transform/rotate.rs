//! Quarter-turn rotation of decoded rasters.

use serde::{Deserialize, Serialize};

use crate::decode::{DecodeError, DecodedImage};

/// Clockwise rotation in multiples of 90 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuarterTurn {
    Cw90,
    Cw180,
    Cw270,
}

impl QuarterTurn {
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, QuarterTurn::Cw90 | QuarterTurn::Cw270)
    }
}

/// Rotate `image` clockwise by a quarter turn.
pub fn rotate_quarter(image: DecodedImage, turn: QuarterTurn) -> Result<DecodedImage, DecodeError> {
    let rgb = image
        .into_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("pixel buffer size mismatch".to_string()))?;

    let rotated = match turn {
        QuarterTurn::Cw90 => image::imageops::rotate90(&rgb),
        QuarterTurn::Cw180 => image::imageops::rotate180(&rgb),
        QuarterTurn::Cw270 => image::imageops::rotate270(&rgb),
    };
    Ok(DecodedImage::from_rgb_image(rotated))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip() -> DecodedImage {
        // red, green, blue left to right
        DecodedImage::new(3, 1, vec![255, 0, 0, 0, 255, 0, 0, 0, 255])
    }

    #[test]
    fn test_rotate_90_swaps_dimensions() {
        let result = rotate_quarter(strip(), QuarterTurn::Cw90).unwrap();
        assert_eq!((result.width, result.height), (1, 3));
        // leftmost pixel ends up on top
        assert_eq!(&result.pixels[0..3], &[255, 0, 0]);
    }

    #[test]
    fn test_rotate_180_reverses() {
        let result = rotate_quarter(strip(), QuarterTurn::Cw180).unwrap();
        assert_eq!((result.width, result.height), (3, 1));
        assert_eq!(&result.pixels[0..3], &[0, 0, 255]);
    }

    #[test]
    fn test_rotate_270_puts_rightmost_on_top() {
        let result = rotate_quarter(strip(), QuarterTurn::Cw270).unwrap();
        assert_eq!((result.width, result.height), (1, 3));
        assert_eq!(&result.pixels[0..3], &[0, 0, 255]);
    }
}
