//! Source photo decoding with EXIF orientation handling.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};

use super::{DecodeError, DecodedImage, ImageMetadata, Orientation};

/// Decode a JPEG or PNG photo from bytes, applying EXIF orientation.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes cannot be decoded and
/// `DecodeError::EmptyImage` if the decoded raster has no pixels.
pub fn decode_image(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let orientation = extract_orientation(bytes);

    let img = reader_for(bytes)?
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    let decoded = DecodedImage::from_rgb_image(apply_orientation(img, orientation).into_rgb8());
    if decoded.is_empty() {
        return Err(DecodeError::EmptyImage);
    }
    Ok(decoded)
}

/// Read dimensions and orientation from the header without decoding pixels.
pub fn probe_image(bytes: &[u8]) -> Result<ImageMetadata, DecodeError> {
    let (width, height) = reader_for(bytes)?
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(ImageMetadata {
        width,
        height,
        orientation: extract_orientation(bytes),
    })
}

fn reader_for(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    Ok(reader)
}

/// Returns `Orientation::Normal` when there is no readable EXIF block.
fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);

    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{encode_jpeg, encode_png};

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push(((x * 255) / width.max(1)) as u8);
                pixels.push(((y * 255) / height.max(1)) as u8);
                pixels.push(128);
            }
        }
        pixels
    }

    #[test]
    fn test_decode_jpeg() {
        let jpeg = encode_jpeg(&gradient(40, 30), 40, 30, 90).unwrap();
        let img = decode_image(&jpeg).unwrap();

        assert_eq!((img.width, img.height), (40, 30));
        assert_eq!(img.pixels.len(), 40 * 30 * 3);
    }

    #[test]
    fn test_decode_png_is_lossless() {
        let pixels = gradient(12, 9);
        let png = encode_png(&pixels, 12, 9).unwrap();
        let img = decode_image(&png).unwrap();

        assert_eq!(img.pixels, pixels);
    }

    #[test]
    fn test_probe_reads_header() {
        let jpeg = encode_jpeg(&gradient(64, 48), 64, 48, 80).unwrap();
        let meta = probe_image(&jpeg).unwrap();

        assert_eq!((meta.width, meta.height), (64, 48));
        assert_eq!(meta.orientation, Orientation::Normal);
    }

    #[test]
    fn test_decode_garbage() {
        let result = decode_image(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(DecodeError::InvalidFormat)));
    }

    #[test]
    fn test_probe_empty_bytes() {
        assert!(probe_image(&[]).is_err());
    }

    #[test]
    fn test_decode_truncated_jpeg() {
        let jpeg = encode_jpeg(&gradient(40, 30), 40, 30, 90).unwrap();
        assert!(decode_image(&jpeg[..20]).is_err());
    }

    #[test]
    fn test_orientation_without_exif() {
        let png = encode_png(&gradient(2, 2), 2, 2).unwrap();
        assert_eq!(extract_orientation(&png), Orientation::Normal);
        assert_eq!(extract_orientation(&[0x00, 0x01]), Orientation::Normal);
    }

    #[test]
    fn test_apply_orientation_rotate90() {
        let rgb = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result = apply_orientation(DynamicImage::ImageRgb8(rgb), Orientation::Rotate90CW);

        assert_eq!(result.into_rgb8().dimensions(), (1, 2));
    }

    #[test]
    fn test_apply_orientation_rotate180() {
        let rgb = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result =
            apply_orientation(DynamicImage::ImageRgb8(rgb), Orientation::Rotate180).into_rgb8();

        assert_eq!(result.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(result.get_pixel(1, 0).0, [255, 0, 0]);
    }
}
