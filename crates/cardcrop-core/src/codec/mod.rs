//! Image codec collaborator.
//!
//! The encoder never touches pixels directly. It talks to an [`ImageCodec`]
//! through URIs: probe a source for its size, ask for a list of operations
//! plus an encode, and release intermediate outputs when done. Hosts with a
//! platform codec implement the trait themselves; this crate ships two
//! implementations built on the `image` crate:
//!
//! - [`MemoryCodec`] keeps sources and outputs in an in-process blob store
//!   (works on wasm32)
//! - `FileCodec` reads photos from disk and writes outputs into a temporary
//!   directory (requires the `native` feature)

#[cfg(feature = "native")]
mod file;
mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{self, DecodeError, DecodedImage, FilterType};
use crate::encode::{self, EncodeError, EncodeFormat};
use crate::mapping::{ImageSize, SourceRegion};
use crate::transform::{self, QuarterTurn};

#[cfg(feature = "native")]
pub use file::FileCodec;
pub use memory::MemoryCodec;

/// Errors reported by an image codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Nothing is stored under the URI.
    #[error("No image found at '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("I/O error: {0}")]
    Io(String),

    /// The codec call did not finish within the allowed time.
    #[error("Codec call timed out after {0} ms")]
    Timeout(u64),

    /// Any other codec failure.
    #[error("Codec failure: {0}")]
    Failed(String),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        CodecError::Io(err.to_string())
    }
}

/// One raster operation, applied in order before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodecOp {
    Crop(SourceRegion),
    Resize { width: u32, height: u32 },
    Rotate(QuarterTurn),
}

/// How the codec should encode its output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeOptions {
    pub format: EncodeFormat,
    /// Quality in `(0, 1]`; ignored for PNG.
    pub quality: f32,
    pub emit_base64: bool,
}

/// Result of one codec call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecOutput {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub base64: Option<String>,
    /// Authoritative encoded size, when the codec knows it.
    pub byte_len: Option<usize>,
}

impl CodecOutput {
    /// Encoded size in bytes: the codec's own count if reported, otherwise
    /// the estimate derived from the base64 payload length.
    pub fn size_bytes(&self) -> Option<usize> {
        self.byte_len
            .or_else(|| self.base64.as_deref().map(encode::estimate_base64_bytes))
    }
}

/// Black-box image codec addressed by URI.
pub trait ImageCodec {
    /// Oriented pixel size of the image at `uri`.
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError>;

    /// Apply `ops` to the image at `uri` and encode the result as a new URI.
    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError>;

    /// Drop a transient output produced by [`process`](Self::process).
    fn release(&self, _uri: &str) -> Result<(), CodecError> {
        Ok(())
    }
}

impl<C: ImageCodec + ?Sized> ImageCodec for &C {
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError> {
        (**self).probe(uri)
    }

    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError> {
        (**self).process(uri, ops, options)
    }

    fn release(&self, uri: &str) -> Result<(), CodecError> {
        (**self).release(uri)
    }
}

impl<C: ImageCodec + ?Sized> ImageCodec for Arc<C> {
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError> {
        (**self).probe(uri)
    }

    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError> {
        (**self).process(uri, ops, options)
    }

    fn release(&self, uri: &str) -> Result<(), CodecError> {
        (**self).release(uri)
    }
}

/// Encoded bytes plus the dimensions of the raster they hold.
pub(crate) struct Rendered {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Probe encoded source bytes for their oriented size.
pub(crate) fn probe_bytes(bytes: &[u8]) -> Result<ImageSize, CodecError> {
    Ok(decode::probe_image(bytes)?.oriented_size()?)
}

/// Decode, transform and re-encode source bytes.
pub(crate) fn render(
    bytes: &[u8],
    ops: &[CodecOp],
    options: &EncodeOptions,
) -> Result<Rendered, CodecError> {
    let mut image = decode::decode_image(bytes)?;
    for op in ops {
        image = apply_op(image, op)?;
    }

    let bytes = encode::encode_image(&image, options.format, options.quality)?;
    Ok(Rendered {
        bytes,
        width: image.width,
        height: image.height,
    })
}

fn apply_op(image: DecodedImage, op: &CodecOp) -> Result<DecodedImage, CodecError> {
    let image = match *op {
        CodecOp::Crop(region) => transform::crop_region(image, region),
        CodecOp::Resize { width, height } => {
            decode::resize(image, width, height, FilterType::Lanczos3)?
        }
        CodecOp::Rotate(turn) => transform::rotate_quarter(image, turn)?,
    };
    Ok(image)
}

/// Build the output record for rendered bytes stored under `uri`.
pub(crate) fn output_for(uri: String, rendered: &Rendered, options: &EncodeOptions) -> CodecOutput {
    CodecOutput {
        uri,
        width: rendered.width,
        height: rendered.height,
        base64: options
            .emit_base64
            .then(|| encode::encode_base64(&rendered.bytes)),
        byte_len: Some(rendered.bytes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_prefers_authoritative_length() {
        let output = CodecOutput {
            uri: "mem://a".to_string(),
            width: 1,
            height: 1,
            base64: Some("TWFu".to_string()),
            byte_len: Some(10),
        };
        assert_eq!(output.size_bytes(), Some(10));
    }

    #[test]
    fn test_size_falls_back_to_base64_estimate() {
        let output = CodecOutput {
            uri: "mem://a".to_string(),
            width: 1,
            height: 1,
            base64: Some("TWE=".to_string()),
            byte_len: None,
        };
        assert_eq!(output.size_bytes(), Some(2));
    }

    #[test]
    fn test_size_unknown() {
        let output = CodecOutput {
            uri: "mem://a".to_string(),
            width: 1,
            height: 1,
            base64: None,
            byte_len: None,
        };
        assert_eq!(output.size_bytes(), None);
    }

    #[test]
    fn test_render_applies_ops_in_order() {
        let source = encode::encode_png(&vec![50u8; 40 * 20 * 3], 40, 20).unwrap();
        let ops = [
            CodecOp::Crop(SourceRegion::new(10, 0, 20, 20)),
            CodecOp::Rotate(QuarterTurn::Cw90),
            CodecOp::Resize { width: 10, height: 5 },
        ];
        let options = EncodeOptions {
            format: EncodeFormat::Png,
            quality: 1.0,
            emit_base64: false,
        };

        let rendered = render(&source, &ops, &options).unwrap();
        assert_eq!((rendered.width, rendered.height), (10, 5));
    }

    #[test]
    fn test_probe_bytes_rejects_garbage() {
        assert!(matches!(
            probe_bytes(b"not an image"),
            Err(CodecError::Decode(DecodeError::InvalidFormat))
        ));
    }
}
