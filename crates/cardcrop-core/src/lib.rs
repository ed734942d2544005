//! Cardcrop Core - document card cropping library
//!
//! This crate provides the core of the card crop tool: the interactive
//! crop-rectangle engine, display-to-source coordinate mapping, and the
//! pipeline that re-encodes a cropped photo until it fits a byte budget.

pub mod codec;
pub mod decode;
pub mod detect;
pub mod encode;
pub mod encoder;
pub mod geometry;
pub mod mapping;
pub mod pipeline;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "native")]
pub use codec::FileCodec;
pub use codec::{CodecError, CodecOp, CodecOutput, EncodeOptions, ImageCodec, MemoryCodec};
pub use detect::{DocumentDetector, ManualOnly};
pub use encode::EncodeFormat;
pub use encoder::{
    CompressionAttempt, CompressionPolicy, EncodeBudget, OversizedError, ReencodeSource,
    SizeBoundedEncoder,
};
pub use geometry::{CropConfig, CropEngine, CropRect, DisplaySize, DragDelta, Handle};
pub use mapping::{map_to_display, map_to_source, ImageSize, SourceRegion};
#[cfg(feature = "native")]
pub use pipeline::run_async;
pub use pipeline::{
    run, CancelFlag, CropPipeline, CropRequest, CropResult, PipelineError, PipelineState,
};
