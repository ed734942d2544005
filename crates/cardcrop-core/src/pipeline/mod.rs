//! Crop pipeline orchestration.
//!
//! A confirm runs mapping, then the first encode, then zero or more
//! re-encodes, and either returns a within-budget [`CropResult`] or a
//! [`PipelineError`]. No partial result is ever returned.
//!
//! ```text
//! Idle -> Cropping -> Mapping -> Encoding -> Compressing(k) -> Done
//!            ^                                              \-> Failed
//!            '-- drag sessions repeat freely before confirm
//! ```
//!
//! [`run`] is the blocking entry point. With the `native` feature,
//! `run_async` drives the same loop on the tokio blocking pool and bounds
//! every codec call with the policy's timeout. [`CropPipeline`] wraps the
//! whole flow behind the modal contract used by host applications.

#[cfg(feature = "native")]
mod async_run;
mod cancel;
mod controller;
mod error;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::{CodecOutput, ImageCodec};
use crate::encoder::{CompressionAttempt, CompressionPolicy, EncodedCrop, SizeBoundedEncoder};
use crate::geometry::{CropRect, DisplaySize};
use crate::mapping::{map_to_source, ImageSize, SourceRegion};

#[cfg(feature = "native")]
pub use async_run::run_async;
pub use cancel::CancelFlag;
pub use controller::CropPipeline;
pub use error::PipelineError;

/// Orchestrator state, observable by the host for progress UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum PipelineState {
    Idle,
    /// A session is open; drags may come and go.
    Cropping,
    Mapping,
    /// First encode of the mapped region.
    Encoding,
    /// Re-encode number `attempt` (1-based).
    Compressing { attempt: u32 },
    Done,
    Failed,
}

/// Everything a run needs besides the codec and the policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropRequest {
    pub source_uri: String,
    pub rect: CropRect,
    pub display: DisplaySize,
    pub image: ImageSize,
}

impl CropRequest {
    /// Source-pixel region for the request's rectangle.
    pub fn region(&self) -> SourceRegion {
        map_to_source(self.rect, self.display, self.image)
    }
}

/// Final artifact of a confirmed crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResult {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub base64: Option<String>,
    pub size_bytes: usize,
    pub attempts: Vec<CompressionAttempt>,
}

impl From<EncodedCrop> for CropResult {
    fn from(crop: EncodedCrop) -> Self {
        let CodecOutput {
            uri,
            width,
            height,
            base64,
            ..
        } = crop.output;
        Self {
            uri,
            width,
            height,
            base64,
            size_bytes: crop.size_bytes,
            attempts: crop.attempts,
        }
    }
}

/// Map, encode and compress one crop. Blocks for the whole run.
pub fn run<C: ImageCodec>(
    codec: &C,
    request: &CropRequest,
    policy: &CompressionPolicy,
    cancel: &CancelFlag,
) -> Result<CropResult, PipelineError> {
    run_with_progress(codec, request, policy, cancel, |_| {})
}

/// [`run`], reporting each state transition to `on_state`.
pub fn run_with_progress<C: ImageCodec>(
    codec: &C,
    request: &CropRequest,
    policy: &CompressionPolicy,
    cancel: &CancelFlag,
    mut on_state: impl FnMut(PipelineState),
) -> Result<CropResult, PipelineError> {
    let result = (|| {
        let encoder = SizeBoundedEncoder::new(codec, *policy)?;
        let region = map_region(request, cancel)?;
        on_state(PipelineState::Mapping);

        let crop = encoder.encode_with_progress(&request.source_uri, region, cancel, |attempt| {
            on_state(state_for_attempt(attempt))
        })?;
        finish(codec, crop, cancel)
    })();

    on_state(match &result {
        Ok(_) => PipelineState::Done,
        Err(_) => PipelineState::Failed,
    });
    log_outcome(&result);
    result
}

pub(crate) fn map_region(
    request: &CropRequest,
    cancel: &CancelFlag,
) -> Result<SourceRegion, PipelineError> {
    cancel.check()?;
    request.display.validated()?;
    ImageSize::new(request.image.width, request.image.height)
        .map_err(|e| PipelineError::InvalidSource(e.to_string()))?;

    let region = request.region();
    debug!(
        source = %request.source_uri,
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        "mapped crop to source region"
    );
    Ok(region)
}

pub(crate) fn state_for_attempt(attempt: u32) -> PipelineState {
    match attempt {
        0 | 1 => PipelineState::Encoding,
        n => PipelineState::Compressing { attempt: n - 1 },
    }
}

/// A run torn down during the last encode drops its result.
pub(crate) fn finish<C: ImageCodec + ?Sized>(
    codec: &C,
    crop: EncodedCrop,
    cancel: &CancelFlag,
) -> Result<CropResult, PipelineError> {
    if cancel.is_cancelled() {
        if let Err(e) = codec.release(&crop.output.uri) {
            warn!(uri = %crop.output.uri, error = %e, "failed to release cancelled result");
        }
        return Err(PipelineError::Cancelled);
    }
    Ok(crop.into())
}

pub(crate) fn log_outcome(result: &Result<CropResult, PipelineError>) {
    match result {
        Ok(crop) => info!(
            uri = %crop.uri,
            width = crop.width,
            height = crop.height,
            size_bytes = crop.size_bytes,
            attempts = crop.attempts.len(),
            "crop encoded within budget"
        ),
        Err(PipelineError::Oversized(err)) => warn!(
            final_size = err.final_size(),
            max_bytes = err.budget.max_bytes,
            attempts = err.attempts.len(),
            "crop stayed over budget"
        ),
        Err(PipelineError::Cancelled) => warn!("crop run cancelled"),
        Err(e) => warn!(error = %e, "crop run failed"),
    }
}
