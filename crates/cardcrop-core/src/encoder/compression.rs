//! The compress-to-budget loop.

use tracing::{debug, warn};

use super::{CompressionAttempt, CompressionPolicy, OversizedError, ReencodeSource};
use crate::codec::{CodecError, CodecOp, CodecOutput, EncodeOptions, ImageCodec};
use crate::decode::fit_to_edge;
use crate::mapping::SourceRegion;
use crate::pipeline::{CancelFlag, PipelineError};

/// One codec call the loop wants made.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    pub source_uri: String,
    pub ops: Vec<CodecOp>,
    pub options: EncodeOptions,
    /// 1-based encode number within the run.
    pub attempt: u32,
}

/// A within-budget (or tolerated) encode and the attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCrop {
    pub output: CodecOutput,
    pub size_bytes: usize,
    pub attempts: Vec<CompressionAttempt>,
}

/// What the loop wants after observing an output.
#[derive(Debug)]
pub enum Step {
    Encode(EncodeRequest),
    Done(EncodedCrop),
    Oversized(OversizedError),
}

/// Step machine for one compress-to-budget run.
///
/// Call [`start`](Self::start) once, hand each codec output to
/// [`observe`](Self::observe), and keep going while it asks for another
/// encode. Outputs that stop being useful are queued for release; collect
/// them with [`take_releasable`](Self::take_releasable) and, when the run
/// ends for any reason, [`abandon`](Self::abandon).
#[derive(Debug)]
pub struct CompressionLoop {
    policy: CompressionPolicy,
    source_uri: String,
    base_ops: Vec<CodecOp>,
    attempts: Vec<CompressionAttempt>,
    /// Previous output still needed as the source of the pending encode.
    held: Option<String>,
    releasable: Vec<String>,
}

impl CompressionLoop {
    pub fn new(
        policy: CompressionPolicy,
        source_uri: impl Into<String>,
        region: SourceRegion,
    ) -> Self {
        Self {
            policy,
            source_uri: source_uri.into(),
            base_ops: crop_ops(region, policy.budget.max_edge_pixels),
            attempts: Vec::new(),
            held: None,
            releasable: Vec::new(),
        }
    }

    /// The first encode: crop, downscale if needed, initial quality.
    pub fn start(&self) -> EncodeRequest {
        self.request(self.source_uri.clone(), self.base_ops.clone())
    }

    /// Measure `output` and decide the next step.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Failed` if the output carries neither a byte
    /// length nor a base64 payload to measure.
    pub fn observe(&mut self, output: CodecOutput) -> Result<Step, CodecError> {
        if let Some(prev) = self.held.take() {
            self.releasable.push(prev);
        }

        let Some(size_bytes) = output.size_bytes() else {
            self.releasable.push(output.uri);
            return Err(CodecError::Failed(
                "codec output has no measurable size".to_string(),
            ));
        };

        let quality = self.policy.quality_for(self.attempts.len() as u32);
        self.attempts.push(CompressionAttempt {
            quality,
            format: self.policy.format,
            size_bytes,
        });
        let attempt = self.attempts.len();
        let max_bytes = self.policy.budget.max_bytes;
        debug!(attempt, quality, size_bytes, max_bytes, "compression attempt");

        if size_bytes <= max_bytes {
            return Ok(Step::Done(self.finish(output, size_bytes)));
        }

        if self.is_exhausted() {
            if size_bytes <= self.policy.hard_ceiling_bytes {
                warn!(
                    size_bytes,
                    max_bytes,
                    hard_ceiling = self.policy.hard_ceiling_bytes,
                    "accepting output above budget but within hard ceiling"
                );
                return Ok(Step::Done(self.finish(output, size_bytes)));
            }

            self.releasable.push(output.uri);
            return Ok(Step::Oversized(OversizedError {
                attempts: self.attempts.clone(),
                budget: self.policy.budget,
                hard_ceiling_bytes: self.policy.hard_ceiling_bytes,
            }));
        }

        let next = match self.policy.reencode_source {
            ReencodeSource::PreviousOutput => {
                self.held = Some(output.uri.clone());
                self.request(output.uri, Vec::new())
            }
            ReencodeSource::OriginalCrop => {
                self.releasable.push(output.uri);
                self.request(self.source_uri.clone(), self.base_ops.clone())
            }
        };
        Ok(Step::Encode(next))
    }

    pub fn attempts(&self) -> &[CompressionAttempt] {
        &self.attempts
    }

    /// True once every allowed re-encode has been measured.
    pub fn is_exhausted(&self) -> bool {
        self.attempts.len() as u32 >= self.policy.max_encode_calls()
    }

    /// Outputs that can be released now.
    pub fn take_releasable(&mut self) -> Vec<String> {
        std::mem::take(&mut self.releasable)
    }

    /// End the run and hand back every intermediate output still held.
    pub fn abandon(&mut self) -> Vec<String> {
        let mut uris = self.take_releasable();
        uris.extend(self.held.take());
        uris
    }

    fn request(&self, source_uri: String, ops: Vec<CodecOp>) -> EncodeRequest {
        let index = self.attempts.len() as u32;
        EncodeRequest {
            source_uri,
            ops,
            options: EncodeOptions {
                format: self.policy.format,
                quality: self.policy.quality_for(index),
                emit_base64: true,
            },
            attempt: index + 1,
        }
    }

    fn finish(&self, output: CodecOutput, size_bytes: usize) -> EncodedCrop {
        EncodedCrop {
            output,
            size_bytes,
            attempts: self.attempts.clone(),
        }
    }
}

/// Crop to the region, then downscale when its longest edge exceeds `max_edge`.
fn crop_ops(region: SourceRegion, max_edge: u32) -> Vec<CodecOp> {
    let mut ops = vec![CodecOp::Crop(region)];
    let (width, height) = fit_to_edge(region.width, region.height, max_edge);
    if (width, height) != (region.width, region.height) {
        ops.push(CodecOp::Resize { width, height });
    }
    ops
}

/// Release transient outputs, logging failures instead of failing the run.
pub(crate) fn release_all<C: ImageCodec + ?Sized>(codec: &C, uris: Vec<String>) {
    for uri in uris {
        if let Err(e) = codec.release(&uri) {
            warn!(uri, error = %e, "failed to release intermediate output");
        }
    }
}

/// Blocking driver for [`CompressionLoop`].
#[derive(Debug)]
pub struct SizeBoundedEncoder<C> {
    codec: C,
    policy: CompressionPolicy,
}

impl<C: ImageCodec> SizeBoundedEncoder<C> {
    pub fn new(codec: C, policy: CompressionPolicy) -> Result<Self, PipelineError> {
        Ok(Self {
            codec,
            policy: policy.validated()?,
        })
    }

    pub fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Encode `region` of `source_uri` within the policy's hard ceiling.
    pub fn encode(
        &self,
        source_uri: &str,
        region: SourceRegion,
        cancel: &CancelFlag,
    ) -> Result<EncodedCrop, PipelineError> {
        self.encode_with_progress(source_uri, region, cancel, |_| {})
    }

    /// Like [`encode`](Self::encode), reporting each encode number before
    /// the codec is called.
    pub fn encode_with_progress(
        &self,
        source_uri: &str,
        region: SourceRegion,
        cancel: &CancelFlag,
        mut on_attempt: impl FnMut(u32),
    ) -> Result<EncodedCrop, PipelineError> {
        let mut compression = CompressionLoop::new(self.policy, source_uri, region);
        let mut request = compression.start();

        let result = loop {
            if cancel.is_cancelled() {
                break Err(PipelineError::Cancelled);
            }
            on_attempt(request.attempt);

            let output = match self
                .codec
                .process(&request.source_uri, &request.ops, &request.options)
            {
                Ok(output) => output,
                Err(e) => break Err(e.into()),
            };

            match compression.observe(output) {
                Ok(Step::Encode(next)) => request = next,
                Ok(Step::Done(crop)) => break Ok(crop),
                Ok(Step::Oversized(err)) => break Err(err.into()),
                Err(e) => break Err(e.into()),
            }
            release_all(&self.codec, compression.take_releasable());
        };

        release_all(&self.codec, compression.abandon());
        result
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
