//! Scripted codec for exercising the encoder and pipeline without pixels.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::codec::{CodecError, CodecOp, CodecOutput, EncodeOptions, ImageCodec};
use crate::mapping::ImageSize;
use crate::pipeline::CancelFlag;

/// A recorded `process` call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub source_uri: String,
    pub ops: Vec<CodecOp>,
    pub quality: f32,
}

/// Codec that reports a scripted sequence of output sizes.
///
/// The last size repeats once the script runs out. Output dimensions follow
/// the requested crop/resize ops so pipeline results look realistic.
#[derive(Debug)]
pub(crate) struct ScriptedCodec {
    sizes: Vec<usize>,
    image: Option<ImageSize>,
    base64_only: bool,
    fail_on: Option<usize>,
    cancel_after: Option<(usize, CancelFlag)>,
    delay: Option<Duration>,
    counter: AtomicUsize,
    calls: Mutex<Vec<Call>>,
    released: Mutex<Vec<String>>,
}

impl ScriptedCodec {
    pub fn new(sizes: Vec<usize>) -> Self {
        Self {
            sizes,
            image: ImageSize::new(4000, 3000).ok(),
            base64_only: false,
            fail_on: None,
            cancel_after: None,
            delay: None,
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
        }
    }

    /// Size reported by `probe`; `None` makes the probe fail.
    pub fn with_image(mut self, image: Option<ImageSize>) -> Self {
        self.image = image;
        self
    }

    /// Report sizes only through a base64 payload.
    pub fn with_base64_only(mut self) -> Self {
        self.base64_only = true;
        self
    }

    /// Fail the `n`th (1-based) process call.
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    /// Trip `flag` once the `n`th process call has returned.
    pub fn cancel_after(mut self, n: usize, flag: CancelFlag) -> Self {
        self.cancel_after = Some((n, flag));
        self
    }

    /// Sleep inside every process call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn qualities(&self) -> Vec<f32> {
        self.calls().iter().map(|c| c.quality).collect()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().unwrap().clone()
    }

    fn size_for(&self, n: usize) -> usize {
        self.sizes
            .get(n - 1)
            .or(self.sizes.last())
            .copied()
            .unwrap_or(0)
    }
}

fn output_dims(ops: &[CodecOp]) -> (u32, u32) {
    ops.iter().fold((1400, 1050), |dims, op| match *op {
        CodecOp::Crop(region) => (region.width, region.height),
        CodecOp::Resize { width, height } => (width, height),
        CodecOp::Rotate(turn) if turn.swaps_dimensions() => (dims.1, dims.0),
        CodecOp::Rotate(_) => dims,
    })
}

impl ImageCodec for ScriptedCodec {
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError> {
        self.image.ok_or_else(|| CodecError::NotFound(uri.to_string()))
    }

    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail_on == Some(n) {
            return Err(CodecError::Failed(format!("scripted failure on call {n}")));
        }

        self.calls.lock().unwrap().push(Call {
            source_uri: uri.to_string(),
            ops: ops.to_vec(),
            quality: options.quality,
        });

        let size = self.size_for(n);
        let (width, height) = output_dims(ops);
        let output = CodecOutput {
            uri: format!("scripted://out/{n}"),
            width,
            height,
            base64: if self.base64_only {
                Some("A".repeat(size.div_ceil(3) * 4))
            } else {
                options.emit_base64.then(|| "c2NyaXB0ZWQ=".to_string())
            },
            byte_len: (!self.base64_only).then_some(size),
        };

        if let Some((after, flag)) = &self.cancel_after {
            if n >= *after {
                flag.cancel();
            }
        }
        Ok(output)
    }

    fn release(&self, uri: &str) -> Result<(), CodecError> {
        self.released.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}
