//! Async pipeline driver for native hosts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use super::{finish, log_outcome, map_region, CancelFlag, CropRequest, CropResult, PipelineError};
use crate::codec::{CodecError, CodecOutput, ImageCodec};
use crate::encoder::{release_all, CompressionLoop, CompressionPolicy, EncodeRequest, Step};

/// Map, encode and compress one crop without blocking the runtime.
///
/// Each codec call runs on the blocking pool and is bounded by the policy's
/// `encode_timeout_ms`. Attempts stay strictly sequential: attempt `k + 1`
/// is only issued after attempt `k` has been measured.
///
/// # Errors
///
/// Same as [`run`](super::run), plus `CodecError::Timeout` when a codec call
/// exceeds its time limit.
pub async fn run_async<C>(
    codec: Arc<C>,
    request: CropRequest,
    policy: CompressionPolicy,
    cancel: CancelFlag,
) -> Result<CropResult, PipelineError>
where
    C: ImageCodec + Send + Sync + 'static,
{
    let result = drive(&codec, &request, policy, &cancel).await;
    log_outcome(&result);
    result
}

async fn drive<C>(
    codec: &Arc<C>,
    request: &CropRequest,
    policy: CompressionPolicy,
    cancel: &CancelFlag,
) -> Result<CropResult, PipelineError>
where
    C: ImageCodec + Send + Sync + 'static,
{
    let policy = policy.validated()?;
    let region = map_region(request, cancel)?;
    let limit = Duration::from_millis(policy.encode_timeout_ms);

    let mut compression = CompressionLoop::new(policy, request.source_uri.clone(), region);
    let mut next = compression.start();

    let outcome = loop {
        if cancel.is_cancelled() {
            break Err(PipelineError::Cancelled);
        }

        let output = match process_with_timeout(codec, next, limit).await {
            Ok(output) => output,
            Err(e) => break Err(e.into()),
        };

        match compression.observe(output) {
            Ok(Step::Encode(following)) => next = following,
            Ok(Step::Done(crop)) => break Ok(crop),
            Ok(Step::Oversized(err)) => break Err(err.into()),
            Err(e) => break Err(e.into()),
        }
        release_all(codec.as_ref(), compression.take_releasable());
    };

    release_all(codec.as_ref(), compression.abandon());
    finish(codec.as_ref(), outcome?, cancel)
}

async fn process_with_timeout<C>(
    codec: &Arc<C>,
    request: EncodeRequest,
    limit: Duration,
) -> Result<CodecOutput, CodecError>
where
    C: ImageCodec + Send + Sync + 'static,
{
    let worker = Arc::clone(codec);
    let mut handle = tokio::task::spawn_blocking(move || {
        worker.process(&request.source_uri, &request.ops, &request.options)
    });

    match tokio::time::timeout(limit, &mut handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(CodecError::Failed(format!("codec task failed: {join_err}"))),
        Err(_) => {
            let timeout_ms = limit.as_millis() as u64;
            warn!(timeout_ms, "codec call timed out");
            tokio::spawn(release_when_done(Arc::clone(codec), handle));
            Err(CodecError::Timeout(timeout_ms))
        }
    }
}

/// The blocking task cannot be aborted; release its output once it lands.
async fn release_when_done<C>(codec: Arc<C>, handle: JoinHandle<Result<CodecOutput, CodecError>>)
where
    C: ImageCodec + Send + Sync + 'static,
{
    if let Ok(Ok(output)) = handle.await {
        release_all(codec.as_ref(), vec![output.uri]);
    }
}
