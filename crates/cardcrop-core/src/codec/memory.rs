//! In-process codec backed by a URI-keyed blob store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::{
    output_for, probe_bytes, render, CodecError, CodecOp, CodecOutput, EncodeOptions, ImageCodec,
};
use crate::mapping::ImageSize;

const SCHEME: &str = "mem://";

/// Codec that stores encoded images in memory under `mem://` URIs.
///
/// Sources are registered with [`insert_source`](Self::insert_source);
/// every `process` call stores its output under a fresh URI until it is
/// released.
#[derive(Debug, Default)]
pub struct MemoryCodec {
    blobs: Mutex<HashMap<String, Arc<Vec<u8>>>>,
    next_id: AtomicU64,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store source bytes and return the URI they can be addressed by.
    pub fn insert_source(&self, bytes: Vec<u8>) -> Result<String, CodecError> {
        let uri = format!("{SCHEME}source/{}", self.next_id());
        self.insert(uri.clone(), bytes)?;
        Ok(uri)
    }

    /// Store bytes under an explicit URI, replacing any previous entry.
    pub fn insert(&self, uri: impl Into<String>, bytes: Vec<u8>) -> Result<(), CodecError> {
        self.lock()?.insert(uri.into(), Arc::new(bytes));
        Ok(())
    }

    /// Encoded bytes stored under `uri`.
    pub fn get(&self, uri: &str) -> Result<Arc<Vec<u8>>, CodecError> {
        self.lock()?
            .get(uri)
            .cloned()
            .ok_or_else(|| CodecError::NotFound(uri.to_string()))
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.lock().map(|b| b.contains_key(uri)).unwrap_or(false)
    }

    /// Number of stored blobs (sources and outputs).
    pub fn len(&self) -> usize {
        self.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Arc<Vec<u8>>>>, CodecError> {
        self.blobs
            .lock()
            .map_err(|_| CodecError::Failed("memory codec store poisoned".to_string()))
    }
}

impl ImageCodec for MemoryCodec {
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError> {
        probe_bytes(&self.get(uri)?)
    }

    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError> {
        let source = self.get(uri)?;
        let rendered = render(&source, ops, options)?;

        let out_uri = format!(
            "{SCHEME}output/{}.{}",
            self.next_id(),
            options.format.extension()
        );
        let output = output_for(out_uri.clone(), &rendered, options);
        self.insert(out_uri, rendered.bytes)?;

        Ok(output)
    }

    fn release(&self, uri: &str) -> Result<(), CodecError> {
        if self.lock()?.remove(uri).is_some() {
            debug!(uri, "released in-memory codec output");
        }
        Ok(())
    }
}
