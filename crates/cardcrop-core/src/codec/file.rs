//! Filesystem codec for native hosts.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tempfile::TempDir;
use tracing::{debug, warn};

use super::{
    output_for, probe_bytes, render, CodecError, CodecOp, CodecOutput, EncodeOptions, ImageCodec,
};
use crate::mapping::ImageSize;

const FILE_SCHEME: &str = "file://";

/// Codec that reads photos from disk and writes every output into a private
/// temporary directory.
///
/// URIs are plain paths or `file://` URLs. Outputs live until they are
/// released or the codec is dropped, which removes the whole directory.
#[derive(Debug)]
pub struct FileCodec {
    out_dir: TempDir,
    next_id: AtomicU64,
}

impl FileCodec {
    pub fn new() -> Result<Self, CodecError> {
        let out_dir = tempfile::Builder::new().prefix("cardcrop-").tempdir()?;
        debug!(dir = %out_dir.path().display(), "created codec output directory");
        Ok(Self {
            out_dir,
            next_id: AtomicU64::new(0),
        })
    }

    /// Directory holding transient outputs.
    pub fn output_dir(&self) -> &Path {
        self.out_dir.path()
    }

    fn read(&self, uri: &str) -> Result<Vec<u8>, CodecError> {
        let path = path_of(uri);
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CodecError::NotFound(uri.to_string()),
            _ => CodecError::from(e),
        })
    }

    fn owns(&self, path: &Path) -> bool {
        path.parent() == Some(self.out_dir.path())
    }
}

fn path_of(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri))
}

impl ImageCodec for FileCodec {
    fn probe(&self, uri: &str) -> Result<ImageSize, CodecError> {
        probe_bytes(&self.read(uri)?)
    }

    fn process(
        &self,
        uri: &str,
        ops: &[CodecOp],
        options: &EncodeOptions,
    ) -> Result<CodecOutput, CodecError> {
        let source = self.read(uri)?;
        let rendered = render(&source, ops, options)?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self
            .out_dir
            .path()
            .join(format!("crop-{id}.{}", options.format.extension()));
        fs::write(&path, &rendered.bytes)?;

        Ok(output_for(
            format!("{FILE_SCHEME}{}", path.display()),
            &rendered,
            options,
        ))
    }

    /// Deletes the output file. URIs outside the output directory are left
    /// untouched so a caller can never delete the user's original photo.
    fn release(&self, uri: &str) -> Result<(), CodecError> {
        let path = path_of(uri);
        if !self.owns(&path) {
            warn!(uri, "refusing to release a file the codec did not create");
            return Ok(());
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(uri, "released codec output file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
