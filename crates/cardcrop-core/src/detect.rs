//! Automatic document-edge detection hook.
//!
//! A detector may propose an initial crop rectangle when a session opens.
//! Proposals go through [`CropEngine::set_rect`](crate::geometry::CropEngine::set_rect),
//! so a sloppy detector can never produce an invalid rectangle.

use tracing::debug;

use crate::geometry::{CropRect, DisplaySize};

/// Proposes a crop rectangle (in display coordinates) for a photo.
pub trait DocumentDetector {
    /// `None` means "not found"; the user crops manually from the centered
    /// default.
    fn detect(&self, source_uri: &str, display: DisplaySize) -> Option<CropRect>;
}

/// Detector that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualOnly;

impl DocumentDetector for ManualOnly {
    fn detect(&self, source_uri: &str, _display: DisplaySize) -> Option<CropRect> {
        debug!(source = source_uri, "no document detector; manual crop");
        None
    }
}
