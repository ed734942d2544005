use thiserror::Error;

use crate::codec::CodecError;
use crate::encoder::OversizedError;
use crate::geometry::GeometryError;

/// Errors that end a crop confirm (or prevent a session from opening).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The photo could not be probed or has no pixels.
    #[error("cannot load image: {0}")]
    InvalidSource(String),

    #[error(transparent)]
    Oversized(#[from] OversizedError),

    #[error("could not process image: {0}")]
    Codec(#[from] CodecError),

    #[error("crop was cancelled")]
    Cancelled,

    #[error("invalid compression policy: {0}")]
    InvalidPolicy(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// `confirm` was called with no open crop session.
    #[error("no crop session is open")]
    NotOpen,
}

impl PipelineError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::InvalidSource(_) | PipelineError::Geometry(_) => "Cannot load image.",
            PipelineError::Oversized(_) => {
                "The image is too large. Crop tighter or shoot closer and try again."
            }
            PipelineError::Codec(_) | PipelineError::InvalidPolicy(_) => "Could not process image.",
            PipelineError::Cancelled | PipelineError::NotOpen => "Cropping was cancelled.",
        }
    }

    /// Whether the user can retry from the same open session.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::Oversized(_) | PipelineError::Codec(_))
    }
}
