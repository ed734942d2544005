//! Size-bounded encoding of a cropped region.
//!
//! A [`CompressionPolicy`] describes the byte budget, the maximum edge
//! length, and how quality is stepped down when an encode comes out too
//! large. The loop itself lives in [`CompressionLoop`], a step machine that
//! decides what to encode next from the size of the previous output. It has
//! no I/O of its own, so the same loop drives both the blocking
//! [`SizeBoundedEncoder`] and the async pipeline.
//!
//! # Presets
//!
//! | preset                | max edge | budget     | re-encodes | hard ceiling | re-encode from  |
//! |-----------------------|----------|------------|------------|--------------|-----------------|
//! | `membership_card`     | 1400 px  | 380 000 B  | 3          | budget       | previous output |
//! | `medical_certificate` | 1600 px  | 700 000 B  | 2          | budget + 10% | original crop   |

mod compression;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encode::EncodeFormat;
use crate::pipeline::PipelineError;

#[cfg(feature = "native")]
pub(crate) use compression::release_all;
pub use compression::{CompressionLoop, EncodeRequest, EncodedCrop, SizeBoundedEncoder, Step};

/// Budget a final encoded image must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeBudget {
    pub max_bytes: usize,
    pub max_edge_pixels: u32,
}

/// Which raster a re-encode starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReencodeSource {
    /// Re-encode the previous attempt's output (generational loss shrinks
    /// the file further at the same quality).
    #[default]
    PreviousOutput,
    /// Re-encode the mapped crop of the original photo every time.
    OriginalCrop,
}

/// Compression parameters for one crop flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressionPolicy {
    pub budget: EncodeBudget,
    pub format: EncodeFormat,
    pub initial_quality: f32,
    pub quality_step: f32,
    pub min_quality: f32,
    /// Re-encodes allowed after the first encode.
    pub max_reencodes: u32,
    /// Largest size still accepted once re-encodes are exhausted.
    pub hard_ceiling_bytes: usize,
    pub reencode_source: ReencodeSource,
    /// Per codec call; only enforced by the async pipeline.
    pub encode_timeout_ms: u64,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self::membership_card()
    }
}

impl CompressionPolicy {
    /// Club membership card photo.
    pub fn membership_card() -> Self {
        Self {
            budget: EncodeBudget {
                max_bytes: 380_000,
                max_edge_pixels: 1400,
            },
            format: EncodeFormat::Jpeg,
            initial_quality: 0.7,
            quality_step: 0.1,
            min_quality: 0.4,
            max_reencodes: 3,
            hard_ceiling_bytes: 380_000,
            reencode_source: ReencodeSource::PreviousOutput,
            encode_timeout_ms: 15_000,
        }
    }

    /// Scanned medical certificate; text must stay legible, so the edge is
    /// larger and a small overshoot is tolerated.
    pub fn medical_certificate() -> Self {
        Self {
            budget: EncodeBudget {
                max_bytes: 700_000,
                max_edge_pixels: 1600,
            },
            format: EncodeFormat::Jpeg,
            initial_quality: 0.7,
            quality_step: 0.1,
            min_quality: 0.4,
            max_reencodes: 2,
            hard_ceiling_bytes: 770_000,
            reencode_source: ReencodeSource::OriginalCrop,
            encode_timeout_ms: 20_000,
        }
    }

    /// Check that the policy can drive a terminating, meaningful loop.
    pub fn validated(self) -> Result<Self, PipelineError> {
        let invalid = |msg: &str| Err(PipelineError::InvalidPolicy(msg.to_string()));

        if self.budget.max_bytes == 0 || self.budget.max_edge_pixels == 0 {
            return invalid("budget must be positive");
        }
        let quality_ok = |q: f32| q.is_finite() && q > 0.0 && q <= 1.0;
        if !quality_ok(self.initial_quality) || !quality_ok(self.min_quality) {
            return invalid("qualities must be in (0, 1]");
        }
        if self.min_quality > self.initial_quality {
            return invalid("min quality exceeds initial quality");
        }
        if !self.quality_step.is_finite() || self.quality_step <= 0.0 {
            return invalid("quality step must be positive");
        }
        if self.hard_ceiling_bytes < self.budget.max_bytes {
            return invalid("hard ceiling is below the budget");
        }
        if self.encode_timeout_ms == 0 {
            return invalid("encode timeout must be positive");
        }
        Ok(self)
    }

    /// Quality used for attempt `index` (0 is the first encode), floored at
    /// `min_quality` and rounded to hundredths.
    pub fn quality_for(&self, index: u32) -> f32 {
        let q = (self.initial_quality - self.quality_step * index as f32).max(self.min_quality);
        (q * 100.0).round() / 100.0
    }

    /// Upper bound on codec encode calls for one run.
    pub fn max_encode_calls(&self) -> u32 {
        self.max_reencodes.saturating_add(1)
    }
}

/// Outcome of one encode in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionAttempt {
    pub quality: f32,
    pub format: EncodeFormat,
    pub size_bytes: usize,
}

/// The loop ran out of re-encodes with the output still over the hard
/// ceiling.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error(
    "image is still {} bytes after {} encodes (limit {} bytes); crop tighter or shoot closer",
    .attempts.last().map_or(0, |a| a.size_bytes),
    .attempts.len(),
    .budget.max_bytes
)]
pub struct OversizedError {
    pub attempts: Vec<CompressionAttempt>,
    pub budget: EncodeBudget,
    pub hard_ceiling_bytes: usize,
}

impl OversizedError {
    /// Size of the last (smallest-quality) attempt.
    pub fn final_size(&self) -> Option<usize> {
        self.attempts.last().map(|a| a.size_bytes)
    }
}
