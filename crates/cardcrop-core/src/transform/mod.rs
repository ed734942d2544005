//! Raster transforms applied by the codec before encoding.
//!
//! # Transform Order
//!
//! The codec applies operations in the order they are given. The crop
//! pipeline always sends:
//! 1. Crop to the mapped source region
//! 2. Resize to fit the maximum edge (only when needed)
//!
//! Quarter-turn rotation exists for hosts that let the user fix a sideways
//! photo; arbitrary angles are not supported.

mod crop;
mod rotate;

pub use crop::crop_region;
pub use rotate::{rotate_quarter, QuarterTurn};
