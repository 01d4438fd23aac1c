//! Noise variant catalogue and the seeded parameter randomizer.
//!
//! The noise math itself lives in the GPU kernels; this module only knows
//! which variants exist, whether they are 2D or 3D, and how their domain
//! offsets are drawn from a seed.

mod random;
mod variant;

pub use random::{seed_hash, ParameterRandomizer, Xorshift32, DEFAULT_OFFSET_BOUND};
pub use variant::{DimensionClass, NoiseVariant, ParseVariantError, VariantClasses};
