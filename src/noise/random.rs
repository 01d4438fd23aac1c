//! Seeded parameter randomizer.
//!
//! Kernels receive a four-component offset that shifts the sampled noise
//! domain. The offset is derived from a string seed so that a bake can be
//! reproduced exactly: same seed, same draws, same pixels.

use glam::Vec4;
use rand::{RngCore, SeedableRng};

/// Default half-width of the offset range.
pub const DEFAULT_OFFSET_BOUND: f32 = 1000.0;

/// Substitute for a zero seed; xorshift never leaves the zero state.
const ZERO_SEED_FALLBACK: u32 = 0x6E62_4EB7;

const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Stable 32-bit FNV-1a hash of a seed string.
pub fn seed_hash(seed: &str) -> u32 {
    seed.as_bytes().iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ byte as u32).wrapping_mul(FNV_PRIME)
    })
}

/// 32-bit xorshift generator (shifts 13, 17, 5).
///
/// Seeding advances the state once, and each draw returns the state from
/// before the advance.
#[derive(Debug, Clone)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    pub fn new(seed: u32) -> Self {
        let mut rng = Self {
            state: if seed == 0 { ZERO_SEED_FALLBACK } else { seed },
        };
        rng.next_state();
        rng
    }

    fn next_state(&mut self) -> u32 {
        let t = self.state;
        self.state ^= self.state << 13;
        self.state ^= self.state >> 17;
        self.state ^= self.state << 5;
        t
    }

    /// Uniform float in `[0, 1)` built from the top 23 bits of a draw.
    pub fn next_f32(&mut self) -> f32 {
        f32::from_bits(0x3f80_0000 | (self.next_state() >> 9)) - 1.0
    }

    /// Uniform float in `[min, max)`.
    pub fn next_f32_range(&mut self, min: f32, max: f32) -> f32 {
        self.next_f32() * (max - min) + min
    }
}

impl RngCore for Xorshift32 {
    fn next_u32(&mut self) -> u32 {
        self.next_state()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_u32() as u64;
        let hi = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Xorshift32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

/// Produces bounded offsets for one generation request.
#[derive(Debug, Clone)]
pub struct ParameterRandomizer {
    rng: Xorshift32,
    bound: f32,
}

impl ParameterRandomizer {
    /// Seeds from the hash of `seed` and performs the warm-up draw.
    ///
    /// The warm-up value is discarded; reference bakes depend on the
    /// offset components being the 2nd..5th draws after seeding.
    pub fn new(seed: &str) -> Self {
        Self::with_bound(seed, DEFAULT_OFFSET_BOUND)
    }

    pub fn with_bound(seed: &str, bound: f32) -> Self {
        let mut randomizer = Self {
            rng: Xorshift32::from_seed(seed_hash(seed).to_le_bytes()),
            bound,
        };
        let _warm_up = randomizer.next(bound);
        randomizer
    }

    /// Draws a float in `[-bound, bound]`.
    pub fn next(&mut self, bound: f32) -> f32 {
        self.rng.next_f32_range(-bound, bound)
    }

    /// Draws the x, y, z, w offset components, in that order.
    pub fn offset_vector(&mut self) -> Vec4 {
        let bound = self.bound;
        let x = self.next(bound);
        let y = self.next(bound);
        let z = self.next(bound);
        let w = self.next(bound);
        Vec4::new(x, y, z, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_hash_is_fnv1a() {
        assert_eq!(seed_hash(""), 0x811C_9DC5);
        assert_eq!(seed_hash("a"), 0xE40C_292C);
        assert_ne!(seed_hash("abc"), seed_hash("abd"));
    }

    #[test]
    fn test_xorshift_sequence() {
        let mut rng = Xorshift32 { state: 1 };
        assert_eq!(rng.next_u32(), 1);
        // 1 ^ (1 << 13) = 0x2001; ^ (>> 17) = 0x2001; ^ (<< 5) = 0x42021
        assert_eq!(rng.next_u32(), 0x0004_2021);
    }

    #[test]
    fn test_seeding_advances_once() {
        let mut seeded = Xorshift32::new(1);
        let mut raw = Xorshift32 { state: 1 };
        raw.next_state();
        assert_eq!(seeded.next_u32(), raw.next_u32());
    }

    #[test]
    fn test_zero_seed_does_not_stall() {
        let mut rng = Xorshift32::from_seed([0; 4]);
        let a = rng.next_u32();
        let b = rng.next_u32();
        assert_ne!(a, 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_unit_float_range() {
        let mut rng = Xorshift32::new(12345);
        for _ in 0..10_000 {
            let f = rng.next_f32();
            assert!((0.0..1.0).contains(&f), "{} out of [0, 1)", f);
        }
    }

    #[test]
    fn test_offsets_are_reproducible() {
        let a = ParameterRandomizer::new("abc").offset_vector();
        let b = ParameterRandomizer::new("abc").offset_vector();
        assert_eq!(a.to_array().map(f32::to_bits), b.to_array().map(f32::to_bits));

        let c = ParameterRandomizer::new("abd").offset_vector();
        assert_ne!(a, c, "Different seeds should produce different offsets");
    }

    #[test]
    fn test_warm_up_draw_is_discarded() {
        let offset = ParameterRandomizer::new("seed").offset_vector();

        let mut rng = Xorshift32::from_seed(seed_hash("seed").to_le_bytes());
        let b = DEFAULT_OFFSET_BOUND;
        let _discarded = rng.next_f32_range(-b, b);
        let expected = Vec4::new(
            rng.next_f32_range(-b, b),
            rng.next_f32_range(-b, b),
            rng.next_f32_range(-b, b),
            rng.next_f32_range(-b, b),
        );
        assert_eq!(offset, expected);
    }

    #[test]
    fn test_offsets_within_bound() {
        for seed in ["", "abc", "noise", "a much longer seed string"] {
            let v = ParameterRandomizer::new(seed).offset_vector();
            for c in v.to_array() {
                assert!(c >= -DEFAULT_OFFSET_BOUND && c <= DEFAULT_OFFSET_BOUND);
            }
        }
        let v = ParameterRandomizer::with_bound("abc", 2.0).offset_vector();
        assert!(v.abs().max_element() <= 2.0);
    }
}
