//! Injectable random sources for simulation.
//!
//! Simulations never reach for process-wide randomness: callers hand in a
//! [`RandomSource`], and tests seed one deterministically.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed 64-bit values.
pub trait RandomSource: Send {
    /// Next raw value.
    fn next_u64(&mut self) -> u64;

    /// Uniform index in `0..bound`. `bound` must be non-zero.
    #[allow(clippy::cast_possible_truncation)]
    fn next_index(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "bound must be non-zero");
        // Multiply-shift; xorshift low bits are weak under modulo.
        ((u128::from(self.next_u64()) * bound as u128) >> 64) as usize
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Deterministic xorshift64 generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Seeds the generator. A zero seed is replaced by a fixed non-zero one.
    #[must_use]
    pub const fn seeded(seed: u64) -> Self {
        let state = if seed == 0 {
            0x9E37_79B9_7F4A_7C15
        } else {
            seed
        };
        Self { state }
    }

    /// Seeds the generator from fresh entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        let (hi, lo) = uuid::Uuid::new_v4().as_u64_pair();
        Self::seeded(hi ^ lo.rotate_left(32))
    }
}

impl RandomSource for Xorshift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

/// How a simulation seeds its generator when the caller does not inject one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "seed", rename_all = "snake_case")]
pub enum SeedStrategy {
    /// Fresh entropy per run.
    #[default]
    Entropy,
    /// A fixed seed.
    Fixed(u64),
    /// Derived from a hash of the inputs: identical inputs draw identically.
    Stable,
}

impl SeedStrategy {
    /// Builds a generator; `fingerprint` is only consulted for [`SeedStrategy::Stable`].
    pub fn generator(self, fingerprint: impl FnOnce() -> blake3::Hash) -> Xorshift64 {
        match self {
            Self::Entropy => Xorshift64::from_entropy(),
            Self::Fixed(seed) => Xorshift64::seeded(seed),
            Self::Stable => {
                let hash = fingerprint();
                let mut seed = [0u8; 8];
                seed.copy_from_slice(&hash.as_bytes()[..8]);
                Xorshift64::seeded(u64::from_le_bytes(seed))
            }
        }
    }
}
