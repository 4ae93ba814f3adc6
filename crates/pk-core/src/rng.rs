//! Deterministic simulation randomizer.
//!
//! Parking search deliberately injects randomness (position jitter, "keep
//! scanning" coin flips, reckless drivers).  All of it flows through one
//! seeded [`SimRng`] owned by the simulation context so a run is reproducible
//! from its seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Uniform integer in `0..max`.  `max == 0` yields `0`, so a modulus of
    /// zero in the configuration means "never".
    #[inline]
    pub fn int32(&mut self, max: u32) -> u32 {
        if max == 0 { 0 } else { self.0.gen_range(0..max) }
    }

    /// Jitter in `-(max/2) .. max - max/2`, the spread used to randomise a
    /// reference point around its true position.
    #[inline]
    pub fn jitter(&mut self, max: u32) -> f32 {
        self.int32(max) as f32 - (max / 2) as f32
    }
}
