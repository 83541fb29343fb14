//! Sources of randomness for head sampling.

use std::fmt;

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Draws uniformly distributed numbers in `[0, 100)` for head sampling.
///
/// The engine keeps an event if the draw is less than the configured rate.
pub trait RandomSource: Send + Sync {
    /// Returns a number in `[0, 100)`.
    fn draw(&self) -> f64;
}

/// Draws from the thread-local generator of `rand`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::rng().random_range(0.0..100.0)
    }
}

/// A deterministic generator seeded explicitly.
///
/// Two instances with the same seed produce the same sequence of draws.
pub struct SeededRandom {
    generator: Mutex<Pcg32>,
}

impl SeededRandom {
    /// Creates a generator from a seed.
    pub fn new(seed: u64) -> Self {
        Self {
            generator: Mutex::new(Pcg32::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn draw(&self) -> f64 {
        self.generator.lock().random_range(0.0..100.0)
    }
}

impl fmt::Debug for SeededRandom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeededRandom").finish_non_exhaustive()
    }
}

/// Always returns the same draw.
#[derive(Clone, Copy, Debug)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn draw(&self) -> f64 {
        self.0
    }
}
