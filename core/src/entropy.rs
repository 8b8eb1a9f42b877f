//! Sources of oracle index draws.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Draws indexes uniformly from `[0, range)`.
pub trait IndexSource: Send + Sync {
    fn draw(&self, range: u8) -> u8;
}

/// OS-seeded thread-local CSPRNG. Draws cannot be predicted before the call
/// that makes them.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIndexSource;

impl IndexSource for RandomIndexSource {
    fn draw(&self, range: u8) -> u8 {
        rand::thread_rng().gen_range(0..range)
    }
}

/// Reproducible draws for simulations.
#[derive(Debug)]
pub struct SeededIndexSource {
    rng: Mutex<StdRng>,
}

impl SeededIndexSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl IndexSource for SeededIndexSource {
    fn draw(&self, range: u8) -> u8 {
        self.rng.lock().gen_range(0..range)
    }
}
