//! Random percentage rolls for ambient rule rows.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Controls generator behaviour: predictable for tests, truly random for
/// gameplay.
pub enum ChanceMode {
    Predictable,
    RandomUniform,
}

pub struct Chance {
    rng: Box<dyn RngCore>,
    mode: ChanceMode,
}

impl Chance {
    pub fn new_uniform() -> Chance {
        Chance {
            rng: Box::new(rand::thread_rng()),
            mode: ChanceMode::RandomUniform,
        }
    }

    pub fn new_predictable(seed: u64) -> Chance {
        Chance {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            mode: ChanceMode::Predictable,
        }
    }

    /// True with probability `n` percent. Values of 100 or more always
    /// succeed.
    pub fn percent(&mut self, n: u16) -> bool {
        self.rng.gen_range(0..100u16) < n
    }
}
