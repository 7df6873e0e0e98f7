use rand::{Rng, RngCore};
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Stream of uniform variates in `[0, 1)`.
pub trait UnitSource {
    fn next_unit(&mut self) -> f64;
}

/// Most steps [`CongruentialRng::period`] is asked to walk when reporting.
pub const PERIOD_SEARCH_LIMIT: usize = 1 << 20;

/// Multiplicative congruential generator `x' = (a * x + b) mod m`, emitting
/// `x' / m`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CongruentialRng {
    multiplier: u64,
    increment: u64,
    modulus: u64,
    state: u64,
}

impl CongruentialRng {
    pub fn new(multiplier: u64, increment: u64, modulus: u64, seed: u64) -> Result<Self> {
        if modulus == 0 {
            return Err(Error::InvalidGenerator("modulus must be > 0".to_string()));
        }
        if seed >= modulus {
            return Err(Error::InvalidGenerator(format!(
                "seed {} must be below modulus {}",
                seed, modulus
            )));
        }
        Ok(Self {
            multiplier,
            increment,
            modulus,
            state: seed,
        })
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn next_state(&mut self) -> u64 {
        let next = (u128::from(self.multiplier) * u128::from(self.state)
            + u128::from(self.increment))
            % u128::from(self.modulus);
        // next < modulus, which fits in u64
        self.state = next as u64;
        self.state
    }

    /// Length of the cycle the sequence settles into, or `None` if no state
    /// repeats within `max_steps`.
    pub fn period(&self, max_steps: usize) -> Option<usize> {
        let mut walker = self.clone();
        let mut seen: HashMap<u64, usize> = HashMap::new();
        seen.insert(walker.state, 0);
        for step in 1..=max_steps {
            let state = walker.next_state();
            if let Some(first) = seen.insert(state, step) {
                return Some(step - first);
            }
        }
        None
    }
}

impl UnitSource for CongruentialRng {
    fn next_unit(&mut self) -> f64 {
        self.next_state() as f64 / self.modulus as f64
    }
}

/// Adapts any `rand` generator to [`UnitSource`].
pub struct SeededSource<R> {
    rng: R,
}

impl<R: RngCore> SeededSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: RngCore> UnitSource for SeededSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
