//! Injected source of randomness for the allocation engine.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Picks one index out of `len` candidates.
///
/// Callers guarantee `len > 0`.
pub trait Selector: Send + Sync {
    fn pick(&mut self, len: usize) -> usize;
}

/// Uniform, unbiased selection backed by any [`rand::Rng`].
#[derive(Debug, Clone)]
pub struct RandomSelector<R = StdRng> {
    rng: R,
}

impl RandomSelector<StdRng> {
    /// Seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for reproducible draws.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R> RandomSelector<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send + Sync> Selector for RandomSelector<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed script of indices, cycling when exhausted.
///
/// Each scripted value is reduced modulo `len`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSelector {
    script: VecDeque<usize>,
}

impl ScriptedSelector {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Always picks the first candidate.
    pub fn first() -> Self {
        Self::new([0])
    }
}

impl Selector for ScriptedSelector {
    fn pick(&mut self, len: usize) -> usize {
        let Some(next) = self.script.pop_front() else {
            return 0;
        };
        self.script.push_back(next);
        next % len
    }
}
