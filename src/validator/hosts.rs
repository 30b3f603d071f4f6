//! Host selection policies for single-host checks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

/// Picks which configured host serves a single-host check.
pub trait HostSelector: Send + Sync {
    /// Return an index below `candidates` (which is never zero).
    fn pick(&self, candidates: usize) -> usize;
}

/// Uniformly random choice.
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic sequence, for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSelector for RandomSelector {
    fn pick(&self, candidates: usize) -> usize {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..candidates)
    }
}

/// Cycles through hosts in order, one per check.
#[derive(Default)]
pub struct RoundRobinSelector {
    cursor: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HostSelector for RoundRobinSelector {
    fn pick(&self, candidates: usize) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % candidates
    }
}

/// Always the same position in the host list (wrapped if out of range).
pub struct FixedSelector {
    index: usize,
}

impl FixedSelector {
    pub fn new(index: usize) -> Self {
        Self { index }
    }
}

impl HostSelector for FixedSelector {
    fn pick(&self, candidates: usize) -> usize {
        self.index % candidates
    }
}

/// Selection strategy as named in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostSelection {
    #[default]
    Random,
    RoundRobin,
    First,
}

impl HostSelection {
    /// Instantiate the selector for this strategy.
    pub fn selector(self) -> Box<dyn HostSelector> {
        match self {
            Self::Random => Box::new(RandomSelector::new()),
            Self::RoundRobin => Box::new(RoundRobinSelector::new()),
            Self::First => Box::new(FixedSelector::new(0)),
        }
    }
}
