//! Neighbor selection and iteration order.
//!
//! A topology answers two questions per step: which positions a cell may
//! partner with, and in which order positions are visited. The iteration
//! order is deterministic given the seed; selection cells override the
//! neighbor set with their current target, since that target is cell state
//! the `(i, N)` signature cannot see.

use rand::seq::SliceRandom;
use rand::rngs::SmallRng;
use smallvec::SmallVec;

use crate::rng;

pub type Neighbors = SmallVec<[usize; 2]>;

pub trait Topology: Send {
    /// Candidate partner positions for position `i` in an array of length
    /// `n`.
    fn neighbors(&self, i: usize, n: usize) -> Neighbors;

    /// Positions to visit for one step, each exactly once.
    fn iteration_order(&mut self, n: usize) -> Vec<usize>;
}

/// The canonical topology: partners are `{i-1, i+1}` within bounds, visits
/// run left to right.
#[derive(Debug, Default, Clone)]
pub struct AdjacentTopology;

impl Topology for AdjacentTopology {
    fn neighbors(&self, i: usize, n: usize) -> Neighbors {
        let mut out = Neighbors::new();
        if i > 0 {
            out.push(i - 1);
        }
        if i + 1 < n {
            out.push(i + 1);
        }
        out
    }

    fn iteration_order(&mut self, n: usize) -> Vec<usize> {
        (0..n).collect()
    }
}

/// Adjacent neighbors with a per-step shuffled visiting order drawn from an
/// owned seeded generator.
pub struct ShuffledTopology {
    rng: SmallRng,
}

impl ShuffledTopology {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: rng::rng_for(seed, rng::stream::TOPOLOGY),
        }
    }
}

impl Topology for ShuffledTopology {
    fn neighbors(&self, i: usize, n: usize) -> Neighbors {
        AdjacentTopology.neighbors(i, n)
    }

    fn iteration_order(&mut self, n: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        order
    }
}
