//! Termination predicates.
//!
//! The engine delegates "are we done?" to a detector so experiments can
//! terminate on quiescence, on a sortedness threshold, or only at the step
//! ceiling.

use ede_common::SortDirection;

use crate::cell::Comparator;
use crate::metrics;
use crate::world::World;

/// Everything a detector may look at for one step.
pub struct ConvergenceCheck<'a, T> {
    pub step: u64,
    pub swaps_this_step: u64,
    pub steps_since_last_swap: u64,
    pub world: &'a World<T>,
    pub comparator: &'a Comparator<T>,
}

pub trait ConvergenceDetector<T>: Send {
    fn converged(&mut self, check: &ConvergenceCheck<'_, T>) -> bool;

    /// Called on `engine.reset()`; stateless detectors need nothing.
    fn reset(&mut self) {}
}

/// The canonical detector: no swaps for K consecutive steps.
#[derive(Debug, Clone)]
pub struct NoSwapConvergence {
    required_stable_steps: u64,
}

impl NoSwapConvergence {
    pub const DEFAULT_STABLE_STEPS: u64 = 3;

    pub fn new(required_stable_steps: u64) -> Self {
        Self {
            required_stable_steps: required_stable_steps.max(1),
        }
    }

    /// K grown with array size: log2(n), floored at the default.
    pub fn scaled(n: usize) -> Self {
        let scaled = (usize::BITS - n.max(1).leading_zeros()) as u64;
        Self::new(scaled.max(Self::DEFAULT_STABLE_STEPS))
    }

    pub fn required_stable_steps(&self) -> u64 {
        self.required_stable_steps
    }
}

impl Default for NoSwapConvergence {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STABLE_STEPS)
    }
}

impl<T> ConvergenceDetector<T> for NoSwapConvergence {
    fn converged(&mut self, check: &ConvergenceCheck<'_, T>) -> bool {
        check.steps_since_last_swap >= self.required_stable_steps
    }
}

/// Terminate once sortedness (0–100, adjacent-pair measure) reaches a
/// threshold under a fixed direction.
#[derive(Debug, Clone)]
pub struct SortednessConvergence {
    threshold: f64,
    direction: SortDirection,
}

impl SortednessConvergence {
    pub fn new(threshold: f64, direction: SortDirection) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 100.0),
            direction,
        }
    }
}

impl<T: Clone> ConvergenceDetector<T> for SortednessConvergence {
    fn converged(&mut self, check: &ConvergenceCheck<'_, T>) -> bool {
        let values = check.world.values();
        metrics::sortedness(&values, check.comparator, self.direction) >= self.threshold
    }
}

/// Never converges; the engine stops at its step ceiling.
#[derive(Debug, Default, Clone)]
pub struct MaxStepsOnly;

impl<T> ConvergenceDetector<T> for MaxStepsOnly {
    fn converged(&mut self, _check: &ConvergenceCheck<'_, T>) -> bool {
        false
    }
}
