//! Pairwise swap arbitration.
//!
//! All position changes flow through `SwapEngine::attempt_swap`; nothing
//! else reorders the array. The engine applies the frozen-index discipline
//! and the freeze-status pin, then exchanges the two arena ids atomically
//! from the caller's perspective (in parallel regimes the caller already
//! holds the global lock).

use ede_common::CellStatus;

use crate::frozen::FrozenState;
use crate::world::World;

/// Outcome of one swap attempt. `RejectedFrozen` is instrumentation, not an
/// error.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SwapOutcome {
    Swapped,
    RejectedFrozen,
    RejectedSame,
}

pub struct SwapEngine {
    frozen: FrozenState,
}

impl SwapEngine {
    pub fn new(frozen: FrozenState) -> Self {
        Self { frozen }
    }

    pub fn frozen(&self) -> &FrozenState {
        &self.frozen
    }

    /// Frozen kinds are only mutated between runs, by a single domain agent.
    pub fn frozen_mut(&mut self) -> &mut FrozenState {
        &mut self.frozen
    }

    /// Attempt to exchange the cells at positions `i` (initiator) and `j`
    /// (target).
    pub fn attempt_swap<T>(&self, world: &mut World<T>, i: usize, j: usize) -> SwapOutcome {
        debug_assert!(i < world.len() && j < world.len());
        if i == j {
            return SwapOutcome::RejectedSame;
        }
        // Initiator: immovable indices and freeze-pinned cells never move.
        if !self.frozen.can_initiate_move(i) || world.status_at(i) == CellStatus::Freeze {
            return SwapOutcome::RejectedFrozen;
        }
        // Target: any freeze kind blocks displacement, as does a freeze pin.
        if !self.frozen.can_be_displaced(j) || world.status_at(j) == CellStatus::Freeze {
            return SwapOutcome::RejectedFrozen;
        }
        world.swap_positions(i, j);
        SwapOutcome::Swapped
    }
}
