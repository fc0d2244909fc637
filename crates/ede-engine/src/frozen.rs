//! Per-index freeze discipline.
//!
//! `FrozenState` maps each array index to a `FrozenKind` and gates
//! displacement in the swap engine. Kinds only ever move upward
//! (`None → Movable → Immovable`); a landmark never thaws during a run.

use ede_common::FrozenKind;

#[derive(Debug, Clone)]
pub struct FrozenState {
    kinds: Vec<FrozenKind>,
}

impl FrozenState {
    /// All indices unfrozen.
    pub fn new(len: usize) -> Self {
        Self {
            kinds: vec![FrozenKind::None; len],
        }
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Kind at `index`; out-of-range indices read as unfrozen.
    pub fn kind(&self, index: usize) -> FrozenKind {
        self.kinds.get(index).copied().unwrap_or(FrozenKind::None)
    }

    /// May the cell at `index` initiate a move? True unless `Immovable`.
    pub fn can_initiate_move(&self, index: usize) -> bool {
        self.kind(index) != FrozenKind::Immovable
    }

    /// May the cell at `index` be displaced by another? True only if `None`.
    pub fn can_be_displaced(&self, index: usize) -> bool {
        self.kind(index) == FrozenKind::None
    }

    /// Apply `kind` at `index` if it is an upgrade; returns whether the
    /// stored kind changed. Downgrades are ignored, keeping the freeze
    /// monotonic for the run.
    pub fn freeze(&mut self, index: usize, kind: FrozenKind) -> bool {
        match self.kinds.get_mut(index) {
            Some(slot) if kind > *slot => {
                *slot = kind;
                true
            }
            _ => false,
        }
    }

    /// Indices carrying any freeze kind, in order.
    pub fn frozen_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.kinds
            .iter()
            .enumerate()
            .filter(|(_, k)| **k != FrozenKind::None)
            .map(|(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_permits_everything() {
        let f = FrozenState::new(4);
        assert!(f.can_initiate_move(2));
        assert!(f.can_be_displaced(2));
        assert_eq!(f.frozen_indices().count(), 0);
    }

    #[test]
    fn movable_blocks_displacement_only() {
        let mut f = FrozenState::new(4);
        assert!(f.freeze(1, FrozenKind::Movable));
        assert!(f.can_initiate_move(1));
        assert!(!f.can_be_displaced(1));
    }

    #[test]
    fn immovable_blocks_both() {
        let mut f = FrozenState::new(4);
        f.freeze(3, FrozenKind::Immovable);
        assert!(!f.can_initiate_move(3));
        assert!(!f.can_be_displaced(3));
    }

    #[test]
    fn downgrades_are_ignored() {
        let mut f = FrozenState::new(2);
        f.freeze(0, FrozenKind::Immovable);
        assert!(!f.freeze(0, FrozenKind::Movable));
        assert!(!f.freeze(0, FrozenKind::None));
        assert_eq!(f.kind(0), FrozenKind::Immovable);
    }

    #[test]
    fn out_of_range_reads_as_unfrozen() {
        let f = FrozenState::new(1);
        assert_eq!(f.kind(9), FrozenKind::None);
        assert!(f.can_be_displaced(9));
    }
}
