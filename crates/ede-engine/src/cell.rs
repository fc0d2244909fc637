//! Cells: opaque value carriers with optional capability facets.
//!
//! The engine is polymorphic over the facet set `{value, algotype,
//! direction, membership, selection-state, insertion-state}` — tagged
//! optional state rather than an inheritance hierarchy. A cell provides
//! whichever facets its algotype and role require; the dispatch table
//! `Capabilities::required_for` says which those are, and absent facets
//! surface as `CapabilityMissing` at engine construction.

use std::cmp::Ordering;
use std::sync::Arc;

use bitflags::bitflags;
use ede_common::{Algotype, Capability, CellStatus, SortDirection};

use crate::group::GroupId;

/// User-supplied total order over cell values. The core never assumes a
/// numeric type; it only asks for a sign.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Comparator over any `Ord` value.
pub fn natural_comparator<T: Ord + Send + Sync + 'static>() -> Comparator<T> {
    Arc::new(|a: &T, b: &T| a.cmp(b))
}

bitflags! {
    /// Facets a cell provides.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Capabilities: u8 {
        const VALUE           = 1 << 0;
        const ALGOTYPE        = 1 << 1;
        const DIRECTION       = 1 << 2;
        const MEMBERSHIP      = 1 << 3;
        const SELECTION_STATE = 1 << 4;
        const INSERTION_STATE = 1 << 5;
    }
}

impl Capabilities {
    /// Facets an algotype needs before the engine will drive it.
    ///
    /// Direction is listed for every algotype but may be satisfied by an
    /// engine-wide override instead of a per-cell facet.
    pub fn required_for(algotype: Algotype) -> Self {
        let base = Self::VALUE | Self::ALGOTYPE | Self::DIRECTION;
        match algotype {
            Algotype::Bubble => base,
            Algotype::Insertion => base | Self::INSERTION_STATE,
            Algotype::Selection => base | Self::SELECTION_STATE,
        }
    }
}

/// Group back-reference plus the boundary indices the cell believes in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Membership {
    pub group: GroupId,
    pub left: usize,
    pub right: usize,
}

/// Selection-cell state: the index the cell currently targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SelectionState {
    pub ideal_pos: usize,
}

/// Insertion-cell state under group merging.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InsertionState {
    pub enable_to_move: bool,
}

/// An autonomous array element.
///
/// Value, algotype and direction are immutable once assigned; status,
/// position and the per-algotype scratch state mutate under the engine's
/// invariants.
#[derive(Debug, Clone)]
pub struct Cell<T> {
    value: T,
    algotype: Option<Algotype>,
    direction: Option<SortDirection>,
    membership: Option<Membership>,
    selection: Option<SelectionState>,
    insertion: Option<InsertionState>,
    status: CellStatus,
    previous_status: CellStatus,
}

impl<T> Cell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            algotype: None,
            direction: None,
            membership: None,
            selection: None,
            insertion: None,
            status: CellStatus::Active,
            previous_status: CellStatus::Active,
        }
    }

    pub fn with_algotype(mut self, algotype: Algotype) -> Self {
        self.algotype = Some(algotype);
        // Selection and insertion cells get their scratch state alongside
        // the algotype unless the caller already provided it.
        match algotype {
            Algotype::Selection if self.selection.is_none() => {
                self.selection = Some(SelectionState { ideal_pos: 0 });
            }
            Algotype::Insertion if self.insertion.is_none() => {
                self.insertion = Some(InsertionState {
                    enable_to_move: true,
                });
            }
            _ => {}
        }
        self
    }

    pub fn with_direction(mut self, direction: SortDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn with_status(mut self, status: CellStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_selection_state(mut self, ideal_pos: usize) -> Self {
        self.selection = Some(SelectionState { ideal_pos });
        self
    }

    pub fn with_insertion_state(mut self, enable_to_move: bool) -> Self {
        self.insertion = Some(InsertionState { enable_to_move });
        self
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn algotype(&self) -> Option<Algotype> {
        self.algotype
    }

    pub fn direction(&self) -> Option<SortDirection> {
        self.direction
    }

    pub fn membership(&self) -> Option<Membership> {
        self.membership
    }

    pub fn ideal_pos(&self) -> Option<usize> {
        self.selection.map(|s| s.ideal_pos)
    }

    /// Insertion cells without the facet are free to move.
    pub fn enable_to_move(&self) -> bool {
        self.insertion.map(|s| s.enable_to_move).unwrap_or(true)
    }

    pub fn status(&self) -> CellStatus {
        self.status
    }

    pub fn previous_status(&self) -> CellStatus {
        self.previous_status
    }

    pub fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::VALUE;
        if self.algotype.is_some() {
            caps |= Capabilities::ALGOTYPE;
        }
        if self.direction.is_some() {
            caps |= Capabilities::DIRECTION;
        }
        if self.membership.is_some() {
            caps |= Capabilities::MEMBERSHIP;
        }
        if self.selection.is_some() {
            caps |= Capabilities::SELECTION_STATE;
        }
        if self.insertion.is_some() {
            caps |= Capabilities::INSERTION_STATE;
        }
        caps
    }

    /// Record a new status, remembering the one it replaces.
    pub fn set_status(&mut self, status: CellStatus) {
        self.previous_status = self.status;
        self.status = status;
    }

    /// Swap current and previous status; the group sleep/wake toggle.
    /// Inactive is terminal and Freeze is pinned, so neither participates.
    pub fn toggle_status(&mut self) {
        if matches!(self.status, CellStatus::Inactive | CellStatus::Freeze) {
            return;
        }
        std::mem::swap(&mut self.status, &mut self.previous_status);
    }

    pub(crate) fn set_membership(&mut self, membership: Membership) {
        self.membership = Some(membership);
    }

    /// Seed the toggle target without touching the current status; group
    /// registration primes members with Sleep so the first phase tick parks
    /// the whole group.
    pub(crate) fn set_previous_status(&mut self, status: CellStatus) {
        self.previous_status = status;
    }

    pub(crate) fn set_ideal_pos(&mut self, ideal_pos: usize) {
        if let Some(sel) = &mut self.selection {
            sel.ideal_pos = ideal_pos;
        }
    }

    /// Reinitialize per-algotype scratch state for the boundaries
    /// `[left, right]` under `direction`. Selection cells re-aim at the
    /// direction's starting boundary; others are untouched.
    pub fn update_for_boundary(&mut self, left: usize, right: usize, direction: SortDirection) {
        if self.algotype == Some(Algotype::Selection) {
            let target = match direction {
                SortDirection::Ascending => left,
                SortDirection::Descending => right,
            };
            self.selection = Some(SelectionState { ideal_pos: target });
        }
    }

    /// Per-algotype hook invoked when the cell's group absorbs or is
    /// absorbed. Returns the missing capability when the required scratch
    /// state is absent.
    pub fn update_for_group_merge(
        &mut self,
        left: usize,
        right: usize,
        direction: SortDirection,
    ) -> Result<(), Capability> {
        match self.algotype {
            Some(Algotype::Selection) => {
                if self.selection.is_none() {
                    return Err(Capability::SelectionState);
                }
                self.update_for_boundary(left, right, direction);
                Ok(())
            }
            Some(Algotype::Insertion) => match &mut self.insertion {
                // Parked so the absorbed sorted prefix is not disturbed.
                Some(state) => {
                    state.enable_to_move = false;
                    Ok(())
                }
                None => Err(Capability::InsertionState),
            },
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_attaches_scratch_state_per_algotype() {
        let sel = Cell::new(5i64).with_algotype(Algotype::Selection);
        assert!(sel.capabilities().contains(Capabilities::SELECTION_STATE));
        let ins = Cell::new(5i64).with_algotype(Algotype::Insertion);
        assert!(ins.capabilities().contains(Capabilities::INSERTION_STATE));
        let bub = Cell::new(5i64).with_algotype(Algotype::Bubble);
        assert!(!bub.capabilities().contains(Capabilities::SELECTION_STATE));
    }

    #[test]
    fn required_capabilities_cover_the_dispatch_table() {
        assert!(Capabilities::required_for(Algotype::Selection).contains(
            Capabilities::SELECTION_STATE
        ));
        assert!(
            Capabilities::required_for(Algotype::Insertion)
                .contains(Capabilities::INSERTION_STATE)
        );
        assert_eq!(
            Capabilities::required_for(Algotype::Bubble),
            Capabilities::VALUE | Capabilities::ALGOTYPE | Capabilities::DIRECTION
        );
    }

    #[test]
    fn toggle_status_restores_after_two_flips() {
        let mut cell = Cell::new(1).with_algotype(Algotype::Bubble);
        cell.set_status(CellStatus::Sleep);
        assert_eq!(cell.status(), CellStatus::Sleep);
        assert_eq!(cell.previous_status(), CellStatus::Active);
        cell.toggle_status();
        cell.toggle_status();
        assert_eq!(cell.status(), CellStatus::Sleep);
    }

    #[test]
    fn terminal_and_pinned_statuses_resist_the_toggle() {
        let mut inactive = Cell::new(1).with_algotype(Algotype::Bubble);
        inactive.set_status(CellStatus::Inactive);
        inactive.toggle_status();
        assert_eq!(inactive.status(), CellStatus::Inactive);

        let mut frozen = Cell::new(1).with_status(CellStatus::Freeze);
        frozen.toggle_status();
        assert_eq!(frozen.status(), CellStatus::Freeze);
    }

    #[test]
    fn boundary_update_aims_selection_at_direction_start() {
        let mut cell = Cell::new(1).with_algotype(Algotype::Selection);
        cell.update_for_boundary(2, 9, SortDirection::Ascending);
        assert_eq!(cell.ideal_pos(), Some(2));
        cell.update_for_boundary(2, 9, SortDirection::Descending);
        assert_eq!(cell.ideal_pos(), Some(9));
    }

    #[test]
    fn merge_hook_parks_insertion_cells() {
        let mut cell = Cell::new(1).with_algotype(Algotype::Insertion);
        assert!(cell.enable_to_move());
        cell.update_for_group_merge(0, 9, SortDirection::Ascending)
            .expect("insertion state present");
        assert!(!cell.enable_to_move());
    }

    #[test]
    fn merge_hook_reports_missing_scratch_state() {
        let mut cell = Cell::new(1);
        cell.algotype = Some(Algotype::Insertion);
        cell.insertion = None;
        assert_eq!(
            cell.update_for_group_merge(0, 1, SortDirection::Ascending),
            Err(Capability::InsertionState)
        );
    }
}
