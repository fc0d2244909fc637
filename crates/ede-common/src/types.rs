//! Core vocabulary shared by the engine and its collaborators.
//!
//! Everything here is a small, copyable tag. The engine never inspects what
//! a cell *means*; these types only describe how a cell behaves (its move
//! rule, its direction, its participation status) and how an index is
//! pinned.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The move rule a cell follows. Closed set; immutable per cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Algotype {
    Bubble,
    Insertion,
    Selection,
}

impl Algotype {
    /// Stable lowercase label used in probe records and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bubble => "bubble",
            Self::Insertion => "insertion",
            Self::Selection => "selection",
        }
    }

    /// All algotypes in canonical order.
    pub const ALL: [Algotype; 3] = [Self::Bubble, Self::Insertion, Self::Selection];
}

impl fmt::Display for Algotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per-cell sort direction. Immutable per cell; a population may mix both.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn reversed(&self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

/// Participation status of a cell.
///
/// `Active` cells evaluate moves; `Sleep` cells are paused by their group;
/// `Moving`/`Merge` are transient markers set by domain agents during
/// multi-phase operations; `Inactive` is terminal; `Freeze` pins the cell as
/// a sortedness landmark — its index never changes again.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellStatus {
    #[default]
    Active,
    Sleep,
    Merge,
    Moving,
    Inactive,
    Error,
    Freeze,
}

/// Per-index freeze kind.
///
/// Ordered so that upgrades (`None → Movable → Immovable`) compare greater;
/// `FrozenState` only ever moves a kind upward.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrozenKind {
    /// Not frozen; may move and be displaced.
    #[default]
    None,
    /// May initiate its own moves but cannot be displaced by others.
    Movable,
    /// May neither move nor be displaced.
    Immovable,
}

/// Lifecycle status of a cell group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupStatus {
    #[default]
    Active,
    Merging,
    Sleep,
    /// Absorbed by a neighbor; terminal.
    Merged,
}

/// Capability facets a cell may provide.
///
/// A cell needs whichever facets its algotype and role require; asking for
/// an absent facet is a `CapabilityMissing` error, never a panic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Capability {
    Value,
    Algotype,
    Direction,
    Membership,
    SelectionState,
    InsertionState,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Value => "value",
            Self::Algotype => "algotype",
            Self::Direction => "direction",
            Self::Membership => "membership",
            Self::SelectionState => "selection-state",
            Self::InsertionState => "insertion-state",
        })
    }
}
