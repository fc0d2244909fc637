//! Hierarchical cell groups.
//!
//! A group owns a contiguous index range and runs its own worker: detect
//! that the range is sorted, absorb the group to its right, sleep for the
//! phase period, toggle member participation, repeat. Workers coordinate
//! exclusively through the global lock; merges are right-biased so
//! composition order is deterministic.

use std::time::Duration;

use ede_common::{
    Algotype, CellStatus, EngineError, EngineResult, GroupStatus, SortDirection,
};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::cell::{Comparator, Membership};
use crate::world::{CellId, SharedWorld, World, lock_world};

/// Index of a group in the world's group table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl GroupId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Lock-protected group record living in the world's group table.
#[derive(Debug, Clone)]
pub struct GroupCore {
    pub id: GroupId,
    pub left: usize,
    pub right: usize,
    pub status: GroupStatus,
    pub algotype: Algotype,
    pub direction: SortDirection,
    pub phase_period: Duration,
    pub members: Vec<CellId>,
}

fn group_ref<T>(world: &World<T>, id: GroupId) -> EngineResult<&GroupCore> {
    world
        .group(id.index())
        .ok_or_else(|| EngineError::invariant(format!("unknown group {}", id.0)))
}

fn group_mut<T>(world: &mut World<T>, id: GroupId) -> EngineResult<&mut GroupCore> {
    world
        .group_mut(id.index())
        .ok_or_else(|| EngineError::invariant(format!("unknown group {}", id.0)))
}

/// Register a group over `[left, right]`, assigning membership to every
/// cell in the range. Ranges must be in bounds and must not overlap an
/// existing group.
pub(crate) fn register_group<T>(
    world: &mut World<T>,
    left: usize,
    right: usize,
    algotype: Algotype,
    direction: SortDirection,
    phase_period: Duration,
) -> EngineResult<GroupId> {
    if left > right || right >= world.len() {
        return Err(EngineError::config(format!(
            "group range [{left}, {right}] out of bounds for array of {}",
            world.len()
        )));
    }
    for existing in world.groups() {
        if existing.status != GroupStatus::Merged && left <= existing.right && existing.left <= right
        {
            return Err(EngineError::config(format!(
                "group range [{left}, {right}] overlaps group {}",
                existing.id.0
            )));
        }
    }
    let id = GroupId(world.group_count() as u32);
    let members: Vec<CellId> = (left..=right).map(|pos| world.id_at(pos)).collect();
    for member in &members {
        let cell = world.cell_mut(*member);
        cell.set_membership(Membership {
            group: id,
            left,
            right,
        });
        // Prime the sleep/wake toggle: the first phase tick parks the group.
        cell.set_previous_status(CellStatus::Sleep);
    }
    world.push_group(GroupCore {
        id,
        left,
        right,
        status: GroupStatus::Active,
        algotype,
        direction,
        phase_period,
        members,
    });
    Ok(id)
}

/// Sorted-detection over the group's range. Sleeping and moving members are
/// not authoritative and are skipped; the remaining cells must be pairwise
/// in order under the group's direction.
pub(crate) fn is_group_sorted<T>(
    world: &World<T>,
    id: GroupId,
    comparator: &Comparator<T>,
) -> EngineResult<bool> {
    let group = group_ref(world, id)?;
    let mut prev: Option<&T> = None;
    for pos in group.left..=group.right {
        let cell = world.cell_at(pos);
        if matches!(cell.status(), CellStatus::Sleep | CellStatus::Moving) {
            continue;
        }
        if let Some(prev_value) = prev {
            let ord = comparator(prev_value, cell.value());
            let in_order = match group.direction {
                SortDirection::Ascending => ord != std::cmp::Ordering::Greater,
                SortDirection::Descending => ord != std::cmp::Ordering::Less,
            };
            if !in_order {
                return Ok(false);
            }
        }
        prev = Some(cell.value());
    }
    Ok(true)
}

/// The group whose range starts immediately right of `id`, if any.
pub(crate) fn find_next_group<T>(world: &World<T>, id: GroupId) -> EngineResult<Option<GroupId>> {
    let right = group_ref(world, id)?.right;
    Ok(world
        .groups()
        .iter()
        .find(|g| g.left == right + 1)
        .map(|g| g.id))
}

/// True when every member of the group is terminally inactive.
pub(crate) fn all_members_inactive<T>(world: &World<T>, id: GroupId) -> EngineResult<bool> {
    let group = group_ref(world, id)?;
    Ok(group
        .members
        .iter()
        .all(|m| world.cell(*m).status() == CellStatus::Inactive))
}

/// Absorb `next` into `absorber`. Silent no-op unless `next` is Active or
/// Sleep; the ranges must be contiguous. Every cell of the merged range has
/// its boundaries rewritten and its per-algotype merge hook invoked.
pub(crate) fn merge_with_group<T>(
    world: &mut World<T>,
    absorber: GroupId,
    next: GroupId,
) -> EngineResult<()> {
    if absorber == next {
        return Ok(());
    }
    let (a_left, a_right, direction) = {
        let a = group_ref(world, absorber)?;
        (a.left, a.right, a.direction)
    };
    let (n_left, n_right, n_status) = {
        let n = group_ref(world, next)?;
        (n.left, n.right, n.status)
    };
    if !matches!(n_status, GroupStatus::Active | GroupStatus::Sleep) {
        return Ok(());
    }
    if n_left != a_right + 1 {
        return Err(EngineError::invariant(format!(
            "merge of non-contiguous groups: [{a_left}, {a_right}] and [{n_left}, {n_right}]"
        )));
    }

    group_mut(world, absorber)?.status = GroupStatus::Merging;
    group_mut(world, next)?.status = GroupStatus::Merging;

    let (left, right) = (a_left, n_right);
    for pos in left..=right {
        let id = world.id_at(pos);
        let cell = world.cell_mut(id);
        cell.set_membership(Membership {
            group: absorber,
            left,
            right,
        });
        cell.update_for_group_merge(left, right, direction)
            .map_err(|capability| EngineError::capability_missing(pos, capability))?;
    }

    let moved = {
        let n = group_mut(world, next)?;
        n.status = GroupStatus::Merged;
        std::mem::take(&mut n.members)
    };
    let a = group_mut(world, absorber)?;
    a.members.extend(moved);
    a.right = right;
    a.status = GroupStatus::Active;
    debug!(
        absorber = absorber.0,
        merged = next.0,
        left,
        right,
        "group absorbed its right neighbor"
    );
    Ok(())
}

/// Swap every member's status with its previous status; the collective
/// sleep/wake toggle. The group's own status mirrors the cadence.
pub(crate) fn toggle_group_members<T>(world: &mut World<T>, id: GroupId) -> EngineResult<()> {
    let members = group_ref(world, id)?.members.clone();
    for member in members {
        world.cell_mut(member).toggle_status();
    }
    let group = group_mut(world, id)?;
    group.status = match group.status {
        GroupStatus::Active => GroupStatus::Sleep,
        GroupStatus::Sleep => GroupStatus::Active,
        other => other,
    };
    Ok(())
}

/// Outcome of one lock-held pass of a group worker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GroupTick {
    /// Terminal: the group was absorbed or all members are inactive.
    Exit,
    /// This tick absorbed the named right neighbor.
    Absorbed(GroupId),
    Idle,
}

/// Worker handle for one group.
///
/// Construction registers the group in the shared world; `run` executes the
/// worker loop until the group is terminal or the token is cancelled.
pub struct CellGroup<T> {
    id: GroupId,
    world: SharedWorld<T>,
    comparator: Comparator<T>,
    phase_period: Duration,
    cancel: CancelToken,
}

impl<T> CellGroup<T> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: SharedWorld<T>,
        comparator: Comparator<T>,
        left: usize,
        right: usize,
        algotype: Algotype,
        direction: SortDirection,
        phase_period: Duration,
        cancel: CancelToken,
    ) -> EngineResult<Self> {
        let id = {
            let mut guard = lock_world(&world)?;
            register_group(&mut guard, left, right, algotype, direction, phase_period)?
        };
        Ok(Self {
            id,
            world,
            comparator,
            phase_period,
            cancel,
        })
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn world(&self) -> SharedWorld<T> {
        SharedWorld::clone(&self.world)
    }

    pub fn status(&self) -> EngineResult<GroupStatus> {
        let guard = lock_world(&self.world)?;
        Ok(group_ref(&guard, self.id)?.status)
    }

    pub fn bounds(&self) -> EngineResult<(usize, usize)> {
        let guard = lock_world(&self.world)?;
        let g = group_ref(&guard, self.id)?;
        Ok((g.left, g.right))
    }

    /// One lock-held pass: exit checks, then sorted-detection and the
    /// right-biased merge attempt.
    pub fn tick(&self) -> EngineResult<GroupTick> {
        let mut guard = lock_world(&self.world)?;
        let status = group_ref(&guard, self.id)?.status;
        if status == GroupStatus::Merged || all_members_inactive(&guard, self.id)? {
            return Ok(GroupTick::Exit);
        }
        if is_group_sorted(&guard, self.id, &self.comparator)? {
            if let Some(next) = find_next_group(&guard, self.id)? {
                let next_status = group_ref(&guard, next)?.status;
                if matches!(next_status, GroupStatus::Active | GroupStatus::Sleep) {
                    merge_with_group(&mut guard, self.id, next)?;
                    return Ok(GroupTick::Absorbed(next));
                }
            }
        }
        Ok(GroupTick::Idle)
    }

    /// Collective sleep/wake toggle for all members, under the global lock.
    /// A no-op once the group has been absorbed.
    pub fn change_status(&self) -> EngineResult<()> {
        let mut guard = lock_world(&self.world)?;
        if group_ref(&guard, self.id)?.status == GroupStatus::Merged {
            return Ok(());
        }
        toggle_group_members(&mut guard, self.id)
    }

    /// Worker loop: tick, sleep for the phase period, toggle, repeat.
    /// Returns cleanly on terminal status and on cancellation.
    pub fn run(&self) -> EngineResult<()> {
        loop {
            if let GroupTick::Exit = self.tick()? {
                debug!(group = self.id.0, "group worker exiting");
                return Ok(());
            }
            // A cancelled sleep collapses the worker, same as a clean exit.
            if self.cancel.wait_timeout(self.phase_period) {
                debug!(group = self.id.0, "group worker cancelled");
                return Ok(());
            }
            self.change_status()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, natural_comparator};
    use ede_common::Algotype;

    fn grouped_world(values: &[i64], split: usize) -> (World<i64>, GroupId, GroupId) {
        let mut world = World::new(
            values
                .iter()
                .map(|v| Cell::new(*v).with_algotype(Algotype::Bubble))
                .collect(),
        );
        let period = Duration::from_millis(1);
        let a = register_group(
            &mut world,
            0,
            split - 1,
            Algotype::Bubble,
            SortDirection::Ascending,
            period,
        )
        .expect("left group");
        let b = register_group(
            &mut world,
            split,
            values.len() - 1,
            Algotype::Bubble,
            SortDirection::Ascending,
            period,
        )
        .expect("right group");
        (world, a, b)
    }

    #[test]
    fn registration_rejects_overlap_and_out_of_bounds() {
        let mut world = World::new(vec![Cell::new(1), Cell::new(2)]);
        let period = Duration::from_millis(1);
        register_group(
            &mut world,
            0,
            1,
            Algotype::Bubble,
            SortDirection::Ascending,
            period,
        )
        .expect("first group");
        assert!(matches!(
            register_group(
                &mut world,
                1,
                1,
                Algotype::Bubble,
                SortDirection::Ascending,
                period
            ),
            Err(EngineError::ConfigInvalid(_))
        ));
        assert!(matches!(
            register_group(
                &mut world,
                0,
                5,
                Algotype::Bubble,
                SortDirection::Ascending,
                period
            ),
            Err(EngineError::ConfigInvalid(_))
        ));
    }

    #[test]
    fn sorted_detection_skips_sleeping_members() {
        let (mut world, a, _) = grouped_world(&[1, 9, 2, 3], 3);
        let cmp = natural_comparator::<i64>();
        assert!(!is_group_sorted(&world, a, &cmp).expect("group exists"));
        // Put the offending member to sleep; the rest of the range is
        // in order.
        world.cell_at_mut(1).set_status(CellStatus::Sleep);
        assert!(is_group_sorted(&world, a, &cmp).expect("group exists"));
    }

    #[test]
    fn adjacency_is_right_biased() {
        let (world, a, b) = grouped_world(&[1, 2, 3, 4], 2);
        assert_eq!(find_next_group(&world, a).expect("group"), Some(b));
        assert_eq!(find_next_group(&world, b).expect("group"), None);
    }

    #[test]
    fn merge_rewrites_boundaries_and_statuses() {
        let (mut world, a, b) = grouped_world(&[1, 2, 3, 4, 5, 6], 3);
        merge_with_group(&mut world, a, b).expect("contiguous merge");
        let absorber = world.group(a.index()).expect("absorber");
        assert_eq!((absorber.left, absorber.right), (0, 5));
        assert_eq!(absorber.status, GroupStatus::Active);
        assert_eq!(absorber.members.len(), 6);
        assert_eq!(
            world.group(b.index()).expect("merged").status,
            GroupStatus::Merged
        );
        for pos in 0..6 {
            let membership = world.cell_at(pos).membership().expect("assigned");
            assert_eq!(membership.group, a);
            assert_eq!((membership.left, membership.right), (0, 5));
        }
    }

    #[test]
    fn merging_a_merged_group_is_a_silent_no_op() {
        let (mut world, a, b) = grouped_world(&[1, 2, 3, 4], 2);
        merge_with_group(&mut world, a, b).expect("first merge");
        let before = world.group(a.index()).expect("absorber").clone();
        merge_with_group(&mut world, a, b).expect("no-op");
        let after = world.group(a.index()).expect("absorber");
        assert_eq!((before.left, before.right), (after.left, after.right));
    }

    #[test]
    fn toggle_twice_restores_member_statuses() {
        let (mut world, a, _) = grouped_world(&[1, 2, 3, 4], 2);
        world.cell_at_mut(0).set_status(CellStatus::Sleep);
        let before: Vec<CellStatus> = (0..2).map(|p| world.status_at(p)).collect();
        toggle_group_members(&mut world, a).expect("group");
        toggle_group_members(&mut world, a).expect("group");
        let after: Vec<CellStatus> = (0..2).map(|p| world.status_at(p)).collect();
        assert_eq!(before, after);
    }
}
