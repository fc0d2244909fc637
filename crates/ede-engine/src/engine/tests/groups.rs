//! Group workers over a shared world.

use std::time::Duration;

use ede_common::{Algotype, CellStatus, GroupStatus, SortDirection};

use super::common::uniform_cells;
use crate::cancel::CancelToken;
use crate::cell::natural_comparator;
use crate::group::{CellGroup, GroupTick};
use crate::world::{World, lock_world};

fn group_over(
    world: crate::world::SharedWorld<i64>,
    left: usize,
    right: usize,
    cancel: CancelToken,
    phase_period: Duration,
) -> CellGroup<i64> {
    CellGroup::new(
        world,
        natural_comparator::<i64>(),
        left,
        right,
        Algotype::Bubble,
        SortDirection::Ascending,
        phase_period,
        cancel,
    )
    .expect("group construction")
}

fn two_sorted_groups() -> (CellGroup<i64>, CellGroup<i64>) {
    let world = World::new(uniform_cells(
        &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        Algotype::Bubble,
        SortDirection::Ascending,
    ))
    .into_shared();
    let cancel = CancelToken::new();
    let period = Duration::from_millis(1);
    let left = group_over(world.clone(), 0, 4, cancel.clone(), period);
    let right = group_over(world, 5, 9, cancel, period);
    (left, right)
}

#[test]
fn one_tick_absorbs_the_sorted_right_neighbor() {
    let (left, right) = two_sorted_groups();
    assert_eq!(left.tick().expect("tick"), GroupTick::Absorbed(right.id()));
    assert_eq!(left.bounds().expect("bounds"), (0, 9));
    assert_eq!(left.status().expect("status"), GroupStatus::Active);
    assert_eq!(right.status().expect("status"), GroupStatus::Merged);
}

#[test]
fn merged_members_carry_the_union_boundaries() {
    let (left, right) = two_sorted_groups();
    left.tick().expect("tick");
    let world = left.world();
    {
        let guard = lock_world(&world).expect("lock");
        for pos in 0..10 {
            let membership = guard.cell_at(pos).membership().expect("assigned");
            assert_eq!(membership.group, left.id());
            assert_eq!((membership.left, membership.right), (0, 9));
        }
    }
    // The absorbed worker observes its terminal state on its next tick.
    assert_eq!(right.tick().expect("tick"), GroupTick::Exit);
    right.run().expect("absorbed worker exits immediately");
}

#[test]
fn unsorted_group_does_not_merge() {
    let world = World::new(uniform_cells(
        &[5, 1, 2, 3],
        Algotype::Bubble,
        SortDirection::Ascending,
    ))
    .into_shared();
    let cancel = CancelToken::new();
    let period = Duration::from_millis(1);
    let left = group_over(world.clone(), 0, 1, cancel.clone(), period);
    let _right = group_over(world, 2, 3, cancel, period);
    assert_eq!(left.tick().expect("tick"), GroupTick::Idle);
    assert_eq!(left.bounds().expect("bounds"), (0, 1));
}

#[test]
fn change_status_toggles_collectively_and_round_trips() {
    let world = World::new(uniform_cells(
        &[1, 2, 3],
        Algotype::Bubble,
        SortDirection::Ascending,
    ))
    .into_shared();
    let group = group_over(
        world.clone(),
        0,
        2,
        CancelToken::new(),
        Duration::from_millis(1),
    );

    // Members are primed so the first toggle parks the whole group.
    group.change_status().expect("toggle");
    {
        let guard = lock_world(&world).expect("lock");
        for pos in 0..3 {
            assert_eq!(guard.cell_at(pos).status(), CellStatus::Sleep);
        }
    }
    assert_eq!(group.status().expect("status"), GroupStatus::Sleep);

    group.change_status().expect("toggle back");
    {
        let guard = lock_world(&world).expect("lock");
        for pos in 0..3 {
            assert_eq!(guard.cell_at(pos).status(), CellStatus::Active);
        }
    }
    assert_eq!(group.status().expect("status"), GroupStatus::Active);
}

#[test]
fn worker_exits_when_all_members_are_inactive() {
    let world = World::new(uniform_cells(
        &[2, 1],
        Algotype::Bubble,
        SortDirection::Ascending,
    ))
    .into_shared();
    let group = group_over(
        world.clone(),
        0,
        1,
        CancelToken::new(),
        Duration::from_millis(1),
    );
    {
        let mut guard = lock_world(&world).expect("lock");
        for pos in 0..2 {
            guard.cell_at_mut(pos).set_status(CellStatus::Inactive);
        }
    }
    assert_eq!(group.tick().expect("tick"), GroupTick::Exit);
    group.run().expect("run observes the terminal condition");
}

#[test]
fn cancellation_wakes_a_sleeping_worker() {
    // An unsorted singleton-neighborless group would loop forever on a long
    // phase period; cancellation must collapse it promptly.
    let world = World::new(uniform_cells(
        &[9, 1],
        Algotype::Bubble,
        SortDirection::Ascending,
    ))
    .into_shared();
    let cancel = CancelToken::new();
    let group = group_over(world, 0, 1, cancel.clone(), Duration::from_secs(60));

    let handle = std::thread::spawn(move || group.run());
    std::thread::sleep(Duration::from_millis(20));
    cancel.cancel();
    handle
        .join()
        .expect("worker thread did not panic")
        .expect("worker collapsed cleanly");
}
