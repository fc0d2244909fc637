//! Examination counting policies.

use ede_common::{Algotype, SortDirection};

use super::common::{engine_with, uniform_cells};
use crate::engine::EngineOptions;

#[test]
fn default_policy_counts_short_circuited_examinations() {
    let mut engine = engine_with(
        uniform_cells(&[2, 1, 3], Algotype::Bubble, SortDirection::Ascending),
        None,
        EngineOptions::default(),
    );
    engine.step().expect("step");
    // Adjacent candidates per position: 1 + 2 + 1, counted whether or not
    // the bubble gate (j == i + 1) passes.
    assert_eq!(engine.probe().counter_values().compare_and_swaps, 4);
}

#[test]
fn strict_policy_counts_only_value_comparisons() {
    let mut engine = engine_with(
        uniform_cells(&[2, 1, 3], Algotype::Bubble, SortDirection::Ascending),
        None,
        EngineOptions::default().with_count_short_circuit_examinations(false),
    );
    engine.step().expect("step");
    // Only the two right-neighbor examinations reach a comparison.
    assert_eq!(engine.probe().counter_values().compare_and_swaps, 2);
}

#[test]
fn swaps_never_exceed_examinations_under_either_policy() {
    for strict in [false, true] {
        let mut engine = engine_with(
            uniform_cells(&[4, 3, 2, 1], Algotype::Bubble, SortDirection::Ascending),
            None,
            EngineOptions::default().with_count_short_circuit_examinations(!strict),
        );
        engine.run_until_convergence(1_000).expect("run");
        let counters = engine.probe().counter_values();
        assert!(counters.swaps <= counters.compare_and_swaps);
    }
}
