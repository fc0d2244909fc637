//! Cooperative cancellation at every level.

use std::time::Duration;

use ede_common::{Algotype, EngineError, SortDirection};

use crate::cancel::CancelToken;
use crate::cell::{Cell, natural_comparator};
use crate::config::ExperimentConfig;
use crate::convergence::NoSwapConvergence;
use crate::coordinator::{ExperimentCoordinator, shuffled_value_factory};
use crate::engine::{EngineOptions, ExecutionEngine};
use crate::frozen::FrozenState;
use crate::probe::Probe;
use crate::swap::SwapEngine;
use crate::topology::AdjacentTopology;
use crate::world::World;

fn small_engine(cancel: CancelToken) -> ExecutionEngine<i64> {
    let cells: Vec<Cell<i64>> = [3, 1, 2]
        .iter()
        .map(|v| {
            Cell::new(*v)
                .with_algotype(Algotype::Bubble)
                .with_direction(SortDirection::Ascending)
        })
        .collect();
    ExecutionEngine::new(
        World::new(cells).into_shared(),
        Box::new(AdjacentTopology),
        SwapEngine::new(FrozenState::new(3)),
        Probe::new(false),
        Box::new(NoSwapConvergence::default()),
        natural_comparator::<i64>(),
        EngineOptions::default(),
    )
    .expect("engine construction")
    .with_cancel_token(cancel)
}

#[test]
fn cancelled_engine_stops_at_the_step_boundary() {
    let cancel = CancelToken::new();
    let mut engine = small_engine(cancel.clone());
    cancel.cancel();
    assert!(matches!(engine.step(), Err(EngineError::Interrupted)));
    assert!(matches!(
        engine.run_until_convergence(100),
        Err(EngineError::Interrupted)
    ));
    // No step was taken past the boundary.
    assert_eq!(engine.steps_taken(), 0);
}

#[test]
fn cancelled_coordinator_surfaces_interrupted_after_cleanup() {
    let coordinator = ExperimentCoordinator::new(
        ExperimentConfig::new()
            .with_array_size(16)
            .with_num_repetitions(4),
        shuffled_value_factory(),
        natural_comparator::<i64>(),
    )
    .expect("valid config");
    coordinator.cancel_token().cancel();
    assert!(matches!(
        coordinator.run(),
        Err(EngineError::Interrupted)
    ));
}

#[test]
fn mid_run_cancellation_interrupts_a_long_experiment() {
    let coordinator = ExperimentCoordinator::new(
        ExperimentConfig::new()
            .with_array_size(64)
            .with_max_steps(100_000)
            .with_num_repetitions(5_000)
            .with_seed(1),
        shuffled_value_factory(),
        natural_comparator::<i64>(),
    )
    .expect("valid config");
    let cancel = coordinator.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        cancel.cancel();
    });
    let result = coordinator.run();
    canceller.join().expect("canceller thread");
    assert!(matches!(result, Err(EngineError::Interrupted)));
}
