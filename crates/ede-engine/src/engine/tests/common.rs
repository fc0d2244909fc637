//! Shared scaffolding for engine tests.

use ede_common::{Algotype, SortDirection};

use crate::cell::{Cell, natural_comparator};
use crate::convergence::NoSwapConvergence;
use crate::engine::{EngineOptions, ExecutionEngine};
use crate::frozen::FrozenState;
use crate::probe::Probe;
use crate::swap::SwapEngine;
use crate::topology::AdjacentTopology;
use crate::world::World;

pub fn uniform_cells(
    values: &[i64],
    algotype: Algotype,
    direction: SortDirection,
) -> Vec<Cell<i64>> {
    values
        .iter()
        .map(|v| Cell::new(*v).with_algotype(algotype).with_direction(direction))
        .collect()
}

pub fn engine_over(cells: Vec<Cell<i64>>) -> ExecutionEngine<i64> {
    engine_with(cells, None, EngineOptions::default())
}

pub fn engine_with(
    cells: Vec<Cell<i64>>,
    frozen: Option<FrozenState>,
    options: EngineOptions,
) -> ExecutionEngine<i64> {
    let n = cells.len();
    ExecutionEngine::new(
        World::new(cells).into_shared(),
        Box::new(AdjacentTopology),
        SwapEngine::new(frozen.unwrap_or_else(|| FrozenState::new(n))),
        Probe::new(true),
        Box::new(NoSwapConvergence::default()),
        natural_comparator::<i64>(),
        options,
    )
    .expect("engine construction")
}

pub fn sorted_copy(values: &[i64]) -> Vec<i64> {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted
}
