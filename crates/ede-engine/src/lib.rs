//! Emergent-sorting simulation core.
//!
//! Cells are autonomous agents with a local sorting policy; global order
//! arises from local pairwise swaps. The crate is the substrate for
//! experiments quantifying convergence, delayed gratification, and emergent
//! clustering in chimeric populations.

pub mod cancel;
pub mod cell;
pub mod config;
pub mod convergence;
pub mod coordinator;
pub mod engine;
pub mod frozen;
pub mod group;
pub mod metrics;
pub mod population;
pub mod probe;
pub mod rng;
pub mod swap;
pub mod topology;
pub mod world;

pub use ede_common::{
    Algotype, Capability, CellStatus, EngineError, EngineResult, FrozenKind, GroupStatus,
    SortDirection,
};

pub use cancel::CancelToken;
pub use cell::{Capabilities, Cell, Comparator, Membership, natural_comparator};
pub use config::{ExecutionMode, ExperimentConfig};
pub use convergence::{
    ConvergenceCheck, ConvergenceDetector, MaxStepsOnly, NoSwapConvergence, SortednessConvergence,
};
pub use coordinator::{
    ExperimentAggregate, ExperimentCoordinator, ExperimentResult, MetricSummary, TrialMetrics,
    TrialResult, ValueFactory, shuffled_value_factory,
};
pub use engine::{EngineOptions, ExecutionEngine};
pub use frozen::FrozenState;
pub use group::{CellGroup, GroupId, GroupTick};
pub use population::{ChimericPopulation, DirectionStrategy};
pub use probe::{CellRecord, CounterSnapshot, Counters, Probe, StepSnapshot};
pub use swap::{SwapEngine, SwapOutcome};
pub use topology::{AdjacentTopology, Neighbors, ShuffledTopology, Topology};
pub use world::{CellId, SharedWorld, World, lock_world};

#[cfg(test)]
mod tests;
