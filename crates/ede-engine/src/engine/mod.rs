//! The execution engine.
//!
//! Drives the array to convergence by repeatedly asking each active cell
//! whether it wishes to swap with a candidate partner under its algotype's
//! move rule. One step visits every position once in the topology's
//! iteration order; the probe snapshots after each step; termination is
//! delegated to the convergence detector.

use std::cmp::Ordering;

use ede_common::{
    Algotype, Capability, CellStatus, EngineError, EngineResult, FrozenKind, SortDirection,
};
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::cell::{Capabilities, Comparator};
use crate::convergence::{ConvergenceCheck, ConvergenceDetector};
use crate::frozen::FrozenState;
use crate::probe::{CellRecord, Probe, StepSnapshot};
use crate::swap::{SwapEngine, SwapOutcome};
use crate::topology::Topology;
use crate::world::{SharedWorld, World, lock_world};

#[cfg(test)]
mod tests;

/// Engine-level knobs.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Force every cell to this direction instead of its own facet.
    pub direction_override: Option<SortDirection>,
    /// When true (the default), `compare_and_swap_count` counts every
    /// (i, j) examination, including ones an algotype gate short-circuits
    /// before any value comparison. When false, only examinations that
    /// reach a value comparison are counted.
    pub count_short_circuit_examinations: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            direction_override: None,
            count_short_circuit_examinations: true,
        }
    }
}

impl EngineOptions {
    pub fn with_direction_override(mut self, direction: SortDirection) -> Self {
        self.direction_override = Some(direction);
        self
    }

    pub fn with_count_short_circuit_examinations(mut self, enable: bool) -> Self {
        self.count_short_circuit_examinations = enable;
        self
    }
}

/// `out_of_order(first, second)` over a spatially ordered pair.
fn out_of_order(ord: Ordering, direction: SortDirection) -> bool {
    match direction {
        SortDirection::Ascending => ord == Ordering::Greater,
        SortDirection::Descending => ord == Ordering::Less,
    }
}

/// Is the prefix `[0, i)` monotonic under `direction`? Frozen indices reset
/// the chain to the permissive sentinel rather than participating in it.
fn prefix_sorted<T>(
    world: &World<T>,
    frozen: &FrozenState,
    comparator: &Comparator<T>,
    i: usize,
    direction: SortDirection,
) -> bool {
    let mut prev: Option<&T> = None;
    for k in 0..i {
        let cell = world.cell_at(k);
        if frozen.kind(k) != FrozenKind::None || cell.status() == CellStatus::Freeze {
            prev = None;
            continue;
        }
        let value = cell.value();
        if let Some(prev_value) = prev {
            if out_of_order(comparator(prev_value, value), direction) {
                return false;
            }
        }
        prev = Some(value);
    }
    true
}

fn snapshot_world<T: Clone>(
    world: &World<T>,
    frozen: &FrozenState,
    step: u64,
    swaps_this_step: u64,
) -> StepSnapshot<T> {
    let n = world.len();
    let mut values = Vec::with_capacity(n);
    let mut records = Vec::with_capacity(n);
    for pos in 0..n {
        let cell = world.cell_at(pos);
        let value = cell.value().clone();
        values.push(value.clone());
        records.push(CellRecord {
            group: cell.membership().map(|m| m.group),
            algotype: cell.algotype(),
            value,
            frozen: frozen.kind(pos) != FrozenKind::None || cell.status() == CellStatus::Freeze,
        });
    }
    StepSnapshot {
        step,
        values,
        records,
        swaps_this_step,
    }
}

pub struct ExecutionEngine<T> {
    world: SharedWorld<T>,
    topology: Box<dyn Topology>,
    swap: SwapEngine,
    probe: Probe<T>,
    detector: Box<dyn ConvergenceDetector<T>>,
    comparator: Comparator<T>,
    options: EngineOptions,
    cancel: CancelToken,
    /// Immutable per-cell facts cached by arena id; membership boundaries
    /// stay live because merges rewrite them mid-run.
    algotypes: Vec<Algotype>,
    directions: Vec<SortDirection>,
    step_count: u64,
    last_swap_step: u64,
    converged: bool,
}

impl<T> std::fmt::Debug for ExecutionEngine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("step_count", &self.step_count)
            .field("last_swap_step", &self.last_swap_step)
            .field("converged", &self.converged)
            .finish_non_exhaustive()
    }
}

impl<T: Clone> ExecutionEngine<T> {
    /// Build an engine over a shared world.
    ///
    /// Capabilities are validated here, for every cell against its
    /// algotype, so a malformed population fails before stepping starts.
    /// Selection targets are initialized to the direction boundary.
    pub fn new(
        world: SharedWorld<T>,
        topology: Box<dyn Topology>,
        swap: SwapEngine,
        probe: Probe<T>,
        detector: Box<dyn ConvergenceDetector<T>>,
        comparator: Comparator<T>,
        options: EngineOptions,
    ) -> EngineResult<Self> {
        let (algotypes, directions) = {
            let mut guard = lock_world(&world)?;
            let n = guard.len();
            let mut algotypes = vec![Algotype::Bubble; n];
            let mut directions = vec![SortDirection::Ascending; n];
            for pos in 0..n {
                let id = guard.id_at(pos);
                let cell = guard.cell(id);
                let algotype = cell
                    .algotype()
                    .ok_or_else(|| EngineError::capability_missing(pos, Capability::Algotype))?;
                let direction = match options.direction_override {
                    Some(forced) => forced,
                    None => cell.direction().ok_or_else(|| {
                        EngineError::capability_missing(pos, Capability::Direction)
                    })?,
                };
                match algotype {
                    Algotype::Selection if cell.ideal_pos().is_none() => {
                        return Err(EngineError::capability_missing(
                            pos,
                            Capability::SelectionState,
                        ));
                    }
                    Algotype::Insertion
                        if !cell.capabilities().contains(Capabilities::INSERTION_STATE) =>
                    {
                        return Err(EngineError::capability_missing(
                            pos,
                            Capability::InsertionState,
                        ));
                    }
                    _ => {}
                }
                algotypes[id.index()] = algotype;
                directions[id.index()] = direction;
            }
            for pos in 0..n {
                let id = guard.id_at(pos);
                let direction = directions[id.index()];
                let (left, right) = guard
                    .cell(id)
                    .membership()
                    .map(|m| (m.left, m.right))
                    .unwrap_or((0, n.saturating_sub(1)));
                guard.cell_mut(id).update_for_boundary(left, right, direction);
            }
            (algotypes, directions)
        };
        Ok(Self {
            world,
            topology,
            swap,
            probe,
            detector,
            comparator,
            options,
            cancel: CancelToken::new(),
            algotypes,
            directions,
            step_count: 0,
            last_swap_step: 0,
            converged: false,
        })
    }

    /// Install a cancellation token checked at step boundaries.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn world(&self) -> SharedWorld<T> {
        SharedWorld::clone(&self.world)
    }

    pub fn probe(&self) -> &Probe<T> {
        &self.probe
    }

    pub fn probe_mut(&mut self) -> &mut Probe<T> {
        &mut self.probe
    }

    pub fn swap_engine(&self) -> &SwapEngine {
        &self.swap
    }

    /// Frozen kinds are mutated between runs only.
    pub fn swap_engine_mut(&mut self) -> &mut SwapEngine {
        &mut self.swap
    }

    pub fn steps_taken(&self) -> u64 {
        self.step_count
    }

    pub fn has_converged(&self) -> bool {
        self.converged
    }

    /// Current values in positional order.
    pub fn values(&self) -> EngineResult<Vec<T>> {
        Ok(lock_world(&self.world)?.values())
    }

    /// Snapshot of the current state, independent of probe recording.
    pub fn current_snapshot(&self) -> EngineResult<StepSnapshot<T>> {
        let guard = lock_world(&self.world)?;
        Ok(snapshot_world(&guard, self.swap.frozen(), self.step_count, 0))
    }

    /// Is the prefix `[0, i)` sorted under `direction`, with frozen indices
    /// resetting the chain?
    pub fn is_left_sorted(&self, i: usize, direction: SortDirection) -> EngineResult<bool> {
        let guard = lock_world(&self.world)?;
        Ok(prefix_sorted(
            &guard,
            self.swap.frozen(),
            &self.comparator,
            i,
            direction,
        ))
    }

    /// Run one full pass over all positions. Returns the number of
    /// successful swaps this step.
    pub fn step(&mut self) -> EngineResult<u64> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Interrupted);
        }
        let counters = self.probe.counters();
        let mut guard = lock_world(&self.world)?;
        let n = guard.len();
        self.step_count += 1;
        let step = self.step_count;
        let order = self.topology.iteration_order(n);
        let count_all = self.options.count_short_circuit_examinations;
        let mut swaps_this_step = 0u64;

        for i in order {
            let id = guard.id_at(i);
            if guard.cell(id).status() != CellStatus::Active {
                continue;
            }
            let algotype = self.algotypes[id.index()];
            let direction = self.directions[id.index()];

            match algotype {
                Algotype::Bubble => {
                    for j in self.topology.neighbors(i, n) {
                        if count_all {
                            counters.record_examination();
                        }
                        if j != i + 1 {
                            continue;
                        }
                        if !count_all {
                            counters.record_examination();
                        }
                        let ord =
                            (self.comparator)(guard.cell_at(i).value(), guard.cell_at(j).value());
                        if out_of_order(ord, direction) {
                            match self.swap.attempt_swap(&mut guard, i, j) {
                                SwapOutcome::Swapped => {
                                    counters.record_swap();
                                    swaps_this_step += 1;
                                }
                                SwapOutcome::RejectedFrozen => counters.record_frozen_attempt(),
                                SwapOutcome::RejectedSame => {}
                            }
                        }
                    }
                }
                Algotype::Insertion => {
                    for j in self.topology.neighbors(i, n) {
                        if count_all {
                            counters.record_examination();
                        }
                        if i == 0 || j != i - 1 {
                            continue;
                        }
                        if !guard.cell(id).enable_to_move()
                            || !prefix_sorted(&guard, self.swap.frozen(), &self.comparator, i, direction)
                        {
                            continue;
                        }
                        if !count_all {
                            counters.record_examination();
                        }
                        // Spatial pair is (j, i): the left neighbor first.
                        let ord =
                            (self.comparator)(guard.cell_at(j).value(), guard.cell_at(i).value());
                        if out_of_order(ord, direction) {
                            match self.swap.attempt_swap(&mut guard, i, j) {
                                SwapOutcome::Swapped => {
                                    counters.record_swap();
                                    swaps_this_step += 1;
                                }
                                SwapOutcome::RejectedFrozen => counters.record_frozen_attempt(),
                                SwapOutcome::RejectedSame => {}
                            }
                        }
                    }
                }
                Algotype::Selection => {
                    let (left, right) = guard
                        .cell(id)
                        .membership()
                        .map(|m| (m.left, m.right))
                        .unwrap_or((0, n.saturating_sub(1)));
                    // Target clamped toward the cell, never past it.
                    let raw = guard.cell(id).ideal_pos().unwrap_or(i);
                    let target = match direction {
                        // A swap may have carried the cell outside its group
                        // range, so the near bound caps at the cell itself.
                        SortDirection::Ascending => raw.clamp(left.min(i), i),
                        SortDirection::Descending => raw.clamp(i, right.max(i)),
                    };
                    if target != raw {
                        guard.cell_mut(id).set_ideal_pos(target);
                    }
                    if target == i {
                        // Settled at its target; nothing to examine.
                        continue;
                    }
                    counters.record_examination();
                    let (first, second) = (i.min(target), i.max(target));
                    let ord = (self.comparator)(
                        guard.cell_at(first).value(),
                        guard.cell_at(second).value(),
                    );
                    if out_of_order(ord, direction) {
                        match self.swap.attempt_swap(&mut guard, i, target) {
                            SwapOutcome::Swapped => {
                                counters.record_swap();
                                swaps_this_step += 1;
                            }
                            SwapOutcome::RejectedFrozen => counters.record_frozen_attempt(),
                            SwapOutcome::RejectedSame => {}
                        }
                    } else {
                        // The target slot already holds an acceptable value;
                        // advance one index toward the cell.
                        let next = match direction {
                            SortDirection::Ascending => (target + 1).min(i),
                            SortDirection::Descending => target.saturating_sub(1).max(i),
                        };
                        guard.cell_mut(id).set_ideal_pos(next);
                    }
                }
            }
        }

        if swaps_this_step > 0 {
            self.last_swap_step = step;
        }
        let steps_since_last_swap = step - self.last_swap_step;

        if self.probe.recording_enabled() {
            let snapshot = snapshot_world(&guard, self.swap.frozen(), step, swaps_this_step);
            self.probe.record(snapshot);
        }

        let check = ConvergenceCheck {
            step,
            swaps_this_step,
            steps_since_last_swap,
            world: &guard,
            comparator: &self.comparator,
        };
        self.converged = self.detector.converged(&check) || n <= 1;
        trace!(step, swaps = swaps_this_step, "step complete");
        Ok(swaps_this_step)
    }

    /// Step until the detector fires or `max_steps` is reached. Returns the
    /// number of steps taken.
    pub fn run_until_convergence(&mut self, max_steps: u64) -> EngineResult<u64> {
        while !self.converged && self.step_count < max_steps {
            self.step()?;
        }
        debug!(
            steps = self.step_count,
            converged = self.converged,
            "run finished"
        );
        Ok(self.step_count)
    }

    /// Reinitialize selection targets, counters, probe history and the
    /// stepping state. Calling it twice is the same as calling it once.
    pub fn reset(&mut self) -> EngineResult<()> {
        {
            let mut guard = lock_world(&self.world)?;
            let n = guard.len();
            for pos in 0..n {
                let id = guard.id_at(pos);
                let direction = self.directions[id.index()];
                let (left, right) = guard
                    .cell(id)
                    .membership()
                    .map(|m| (m.left, m.right))
                    .unwrap_or((0, n.saturating_sub(1)));
                guard.cell_mut(id).update_for_boundary(left, right, direction);
            }
        }
        self.probe.clear();
        self.detector.reset();
        self.step_count = 0;
        self.last_swap_step = 0;
        self.converged = false;
        Ok(())
    }
}
