//! Batch experiment driving.
//!
//! The coordinator runs `num_repetitions` self-contained trials: build a
//! fresh seeded population, construct an engine (plus group workers in the
//! lock-protected regime), run to convergence or the step ceiling, and
//! derive per-trial metrics. Trials fan out across a worker pool under
//! `ParallelTrials`; the first failure cancels outstanding work and is
//! reported with its cause preserved.

use std::sync::Arc;

use ede_common::{Algotype, EngineError, EngineResult, SortDirection};
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::cell::Comparator;
use crate::config::{ExecutionMode, ExperimentConfig};
use crate::convergence::NoSwapConvergence;
use crate::engine::{EngineOptions, ExecutionEngine};
use crate::frozen::FrozenState;
use crate::group::CellGroup;
use crate::metrics;
use crate::population::DirectionStrategy;
use crate::probe::{CounterSnapshot, Probe, StepSnapshot};
use crate::rng;
use crate::swap::SwapEngine;
use crate::topology::{AdjacentTopology, ShuffledTopology, Topology};
use crate::world::{World, lock_world};

/// Produces the value array for one trial from `(trial_seed, array_size)`.
pub type ValueFactory<T> = Arc<dyn Fn(u64, usize) -> Vec<T> + Send + Sync>;

/// A seeded permutation of `0..n`; the standard synthetic workload.
pub fn shuffled_value_factory() -> ValueFactory<i64> {
    Arc::new(|seed, n| {
        let mut values: Vec<i64> = (0..n as i64).collect();
        values.shuffle(&mut rng::rng_for(seed, rng::stream::VALUES));
        values
    })
}

/// Metrics computed from a trial's final state.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TrialMetrics {
    pub sortedness: f64,
    pub monotonicity_error: f64,
    pub aggregation_index: f64,
}

#[derive(Debug, Clone)]
pub struct TrialResult<T> {
    pub trial: usize,
    pub seed: u64,
    pub steps: u64,
    pub converged: bool,
    pub counters: CounterSnapshot,
    pub metrics: TrialMetrics,
    pub final_values: Vec<T>,
    /// Present only when trajectory recording was enabled.
    pub trajectory: Option<Vec<StepSnapshot<T>>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct MetricSummary {
    pub mean: f64,
    pub std_dev: f64,
}

fn summary(xs: &[f64]) -> MetricSummary {
    MetricSummary {
        mean: metrics::mean(xs),
        std_dev: metrics::std_dev(xs),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ExperimentAggregate {
    pub trials: usize,
    pub convergence_rate: f64,
    pub steps: MetricSummary,
    pub sortedness: MetricSummary,
    pub monotonicity_error: MetricSummary,
    pub aggregation_index: MetricSummary,
}

#[derive(Debug, Clone)]
pub struct ExperimentResult<T> {
    pub trials: Vec<TrialResult<T>>,
    pub aggregate: ExperimentAggregate,
}

fn aggregate<T>(trials: &[TrialResult<T>]) -> ExperimentAggregate {
    let collect = |f: &dyn Fn(&TrialResult<T>) -> f64| -> Vec<f64> {
        trials.iter().map(f).collect()
    };
    let converged = trials.iter().filter(|t| t.converged).count();
    ExperimentAggregate {
        trials: trials.len(),
        convergence_rate: if trials.is_empty() {
            0.0
        } else {
            converged as f64 / trials.len() as f64
        },
        steps: summary(&collect(&|t| t.steps as f64)),
        sortedness: summary(&collect(&|t| t.metrics.sortedness)),
        monotonicity_error: summary(&collect(&|t| t.metrics.monotonicity_error)),
        aggregation_index: summary(&collect(&|t| t.metrics.aggregation_index)),
    }
}

/// Direction used for trial-end metrics. Mixed-direction populations are
/// measured under ascending order.
fn metric_direction(strategy: DirectionStrategy) -> SortDirection {
    match strategy {
        DirectionStrategy::AllDescending => SortDirection::Descending,
        _ => SortDirection::Ascending,
    }
}

/// Engine thread plus one worker per group, all sharing the global lock.
/// On engine exit the trial token is cancelled so sleeping workers wake,
/// observe their terminal condition, and exit before the scope joins.
fn run_with_group_workers<T: Clone + Send>(
    engine: &mut ExecutionEngine<T>,
    groups: &[CellGroup<T>],
    trial_cancel: &CancelToken,
    max_steps: u64,
) -> EngineResult<u64> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = groups
            .iter()
            .map(|group| scope.spawn(move || group.run()))
            .collect();
        let run_result = engine.run_until_convergence(max_steps);
        trial_cancel.cancel();
        let mut workers: EngineResult<()> = Ok(());
        for handle in handles {
            match handle.join() {
                Ok(result) => workers = workers.and(result),
                Err(_) => {
                    workers = workers.and(Err(EngineError::invariant("group worker panicked")));
                }
            }
        }
        run_result.and_then(|steps| workers.map(|()| steps))
    })
}

pub struct ExperimentCoordinator<T> {
    config: ExperimentConfig,
    values: ValueFactory<T>,
    comparator: Comparator<T>,
    cancel: CancelToken,
}

impl<T: Clone + Send + 'static> ExperimentCoordinator<T> {
    /// Validates the configuration; a constructed coordinator never fails
    /// on configuration mid-run.
    pub fn new(
        config: ExperimentConfig,
        values: ValueFactory<T>,
        comparator: Comparator<T>,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            values,
            comparator,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Handle for cooperative cancellation of the whole experiment.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(&self) -> EngineResult<ExperimentResult<T>> {
        debug!(
            mode = ?self.config.execution_mode,
            repetitions = self.config.num_repetitions,
            "experiment starting"
        );
        let trials = match self.config.execution_mode {
            ExecutionMode::Sequential | ExecutionMode::LockProtected => self.run_serial()?,
            ExecutionMode::ParallelTrials => self.run_parallel()?,
        };
        let aggregate = aggregate(&trials);
        debug!(
            trials = aggregate.trials,
            convergence_rate = aggregate.convergence_rate,
            "experiment finished"
        );
        Ok(ExperimentResult { trials, aggregate })
    }

    fn run_serial(&self) -> EngineResult<Vec<TrialResult<T>>> {
        let mut results = Vec::with_capacity(self.config.num_repetitions);
        for trial in 0..self.config.num_repetitions {
            match self.run_trial(trial) {
                Ok(result) => results.push(result),
                Err(err) => {
                    self.cancel.cancel();
                    return Err(normalize(err, trial));
                }
            }
        }
        Ok(results)
    }

    fn run_parallel(&self) -> EngineResult<Vec<TrialResult<T>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.worker_threads)
            .build()
            .map_err(|e| EngineError::config(format!("failed to build worker pool: {e}")))?;
        // Collect every outcome in submission order; short-circuiting here
        // could report a follow-on Interrupted instead of the real cause.
        let outcomes: Vec<EngineResult<TrialResult<T>>> = pool.install(|| {
            (0..self.config.num_repetitions)
                .into_par_iter()
                .map(|trial| {
                    let result = self.run_trial(trial);
                    if result.is_err() {
                        // Fail fast: outstanding trials observe the token
                        // at their next step boundary.
                        self.cancel.cancel();
                    }
                    result
                })
                .collect()
        });
        let mut results = Vec::with_capacity(outcomes.len());
        let mut first_failure: Option<EngineError> = None;
        let mut interrupted = false;
        for (trial, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(result) => results.push(result),
                Err(err) if err.is_interrupted() => interrupted = true,
                Err(err) => {
                    if first_failure.is_none() {
                        first_failure = Some(err.in_trial(trial));
                    }
                }
            }
        }
        if let Some(err) = first_failure {
            return Err(err);
        }
        if interrupted {
            return Err(EngineError::Interrupted);
        }
        Ok(results)
    }

    fn run_trial(&self, trial: usize) -> EngineResult<TrialResult<T>> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Interrupted);
        }
        let cfg = &self.config;
        let seed = rng::trial_seed(cfg.seed, trial);
        let values = (self.values)(seed, cfg.array_size);
        if values.len() != cfg.array_size {
            return Err(EngineError::invariant(format!(
                "value factory produced {} values for array_size {}",
                values.len(),
                cfg.array_size
            )));
        }
        let population = cfg.population_for(seed)?;
        let cells = population.assign(values)?;
        let world = World::new(cells).into_shared();

        // Groups are registered before the engine so selection targets are
        // initialized against group boundaries.
        let trial_cancel = CancelToken::new();
        let mut groups: Vec<CellGroup<T>> = Vec::new();
        if cfg.execution_mode == ExecutionMode::LockProtected && cfg.group_count > 0 {
            let base = cfg.array_size / cfg.group_count;
            let extra = cfg.array_size % cfg.group_count;
            let mut left = 0usize;
            for index in 0..cfg.group_count {
                let len = base + usize::from(index < extra);
                let right = left + len - 1;
                let (algotype, direction) = {
                    let guard = lock_world(&world)?;
                    let cell = guard.cell_at(left);
                    (
                        cell.algotype().unwrap_or(Algotype::Bubble),
                        cell.direction().unwrap_or(SortDirection::Ascending),
                    )
                };
                groups.push(CellGroup::new(
                    Arc::clone(&world),
                    Arc::clone(&self.comparator),
                    left,
                    right,
                    algotype,
                    direction,
                    cfg.phase_period,
                    trial_cancel.clone(),
                )?);
                left = right + 1;
            }
        }

        let topology: Box<dyn Topology> = if cfg.shuffle_iteration {
            Box::new(ShuffledTopology::new(seed))
        } else {
            Box::new(AdjacentTopology)
        };
        let options = EngineOptions {
            direction_override: None,
            count_short_circuit_examinations: cfg.count_short_circuit_examinations,
        };
        let mut engine = ExecutionEngine::new(
            world,
            topology,
            SwapEngine::new(FrozenState::new(cfg.array_size)),
            Probe::new(cfg.record_trajectory),
            Box::new(NoSwapConvergence::new(cfg.required_stable_steps)),
            Arc::clone(&self.comparator),
            options,
        )?
        .with_cancel_token(self.cancel.clone());

        let steps = if groups.is_empty() {
            engine.run_until_convergence(cfg.max_steps)?
        } else {
            run_with_group_workers(&mut engine, &groups, &trial_cancel, cfg.max_steps)?
        };
        let converged = engine.has_converged();

        let final_values = engine.values()?;
        let direction = metric_direction(cfg.direction_strategy);
        let snapshot = engine.current_snapshot()?;
        let trial_metrics = TrialMetrics {
            sortedness: metrics::sortedness(&final_values, &self.comparator, direction),
            monotonicity_error: metrics::monotonicity_error(
                &final_values,
                &self.comparator,
                direction,
            ),
            aggregation_index: metrics::algotype_aggregation_index(&snapshot.records),
        };
        let counters = engine.probe().counter_values();
        let trajectory = cfg
            .record_trajectory
            .then(|| engine.probe_mut().take_snapshots());
        debug!(trial, steps, converged, "trial finished");
        Ok(TrialResult {
            trial,
            seed,
            steps,
            converged,
            counters,
            metrics: trial_metrics,
            final_values,
            trajectory,
        })
    }
}

fn normalize(err: EngineError, trial: usize) -> EngineError {
    if err.is_interrupted() {
        EngineError::Interrupted
    } else {
        err.in_trial(trial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_with(steps: u64, converged: bool, sortedness: f64) -> TrialResult<i64> {
        TrialResult {
            trial: 0,
            seed: 0,
            steps,
            converged,
            counters: CounterSnapshot::default(),
            metrics: TrialMetrics {
                sortedness,
                monotonicity_error: 0.0,
                aggregation_index: 50.0,
            },
            final_values: vec![],
            trajectory: None,
        }
    }

    #[test]
    fn aggregate_means_and_rates() {
        let trials = vec![
            result_with(10, true, 100.0),
            result_with(20, true, 90.0),
            result_with(30, false, 80.0),
        ];
        let agg = aggregate(&trials);
        assert_eq!(agg.trials, 3);
        assert!((agg.convergence_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((agg.steps.mean - 20.0).abs() < 1e-12);
        assert!((agg.sortedness.mean - 90.0).abs() < 1e-12);
    }

    #[test]
    fn empty_aggregate_is_well_defined() {
        let agg = aggregate::<i64>(&[]);
        assert_eq!(agg.trials, 0);
        assert_eq!(agg.convergence_rate, 0.0);
    }

    #[test]
    fn shuffled_factory_is_a_seed_stable_permutation() {
        let factory = shuffled_value_factory();
        let a = factory(5, 32);
        let b = factory(5, 32);
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..32).collect::<Vec<i64>>());
        assert_ne!(factory(6, 32), a);
    }
}
