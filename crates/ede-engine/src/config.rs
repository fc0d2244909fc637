//! Experiment-level configuration.
//!
//! A builder-style bundle validated once, at build time; a coordinator
//! constructed from a validated config never fails on a configuration
//! problem mid-run.

use std::time::Duration;

use ede_common::{Algotype, EngineResult};

use crate::population::{ChimericPopulation, DirectionStrategy};

/// Scheduling regime for an experiment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Serial trials, single stepping loop, uncontended lock.
    #[default]
    Sequential,
    /// One trial at a time; the engine plus one worker per group share the
    /// global lock.
    LockProtected,
    /// Independent trials fanned out across a worker pool.
    ParallelTrials,
}

#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub array_size: usize,
    pub max_steps: u64,
    /// K for no-swap convergence.
    pub required_stable_steps: u64,
    pub record_trajectory: bool,
    pub execution_mode: ExecutionMode,
    pub num_repetitions: usize,
    /// Root RNG seed; every trial derives its own seed from it.
    pub seed: u64,
    pub algotype_mix: Vec<(Algotype, f64)>,
    pub direction_strategy: DirectionStrategy,
    /// Group sleep/wake cadence.
    pub phase_period: Duration,
    /// Number of contiguous groups for the lock-protected regime; 0 runs
    /// without groups.
    pub group_count: usize,
    /// Worker pool width for parallel trials; 0 uses the pool default.
    pub worker_threads: usize,
    /// Shuffle the per-step iteration order with the trial seed.
    pub shuffle_iteration: bool,
    pub count_short_circuit_examinations: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            array_size: 64,
            max_steps: 10_000,
            required_stable_steps: 3,
            record_trajectory: false,
            execution_mode: ExecutionMode::Sequential,
            num_repetitions: 1,
            seed: 0,
            algotype_mix: vec![(Algotype::Bubble, 1.0)],
            direction_strategy: DirectionStrategy::AllAscending,
            phase_period: Duration::from_millis(10),
            group_count: 0,
            worker_threads: 0,
            shuffle_iteration: false,
            count_short_circuit_examinations: true,
        }
    }
}

impl ExperimentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_array_size(mut self, n: usize) -> Self {
        self.array_size = n;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_required_stable_steps(mut self, k: u64) -> Self {
        self.required_stable_steps = k;
        self
    }

    pub fn with_record_trajectory(mut self, enable: bool) -> Self {
        self.record_trajectory = enable;
        self
    }

    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    pub fn with_num_repetitions(mut self, repetitions: usize) -> Self {
        self.num_repetitions = repetitions;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_algotype_mix(mut self, mix: Vec<(Algotype, f64)>) -> Self {
        self.algotype_mix = mix;
        self
    }

    pub fn with_direction_strategy(mut self, strategy: DirectionStrategy) -> Self {
        self.direction_strategy = strategy;
        self
    }

    pub fn with_phase_period(mut self, period: Duration) -> Self {
        self.phase_period = period;
        self
    }

    pub fn with_group_count(mut self, groups: usize) -> Self {
        self.group_count = groups;
        self
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    pub fn with_shuffle_iteration(mut self, enable: bool) -> Self {
        self.shuffle_iteration = enable;
        self
    }

    pub fn with_count_short_circuit_examinations(mut self, enable: bool) -> Self {
        self.count_short_circuit_examinations = enable;
        self
    }

    /// Reject a malformed bundle. Everything checked here is a
    /// `ConfigInvalid`; run-time code can assume a validated config.
    pub fn validate(&self) -> EngineResult<()> {
        use ede_common::EngineError;

        if self.array_size == 0 {
            return Err(EngineError::config("array_size must be positive"));
        }
        if self.max_steps == 0 {
            return Err(EngineError::config("max_steps must be positive"));
        }
        if self.num_repetitions == 0 {
            return Err(EngineError::config("num_repetitions must be positive"));
        }
        if self.required_stable_steps == 0 {
            return Err(EngineError::config("required_stable_steps must be positive"));
        }
        if self.group_count > self.array_size {
            return Err(EngineError::config(format!(
                "group_count {} exceeds array_size {}",
                self.group_count, self.array_size
            )));
        }
        if self.phase_period.is_zero() {
            return Err(EngineError::config("phase_period must be positive"));
        }
        // The mix is validated by the population factory.
        ChimericPopulation::new(self.algotype_mix.clone(), self.direction_strategy, self.seed)?;
        Ok(())
    }

    /// Population factory for one trial of this experiment.
    pub fn population_for(&self, trial_seed: u64) -> EngineResult<ChimericPopulation> {
        ChimericPopulation::new(
            self.algotype_mix.clone(),
            self.direction_strategy,
            trial_seed,
        )
    }
}
