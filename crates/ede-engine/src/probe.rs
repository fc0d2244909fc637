//! Per-step instrumentation.
//!
//! The probe captures one `StepSnapshot` per engine step (when recording is
//! enabled) and owns the shared atomic counters. Counters accumulate even
//! when recording is off; snapshot storage is O(steps × N) and exists for
//! trajectory analysis, so memory-constrained batch runs disable it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ede_common::Algotype;
use rustc_hash::FxHashMap;

use crate::group::GroupId;

/// Shared counters; atomic so the lock-protected regime can read them from
/// any worker without extra coordination.
#[derive(Debug, Default)]
pub struct Counters {
    swaps: AtomicU64,
    compare_and_swaps: AtomicU64,
    frozen_attempts: AtomicU64,
}

impl Counters {
    pub fn record_swap(&self) {
        self.swaps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_examination(&self) {
        self.compare_and_swaps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frozen_attempt(&self) {
        self.frozen_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn swaps(&self) -> u64 {
        self.swaps.load(Ordering::Relaxed)
    }

    pub fn compare_and_swaps(&self) -> u64 {
        self.compare_and_swaps.load(Ordering::Relaxed)
    }

    pub fn frozen_attempts(&self) -> u64 {
        self.frozen_attempts.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            swaps: self.swaps(),
            compare_and_swaps: self.compare_and_swaps(),
            frozen_attempts: self.frozen_attempts(),
        }
    }

    pub fn clear(&self) {
        self.swaps.store(0, Ordering::Relaxed);
        self.compare_and_swaps.store(0, Ordering::Relaxed);
        self.frozen_attempts.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub swaps: u64,
    pub compare_and_swaps: u64,
    pub frozen_attempts: u64,
}

/// Immutable per-cell facts copied into a snapshot.
#[derive(Debug, Clone)]
pub struct CellRecord<T> {
    pub group: Option<GroupId>,
    pub algotype: Option<Algotype>,
    pub value: T,
    pub frozen: bool,
}

/// Everything the probe keeps for one step.
#[derive(Debug, Clone)]
pub struct StepSnapshot<T> {
    pub step: u64,
    pub values: Vec<T>,
    pub records: Vec<CellRecord<T>>,
    pub swaps_this_step: u64,
}

pub struct Probe<T> {
    recording: bool,
    counters: Arc<Counters>,
    snapshots: Vec<StepSnapshot<T>>,
}

impl<T> Probe<T> {
    pub fn new(recording: bool) -> Self {
        Self {
            recording,
            counters: Arc::new(Counters::default()),
            snapshots: Vec::new(),
        }
    }

    pub fn recording_enabled(&self) -> bool {
        self.recording
    }

    /// Handle to the shared counters.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub fn counter_values(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Append a snapshot; dropped silently when recording is disabled.
    pub fn record(&mut self, snapshot: StepSnapshot<T>) {
        if self.recording {
            self.snapshots.push(snapshot);
        }
    }

    pub fn snapshots(&self) -> &[StepSnapshot<T>] {
        &self.snapshots
    }

    /// Drop history and zero the counters.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.counters.clear();
    }

    /// Take the recorded history out of the probe, leaving counters intact.
    pub fn take_snapshots(&mut self) -> Vec<StepSnapshot<T>> {
        std::mem::take(&mut self.snapshots)
    }

    /// Algotype counts for the snapshot recorded at `step`, if any.
    pub fn algotype_distribution(&self, step: u64) -> Option<FxHashMap<Algotype, usize>> {
        let snap = self.snapshots.iter().find(|s| s.step == step)?;
        let mut counts = FxHashMap::default();
        for record in &snap.records {
            if let Some(algotype) = record.algotype {
                *counts.entry(algotype).or_insert(0) += 1;
            }
        }
        Some(counts)
    }
}
