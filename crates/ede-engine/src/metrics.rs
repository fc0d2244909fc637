//! Quantitative properties derived from probe output.
//!
//! All metrics are pure functions over snapshot data so they can run on a
//! live world, on a recorded trajectory, or in a collaborator's
//! post-processing without touching engine state.

use std::cmp::Ordering;

use ede_common::SortDirection;

use crate::cell::Comparator;
use crate::probe::CellRecord;

fn pair_in_order(ord: Ordering, direction: SortDirection) -> bool {
    match direction {
        SortDirection::Ascending => ord != Ordering::Greater,
        SortDirection::Descending => ord != Ordering::Less,
    }
}

/// Proximity to fully sorted, 0–100: the percentage of adjacent pairs in
/// order under `direction`. Arrays shorter than two elements are trivially
/// sorted.
pub fn sortedness<T>(values: &[T], cmp: &Comparator<T>, direction: SortDirection) -> f64 {
    if values.len() < 2 {
        return 100.0;
    }
    let pairs = values.len() - 1;
    let in_order = values
        .windows(2)
        .filter(|w| pair_in_order(cmp(&w[0], &w[1]), direction))
        .count();
    100.0 * in_order as f64 / pairs as f64
}

/// All-pairs inversion fraction in [0, 1]: 0 for a sorted array, 1 for a
/// strictly reversed one. Quadratic; intended for trial-end evaluation, not
/// per-examination inner loops.
pub fn monotonicity_error<T>(values: &[T], cmp: &Comparator<T>, direction: SortDirection) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mut inversions = 0usize;
    for i in 0..n - 1 {
        for j in i + 1..n {
            if !pair_in_order(cmp(&values[i], &values[j]), direction) {
                inversions += 1;
            }
        }
    }
    inversions as f64 / (n * (n - 1) / 2) as f64
}

/// Emergent clustering measure, 0–100: the percentage of adjacent pairs
/// sharing an algotype. A uniformly random 50/50 placement baselines at
/// ≈ 50; values above that indicate same-type clustering.
pub fn algotype_aggregation_index<T>(records: &[CellRecord<T>]) -> f64 {
    if records.len() < 2 {
        return 100.0;
    }
    let pairs = records.len() - 1;
    let same = records
        .windows(2)
        .filter(|w| match (w[0].algotype, w[1].algotype) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
        .count();
    100.0 * same as f64 / pairs as f64
}

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    var.sqrt()
}
