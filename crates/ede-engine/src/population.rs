//! Heterogeneous population construction.
//!
//! Builds cell populations with a prescribed algotype mix and a direction
//! strategy. Counts are exact (floor plus largest-remainder distribution),
//! placement is a seeded permutation, and every random draw derives from
//! the population seed, so a population is a pure function of
//! `(values, mix, strategy, seed)`.

use ede_common::{Algotype, EngineError, EngineResult, SortDirection};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::cell::Cell;
use crate::rng;

const MIX_SUM_TOLERANCE: f64 = 1e-6;

/// How per-cell directions are assigned.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DirectionStrategy {
    #[default]
    AllAscending,
    AllDescending,
    /// Even positions ascend, odd positions descend.
    Alternating,
    /// Fair coin per cell, drawn from the derived direction seed.
    Random,
}

#[derive(Debug, Clone)]
pub struct ChimericPopulation {
    mix: Vec<(Algotype, f64)>,
    directions: DirectionStrategy,
    seed: u64,
}

impl ChimericPopulation {
    /// Validates the mix: fractions non-negative, no duplicate algotype,
    /// sum within tolerance of 1.
    pub fn new(
        mix: Vec<(Algotype, f64)>,
        directions: DirectionStrategy,
        seed: u64,
    ) -> EngineResult<Self> {
        if mix.is_empty() {
            return Err(EngineError::config("algotype mix is empty"));
        }
        let mut seen: Vec<Algotype> = Vec::new();
        let mut sum = 0.0;
        for (algotype, fraction) in &mix {
            if seen.contains(algotype) {
                return Err(EngineError::config(format!(
                    "algotype '{algotype}' appears twice in the mix"
                )));
            }
            seen.push(*algotype);
            if *fraction < 0.0 {
                return Err(EngineError::config(format!(
                    "negative fraction {fraction} for algotype '{algotype}'"
                )));
            }
            sum += fraction;
        }
        if (sum - 1.0).abs() > MIX_SUM_TOLERANCE {
            return Err(EngineError::config(format!(
                "algotype fractions sum to {sum}, expected 1.0"
            )));
        }
        Ok(Self {
            mix,
            directions,
            seed,
        })
    }

    /// Uniform single-algotype population.
    pub fn uniform(algotype: Algotype, directions: DirectionStrategy, seed: u64) -> Self {
        Self {
            mix: vec![(algotype, 1.0)],
            directions,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Exact per-algotype counts for a population of `n`: floors first,
    /// then one extra to the largest remainders, remainder ties broken by
    /// the derived seed.
    pub fn algotype_counts(&self, n: usize) -> Vec<(Algotype, usize)> {
        let mut rng = rng::rng_for(self.seed, rng::stream::ALGOTYPE_MIX);
        let mut counts: Vec<(Algotype, usize)> = Vec::with_capacity(self.mix.len());
        let mut remainders: Vec<(usize, f64, u64)> = Vec::with_capacity(self.mix.len());
        let mut assigned = 0usize;
        for (idx, (algotype, fraction)) in self.mix.iter().enumerate() {
            let exact = fraction * n as f64;
            let floor = exact.floor() as usize;
            counts.push((*algotype, floor));
            remainders.push((idx, exact - floor as f64, rng.r#gen()));
            assigned += floor;
        }
        remainders.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.2.cmp(&b.2))
        });
        for (idx, _, _) in remainders.iter().take(n.saturating_sub(assigned)) {
            counts[*idx].1 += 1;
        }
        counts
    }

    /// Turn `values` into cells carrying algotypes and directions.
    pub fn assign<T>(&self, values: Vec<T>) -> EngineResult<Vec<Cell<T>>> {
        let n = values.len();
        let mut labels: Vec<Algotype> = Vec::with_capacity(n);
        for (algotype, count) in self.algotype_counts(n) {
            labels.extend(std::iter::repeat(algotype).take(count));
        }
        if labels.len() != n {
            return Err(EngineError::invariant(format!(
                "mix produced {} labels for {n} cells",
                labels.len()
            )));
        }
        let mut placement = rng::rng_for(self.seed, rng::stream::ALGOTYPE_MIX);
        labels.shuffle(&mut placement);

        let mut direction_rng = rng::rng_for(self.seed, rng::stream::DIRECTION);
        let cells = values
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(pos, (value, algotype))| {
                let direction = match self.directions {
                    DirectionStrategy::AllAscending => SortDirection::Ascending,
                    DirectionStrategy::AllDescending => SortDirection::Descending,
                    DirectionStrategy::Alternating => {
                        if pos % 2 == 0 {
                            SortDirection::Ascending
                        } else {
                            SortDirection::Descending
                        }
                    }
                    DirectionStrategy::Random => {
                        if direction_rng.gen_bool(0.5) {
                            SortDirection::Ascending
                        } else {
                            SortDirection::Descending
                        }
                    }
                };
                Cell::new(value).with_algotype(algotype).with_direction(direction)
            })
            .collect();
        Ok(cells)
    }
}
