/*
 * Reina
 * Copyright (c) 2020  ThoughtWorks, Inc.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <http://www.gnu.org/licenses/>.
 *
 */

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use crate::models::custom_types::Percentage;

/// All randomness in a simulation run flows through a single seeded
/// generator so that identical inputs produce identical metric series.
pub struct RandomWrapper {
    rng: SmallRng,
}

impl RandomWrapper {
    pub fn seeded(seed: u64) -> RandomWrapper {
        RandomWrapper { rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn get(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Uniform draw in [0, 1).
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Bernoulli test that is exact at the boundaries.
    pub fn chance(&mut self, p: Percentage) -> bool {
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.rng.gen_bool(p)
        }
    }

    /// Draw from exp(N(mu, sigma)).
    pub fn lognormal(&mut self, mu: f64, sigma: f64) -> f64 {
        let dist = LogNormal::new(mu, sigma).expect("lognormal sigma must be finite and non-negative");
        dist.sample(&mut self.rng)
    }

    /// Index drawn proportionally to the given weights. Weights that sum to
    /// zero fall back to index 0.
    pub fn weighted_choice(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || weights.is_empty() {
            return 0;
        }
        let mut remaining = self.uniform() * total;
        for (idx, weight) in weights.iter().enumerate() {
            remaining -= weight;
            if remaining < 0.0 {
                return idx;
            }
        }
        weights.len() - 1
    }
}
