//! Cost model behind `Mapper::estimate_runtime` / `estimate_result_size`.
//!
//! A query planner compares these estimates across strategies; they never
//! affect which pairs a mapper returns.
//!
//! With code length `L`, budget `d` and alphabet size `σ`, the number of codes
//! within substitution distance `d` of a query is
//!
//! ```text
//! N(L, d, σ) = Σ_{k=0..d} C(L, k) · (σ − 1)^k
//! ```
//!
//! Each source code visits at most `L · min(N, t)` trie states, so
//!
//! ```text
//! runtime ≈ encode · (s + t) + step · (t·L + s·L·min(N, t))
//! size    ≈ s · t · min(1, N / σ^L)
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::search::max_distance;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModel {
    /// Symbols per code position (Soundex digits: 0-6).
    pub alphabet_size: usize,
    /// Nanoseconds to encode one value.
    pub encode_nanos: f64,
    /// Nanoseconds per trie state (insert or search step).
    pub step_nanos: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            alphabet_size: 7,
            encode_nanos: 250.0,
            step_nanos: 20.0,
        }
    }
}

impl CostModel {
    /// Codes within `distance` substitutions of a code of length `code_length`.
    pub fn neighbourhood(&self, code_length: usize, distance: usize) -> f64 {
        let sigma = self.alphabet_size.max(1) as f64;
        let mut total = 0.0;
        let mut binom = 1.0;
        for k in 0..=distance.min(code_length) {
            if k > 0 {
                binom = binom * (code_length - k + 1) as f64 / k as f64;
            }
            total += binom * (sigma - 1.0).powi(k as i32);
        }
        total
    }

    pub fn runtime(
        &self,
        code_length: usize,
        source_size: usize,
        target_size: usize,
        threshold: f64,
    ) -> Duration {
        let d = max_distance(code_length, threshold.clamp(0.0, 1.0));
        let l = code_length as f64;
        let s = source_size as f64;
        let t = target_size as f64;
        let reach = self.neighbourhood(code_length, d).min(t);

        let nanos = self.encode_nanos * (s + t) + self.step_nanos * (t * l + s * l * reach);
        Duration::from_nanos(nanos.max(0.0).min(u64::MAX as f64) as u64)
    }

    pub fn result_size(
        &self,
        code_length: usize,
        source_size: usize,
        target_size: usize,
        threshold: f64,
    ) -> f64 {
        let d = max_distance(code_length, threshold.clamp(0.0, 1.0));
        let space = (self.alphabet_size.max(1) as f64).powi(code_length as i32);
        let fraction = (self.neighbourhood(code_length, d) / space).min(1.0);
        source_size as f64 * target_size as f64 * fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn neighbourhood_counts_hamming_balls() {
        let model = CostModel {
            alphabet_size: 2,
            ..CostModel::default()
        };
        // Binary strings of length 4 within distance 1: 1 + 4.
        assert_relative_eq!(model.neighbourhood(4, 1), 5.0);
        // The whole space at full budget.
        assert_relative_eq!(model.neighbourhood(4, 4), 16.0);
        assert_relative_eq!(model.neighbourhood(4, 9), 16.0);
    }

    #[test]
    fn estimates_grow_as_threshold_drops() {
        let model = CostModel::default();
        let strict = model.runtime(4, 10_000, 10_000, 1.0);
        let loose = model.runtime(4, 10_000, 10_000, 0.5);
        assert!(loose > strict);

        let strict = model.result_size(4, 1000, 1000, 1.0);
        let loose = model.result_size(4, 1000, 1000, 0.0);
        assert!(strict < loose);
        assert_relative_eq!(loose, 1_000_000.0);
    }

    #[test]
    fn empty_inputs_cost_nothing() {
        let model = CostModel::default();
        assert_eq!(model.runtime(4, 0, 0, 0.8), Duration::ZERO);
        assert_relative_eq!(model.result_size(4, 0, 500, 0.8), 0.0);
    }
}
