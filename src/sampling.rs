//! Seedable weighted choice.
//!
//! [`CorralLearner`](crate::CorralLearner) samples one action per base learner each round. The
//! sampling source is injected so that runs are reproducible given a seed.

use rand::Rng;

use crate::LearnerError;

/// A source of weighted random choices.
///
/// Any [`rand::Rng`] is a `RandomSource` (e.g. `StdRng::seed_from_u64(7)`).
pub trait RandomSource {
    /// A uniform draw from `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Pick the index of one candidate with probability proportional to `weights`.
    ///
    /// Weights must be finite, non-negative, and have a positive total.
    fn choice_index(&mut self, weights: &[f64]) -> Result<usize, LearnerError> {
        if weights.is_empty() {
            return Err(LearnerError::invalid("cannot choose from an empty set"));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(LearnerError::invalid(format!(
                "weights must be finite and non-negative, got {weights:?}"
            )));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(LearnerError::invalid("weights must have a positive total"));
        }

        let r = self.next_unit() * total;
        let mut cdf = 0.0;
        for (i, w) in weights.iter().enumerate() {
            cdf += *w;
            if r < cdf {
                return Ok(i);
            }
        }
        // Numerical fallback: the last candidate with positive weight.
        Ok(weights.iter().rposition(|w| *w > 0.0).unwrap_or(weights.len() - 1))
    }

    /// Pick one of `candidates` with probability proportional to `weights`.
    fn choice<'a, T>(&mut self, candidates: &'a [T], weights: &[f64]) -> Result<&'a T, LearnerError> {
        if candidates.len() != weights.len() {
            return Err(LearnerError::invalid(format!(
                "{} candidates but {} weights",
                candidates.len(),
                weights.len()
            )));
        }
        let i = self.choice_index(weights)?;
        Ok(&candidates[i])
    }
}

impl<R: Rng> RandomSource for R {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}
