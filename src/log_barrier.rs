//! Log-barrier online mirror descent step used by [`CorralLearner`](crate::CorralLearner).
//!
//! Given weights `p`, per-learner rates `eta`, and losses `l`, the update is
//!
//! ```text
//!   p_i' = 1 / (1/p_i + eta_i * (l_i - lambda))
//! ```
//!
//! where the multiplier `lambda` is chosen so that `sum_i p_i' = 1`. Writing
//! `f(lambda) = sum_i 1 / (1/p_i + eta_i * (l_i - lambda))`, `f` is increasing between its
//! poles `z_i = l_i + 1 / (eta_i * p_i)` and crosses 1 inside `[min(l), max(l)]`.
//!
//! Search order:
//! 1. All losses equal: `lambda = l` (weights unchanged).
//! 2. `min(l)` or `max(l)` when it is not a pole and `f` rounds to 1 there.
//! 3. Split `[min(l), max(l)]` at the interior poles and run a damped Newton search in the first
//!    bracket whose endpoint probes straddle 1.
//!
//! Failing all three is reported as [`LearnerError::OptimizationDivergence`].

use crate::LearnerError;

/// Numerical constants for the log-barrier solve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogBarrierConfig {
    /// `f(lambda)` is accepted once it rounds to 1 at this many decimal places.
    pub precision: i32,
    /// Lower bound applied to every updated weight.
    pub floor: f64,
    /// Offset from a bracket's left end used to test for a sign change.
    pub left_probe: f64,
    /// Offset from a bracket's right end used to test for a sign change.
    pub right_probe: f64,
    /// Newton iterations allowed per bracket before the solve is declared divergent.
    pub max_iterations: usize,
}

impl Default for LogBarrierConfig {
    fn default() -> Self {
        Self {
            precision: 4,
            floor: 1e-5,
            left_probe: 1e-4,
            right_probe: 1e-5,
            max_iterations: 100_000,
        }
    }
}

struct Objective<'a> {
    ps: &'a [f64],
    etas: &'a [f64],
    losses: &'a [f64],
}

impl Objective<'_> {
    fn terms(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.ps
            .iter()
            .zip(self.etas)
            .zip(self.losses)
            .map(|((&p, &eta), &loss)| (p, eta, loss))
    }

    fn f(&self, lambda: f64) -> f64 {
        self.terms()
            .map(|(p, eta, loss)| 1.0 / (1.0 / p + eta * (loss - lambda)))
            .sum()
    }

    fn df(&self, lambda: f64) -> f64 {
        self.terms()
            .map(|(p, eta, loss)| eta / (1.0 / p + eta * (loss - lambda)).powi(2))
            .sum()
    }

    fn poles(&self) -> Vec<f64> {
        self.terms()
            .map(|(p, eta, loss)| (1.0 / p + eta * loss) / eta)
            .collect()
    }

    fn divergence(&self, reason: impl Into<String>) -> LearnerError {
        LearnerError::OptimizationDivergence {
            reason: reason.into(),
            ps: self.ps.to_vec(),
            etas: self.etas.to_vec(),
            losses: self.losses.to_vec(),
        }
    }
}

fn rounds_to_one(x: f64, precision: i32) -> bool {
    let scale = 10f64.powi(precision);
    (x * scale).round() == scale
}

/// Solve for the normalizing multiplier `lambda`.
pub fn log_barrier_lambda(
    ps: &[f64],
    etas: &[f64],
    losses: &[f64],
    cfg: &LogBarrierConfig,
) -> Result<f64, LearnerError> {
    if ps.is_empty() || ps.len() != etas.len() || ps.len() != losses.len() {
        return Err(LearnerError::invalid(format!(
            "log-barrier inputs must be non-empty and aligned (p={}, eta={}, losses={})",
            ps.len(),
            etas.len(),
            losses.len()
        )));
    }
    let obj = Objective { ps, etas, losses };
    if losses.iter().any(|l| !l.is_finite()) {
        return Err(obj.divergence("non-finite loss"));
    }

    let min_loss = losses.iter().copied().fold(f64::INFINITY, f64::min);
    let max_loss = losses.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min_loss == max_loss {
        tracing::trace!(lambda = min_loss, "log-barrier: equal losses");
        return Ok(min_loss);
    }

    let poles = obj.poles();
    for edge in [min_loss, max_loss] {
        if !poles.contains(&edge) && rounds_to_one(obj.f(edge), cfg.precision) {
            tracing::trace!(lambda = edge, "log-barrier: boundary root");
            return Ok(edge);
        }
    }

    let mut brackets: Vec<f64> = poles
        .iter()
        .copied()
        .filter(|z| (min_loss..=max_loss).contains(z))
        .chain([min_loss, max_loss])
        .collect();
    brackets.sort_by(f64::total_cmp);
    brackets.dedup();

    for w in brackets.windows(2) {
        if let Some(lambda) = newton_in_bracket(&obj, w[0], w[1], cfg)? {
            tracing::trace!(lambda, left = w[0], right = w[1], "log-barrier: newton root");
            return Ok(lambda);
        }
    }

    Err(obj.divergence("no bracket in [min(loss), max(loss)] contains a root"))
}

/// Damped Newton search for `f(x) = 1` on `(l, r)`.
///
/// Returns `Ok(None)` when the probes near the ends do not straddle 1 (the bracket is
/// skipped), and an error when the iteration cap is hit or the derivative degenerates.
fn newton_in_bracket(
    obj: &Objective<'_>,
    l: f64,
    r: f64,
    cfg: &LogBarrierConfig,
) -> Result<Option<f64>, LearnerError> {
    // Approximate: misses a root nearer an end than its probe offset, or of even multiplicity.
    if (obj.f(l + cfg.left_probe) - 1.0) * (obj.f(r - cfg.right_probe) - 1.0) >= 0.0 {
        return Ok(None);
    }

    let mut x = (l + r) / 2.0;
    for _ in 0..cfg.max_iterations {
        let d = obj.df(x);
        if d == 0.0 || !d.is_finite() {
            return Err(obj.divergence(format!("degenerate derivative {d} at lambda={x}")));
        }
        let mut step = (obj.f(x) - 1.0) / d;
        if !step.is_finite() {
            return Err(obj.divergence(format!("non-finite newton step at lambda={x}")));
        }
        let mut next = x - step;
        // Damping: halve the step until it stays strictly inside the bracket.
        while !(next > l && next < r) {
            step /= 2.0;
            next = x - step;
            if step.abs() < f64::EPSILON * x.abs().max(1.0) {
                break;
            }
        }
        x = next;
        if rounds_to_one(obj.f(x), cfg.precision) {
            return Ok(Some(x));
        }
    }

    Err(obj.divergence(format!(
        "newton search did not converge within {} iterations on [{l}, {r}]",
        cfg.max_iterations
    )))
}

/// One log-barrier OMD step: the new (floored) weights for `losses`.
pub fn log_barrier_omd(
    ps: &[f64],
    etas: &[f64],
    losses: &[f64],
    cfg: &LogBarrierConfig,
) -> Result<Vec<f64>, LearnerError> {
    let lambda = log_barrier_lambda(ps, etas, losses, cfg)?;
    Ok(ps
        .iter()
        .zip(etas)
        .zip(losses)
        .map(|((&p, &eta), &loss)| (1.0 / (1.0 / p + eta * (loss - lambda))).max(cfg.floor))
        .collect())
}
