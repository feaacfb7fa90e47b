//! CORRAL: an adaptive ensemble of base learners (Agarwal, Luo, Neyshabur & Schapire 2017).
//!
//! Each round every base learner proposes a distribution, one action is sampled per base
//! learner, and the returned distribution is the `p_bar`-weighted mix of those *sampled*
//! one-hot choices, renormalized to sum to 1. On `learn`, each base learner receives an
//! importance-weighted loss for its own sampled action, and the mixture weights take one
//! log-barrier OMD step (see [`log_barrier_omd`]). A learner whose smoothed weight drops
//! below `1/rho_i` has its threshold doubled and its learning rate shrunk by `beta`.
//!
//! Rewards only need `reward <= 1`, so a Corral can itself be the base learner of another
//! Corral, which feeds it rewards of `1 - loss / probability`.
//!
//! Sampling is the only randomized step and is reproducible given the seed.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::learner::{require_actions, require_nonnegative_loss};
use crate::log_barrier::{log_barrier_omd, LogBarrierConfig};
use crate::{Key, Learner, LearnerError, Params, RandomSource, Value};

/// Configuration for [`CorralLearner`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CorralConfig {
    /// Initial learning rate for every base learner (finite, > 0).
    pub eta: f64,
    /// Time horizon `T` (> 1; `f64::INFINITY` disables smoothing and rate decay).
    pub horizon: f64,
    /// Seed for the action-sampling RNG.
    pub seed: u64,
    /// Numerical constants for the mixture update.
    pub solver: LogBarrierConfig,
}

impl Default for CorralConfig {
    fn default() -> Self {
        Self {
            eta: 0.075,
            horizon: f64::INFINITY,
            seed: 0,
            solver: LogBarrierConfig::default(),
        }
    }
}

/// Per-key choices recorded by `predict` and consumed by `learn`.
#[derive(Debug, Clone)]
struct PendingRound {
    actions: Vec<Value>,
    probs: Vec<f64>,
}

/// Adaptive ensemble over a fixed set of base learners.
pub struct CorralLearner<R = StdRng> {
    cfg: CorralConfig,
    base: Vec<Box<dyn Learner>>,
    gamma: f64,
    beta: f64,
    etas: Vec<f64>,
    rhos: Vec<f64>,
    ps: Vec<f64>,
    p_bars: Vec<f64>,
    pending: BTreeMap<Key, PendingRound>,
    rng: R,
}

impl CorralLearner<StdRng> {
    /// Create with a `StdRng` seeded from `cfg.seed`.
    pub fn new(base: Vec<Box<dyn Learner>>, cfg: CorralConfig) -> Result<Self, LearnerError> {
        Self::with_rng(base, cfg, StdRng::seed_from_u64(cfg.seed))
    }
}

impl<R: RandomSource> CorralLearner<R> {
    /// Create with an explicit random source (`cfg.seed` is then only descriptive).
    pub fn with_rng(
        base: Vec<Box<dyn Learner>>,
        cfg: CorralConfig,
        rng: R,
    ) -> Result<Self, LearnerError> {
        if base.is_empty() {
            return Err(LearnerError::invalid("corral needs at least one base learner"));
        }
        if !(cfg.eta.is_finite() && cfg.eta > 0.0) {
            return Err(LearnerError::invalid(format!(
                "eta must be finite and > 0, got {}",
                cfg.eta
            )));
        }
        // NaN fails this comparison too.
        if !(cfg.horizon > 1.0) {
            return Err(LearnerError::invalid(format!(
                "horizon must be > 1, got {}",
                cfg.horizon
            )));
        }

        let m = base.len();
        let mf = m as f64;
        Ok(Self {
            gamma: 1.0 / cfg.horizon,
            beta: (-1.0 / cfg.horizon.ln()).exp(),
            etas: vec![cfg.eta; m],
            rhos: vec![2.0 * mf; m],
            ps: vec![1.0 / mf; m],
            p_bars: vec![1.0 / mf; m],
            pending: BTreeMap::new(),
            cfg,
            base,
            rng,
        })
    }

    pub fn config(&self) -> &CorralConfig {
        &self.cfg
    }

    pub fn base_learners(&self) -> &[Box<dyn Learner>] {
        &self.base
    }

    /// Raw mixture weights `p`.
    pub fn weights(&self) -> &[f64] {
        &self.ps
    }

    /// Smoothed weights `p_bar` used to blend predictions.
    pub fn smoothed_weights(&self) -> &[f64] {
        &self.p_bars
    }

    /// Per-learner learning rates (non-increasing over time).
    pub fn etas(&self) -> &[f64] {
        &self.etas
    }

    /// Per-learner rate-doubling thresholds (non-decreasing over time).
    pub fn rhos(&self) -> &[f64] {
        &self.rhos
    }

    /// Number of keys with a `predict` that has not been matched by `learn`.
    ///
    /// Non-zero between rounds means some `learn` was never called.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn update_mixture(&mut self, losses: &[f64]) -> Result<(), LearnerError> {
        self.ps = log_barrier_omd(&self.ps, &self.etas, losses, &self.cfg.solver)
            .inspect_err(|e| tracing::warn!(error = %e, "corral: mixture update failed"))?;

        let mf = self.base.len() as f64;
        let gamma = self.gamma;
        self.p_bars = self
            .ps
            .iter()
            .map(|p| (1.0 - gamma) * p + gamma / mf)
            .collect();

        for (i, p_bar) in self.p_bars.iter().enumerate() {
            if 1.0 / p_bar > self.rhos[i] {
                self.rhos[i] = 2.0 / p_bar;
                self.etas[i] *= self.beta;
                tracing::debug!(
                    learner = i,
                    p_bar,
                    rho = self.rhos[i],
                    eta = self.etas[i],
                    "corral: rate threshold doubled"
                );
            }
        }
        Ok(())
    }
}

impl<R: RandomSource> Learner for CorralLearner<R> {
    fn family(&self) -> String {
        "corral".to_string()
    }

    fn params(&self) -> Params {
        let families = self.base.iter().map(|b| Value::Str(b.family())).collect();
        Params::from([
            ("eta".to_string(), Value::Num(self.cfg.eta)),
            ("B".to_string(), Value::Tuple(families)),
        ])
    }

    fn predict(
        &mut self,
        key: Key,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError> {
        require_actions(actions)?;

        let mut round = PendingRound {
            actions: Vec::with_capacity(self.base.len()),
            probs: Vec::with_capacity(self.base.len()),
        };
        for (i, learner) in self.base.iter_mut().enumerate() {
            let probs = learner.predict(key, context, actions)?;
            if probs.len() != actions.len() {
                return Err(LearnerError::invalid(format!(
                    "base learner {i} ({}) returned {} probabilities for {} actions",
                    learner.family(),
                    probs.len(),
                    actions.len()
                )));
            }
            let j = self.rng.choice_index(&probs)?;
            round.actions.push(actions[j].clone());
            round.probs.push(probs[j]);
        }

        // The solver normalizes `p` only to its rounding precision; the reported mix is exact.
        let total: f64 = self.p_bars.iter().sum();
        let mix = actions
            .iter()
            .map(|a| {
                self.p_bars
                    .iter()
                    .zip(&round.actions)
                    .filter(|(_, chosen)| *chosen == a)
                    .map(|(p_bar, _)| p_bar)
                    .sum::<f64>()
                    / total
            })
            .collect();

        if self.pending.insert(key, round).is_some() {
            tracing::debug!(key, "corral: replaced outstanding prediction for key");
        }
        Ok(mix)
    }

    fn learn(
        &mut self,
        key: Key,
        context: Option<&Value>,
        action: &Value,
        reward: f64,
        probability: f64,
    ) -> Result<(), LearnerError> {
        require_nonnegative_loss(reward)?;
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(LearnerError::invalid(format!(
                "probability must be in (0, 1], got {probability}"
            )));
        }

        // Everything that can be rejected is checked before the key is consumed.
        let round = self
            .pending
            .get(&key)
            .ok_or(LearnerError::KeyNotFound(key))?;
        let loss = 1.0 - reward;
        let losses: Vec<f64> = round
            .actions
            .iter()
            .map(|a| if a == action { loss / probability } else { 0.0 })
            .collect();
        if let Some(l) = losses.iter().find(|l| !l.is_finite()) {
            return Err(LearnerError::invalid(format!(
                "importance-weighted loss {l} is not finite (reward {reward}, probability {probability})"
            )));
        }
        let round = self
            .pending
            .remove(&key)
            .ok_or(LearnerError::KeyNotFound(key))?;

        // Every base learner and the mixture are updated even if one base rejects its
        // feedback; the first such error is returned afterwards.
        let mut first_err = None;
        for (i, ((learner, (a, p)), l)) in self
            .base
            .iter_mut()
            .zip(round.actions.iter().zip(&round.probs))
            .zip(&losses)
            .enumerate()
        {
            if let Err(e) = learner.learn(key, context, a, 1.0 - l, *p) {
                tracing::warn!(learner = i, error = %e, "corral: base learner rejected feedback");
                first_err.get_or_insert(e);
            }
        }

        self.update_mixture(&losses)?;
        first_err.map_or(Ok(()), Err)
    }
}

impl<R> std::fmt::Debug for CorralLearner<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorralLearner")
            .field("cfg", &self.cfg)
            .field("base", &self.base.iter().map(|b| b.family()).collect::<Vec<_>>())
            .field("ps", &self.ps)
            .field("p_bars", &self.p_bars)
            .field("etas", &self.etas)
            .field("rhos", &self.rhos)
            .field("pending", &self.pending.len())
            .finish()
    }
}
