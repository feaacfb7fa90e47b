//! The `Learner` contract shared by every policy in this crate.
//!
//! A caller issues `predict(key, ..)` once per decision, plays one action, then issues exactly
//! one `learn(key, ..)` for the same key. The key lets a learner carry per-decision state from
//! `predict` to `learn` (see [`CorralLearner`](crate::CorralLearner)).

use crate::{Key, LearnerError, Params, Value};

/// Common interface for online contextual-bandit learners.
///
/// # Example
///
/// ```rust
/// use cblearn::{EpsilonConfig, EpsilonLearner, Learner, RandomLearner, Value};
///
/// fn play<L: Learner>(learner: &mut L, actions: &[Value]) -> Result<(), cblearn::LearnerError> {
///     let probs = learner.predict(0, None, actions)?;
///     let chosen = &actions[0];
///     learner.learn(0, None, chosen, 1.0, probs[0])
/// }
///
/// let actions = vec![Value::from("a"), Value::from("b")];
/// play(&mut RandomLearner::new(), &actions).unwrap();
/// play(&mut EpsilonLearner::new(EpsilonConfig::default()).unwrap(), &actions).unwrap();
/// ```
pub trait Learner {
    /// Short descriptive name of the algorithm family (for reporting only).
    fn family(&self) -> String;

    /// Descriptive construction parameters (for reporting only).
    fn params(&self) -> Params;

    /// Return one probability per action in `actions`, summing to 1.
    ///
    /// `context` is `None` in the pure (non-contextual) bandit setting.
    fn predict(
        &mut self,
        key: Key,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError>;

    /// Observe `reward` for `action`, which was played with `probability`.
    fn learn(
        &mut self,
        key: Key,
        context: Option<&Value>,
        action: &Value,
        reward: f64,
        probability: f64,
    ) -> Result<(), LearnerError>;
}

impl<L: Learner + ?Sized> Learner for Box<L> {
    fn family(&self) -> String {
        (**self).family()
    }

    fn params(&self) -> Params {
        (**self).params()
    }

    fn predict(
        &mut self,
        key: Key,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError> {
        (**self).predict(key, context, actions)
    }

    fn learn(
        &mut self,
        key: Key,
        context: Option<&Value>,
        action: &Value,
        reward: f64,
        probability: f64,
    ) -> Result<(), LearnerError> {
        (**self).learn(key, context, action, reward, probability)
    }
}

pub(crate) fn require_actions(actions: &[Value]) -> Result<(), LearnerError> {
    if actions.is_empty() {
        return Err(LearnerError::invalid("action set must be non-empty"));
    }
    Ok(())
}

pub(crate) fn require_finite_reward(reward: f64) -> Result<(), LearnerError> {
    if !reward.is_finite() {
        return Err(LearnerError::invalid(format!(
            "reward must be finite, got {reward}"
        )));
    }
    Ok(())
}

/// Rewards may be importance-weighted (and so negative) but the loss `1 - reward` must be
/// a finite non-negative number.
pub(crate) fn require_nonnegative_loss(reward: f64) -> Result<(), LearnerError> {
    require_finite_reward(reward)?;
    if reward > 1.0 {
        return Err(LearnerError::invalid(format!(
            "reward must be at most 1, got {reward}"
        )));
    }
    Ok(())
}

/// Split probability mass uniformly over the indices holding the maximal score.
///
/// `None` and non-finite scores never win unless no score is finite, in which case all
/// indices tie. Ties use exact float equality.
pub(crate) fn uniform_over_max(scores: &[Option<f64>]) -> Vec<f64> {
    let scores: Vec<Option<f64>> = scores
        .iter()
        .map(|s| s.filter(|x| x.is_finite()))
        .collect();
    let max = scores
        .iter()
        .flatten()
        .copied()
        .fold(None, |acc: Option<f64>, x| match acc {
            Some(m) if m >= x => Some(m),
            _ => Some(x),
        });
    let winners: Vec<bool> = scores.iter().map(|s| *s == max).collect();
    let n = winners.iter().filter(|&&w| w).count().max(1) as f64;
    winners
        .into_iter()
        .map(|w| if w { 1.0 / n } else { 0.0 })
        .collect()
}
