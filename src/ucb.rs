//! UCB1-Tuned (Auer, Cesa-Bianchi & Fischer 2002) for rewards with support in `[0, 1]`.
//!
//! Policy:
//! - Warm-up: the first `len(actions)` predictions play each action once, one-hot, in order.
//! - Then: play uniformly over the actions maximizing
//!   `m[a] + sqrt(ln(t)/s[a] * min(1/4, var[a] + sqrt(2 ln(t)/s[a])))`.
//!
//! Actions never pulled have no score and never win unless no action has one.

use std::collections::BTreeMap;

use crate::learner::{require_actions, require_finite_reward, uniform_over_max};
use crate::{Key, Learner, LearnerError, OnlineVariance, Params, Value};

/// Upper bound on the variance of a `[0, 1]`-supported reward.
const MAX_VARIANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, Default)]
struct ArmStats {
    pulls: u64,
    mean: f64,
    var: OnlineVariance,
}

/// UCB1-Tuned bandit learner (context is ignored).
#[derive(Debug, Clone, Default)]
pub struct UcbTunedLearner {
    warmed: usize,
    t: u64,
    arms: BTreeMap<Value, ArmStats>,
}

impl UcbTunedLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of observed rewards.
    pub fn pulls(&self) -> u64 {
        self.t
    }

    /// Empirical mean reward for `action`, if it has been pulled.
    pub fn mean(&self, action: &Value) -> Option<f64> {
        self.arms.get(action).map(|s| s.mean)
    }

    /// Upper confidence bound for `action`, if it has been pulled.
    pub fn upper_bound(&self, action: &Value) -> Option<f64> {
        let s = self.arms.get(action)?;
        if s.pulls == 0 || self.t == 0 {
            return None;
        }
        let ln_t = (self.t as f64).ln();
        let n = s.pulls as f64;
        let var_bound = match s.var.variance() {
            Some(v) => (v + (2.0 * ln_t / n).sqrt()).min(MAX_VARIANCE),
            None => MAX_VARIANCE,
        };
        Some(s.mean + (ln_t / n * var_bound).sqrt())
    }
}

impl Learner for UcbTunedLearner {
    fn family(&self) -> String {
        "bandit_UCB".to_string()
    }

    fn params(&self) -> Params {
        Params::new()
    }

    fn predict(
        &mut self,
        _key: Key,
        _context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError> {
        require_actions(actions)?;

        if self.warmed < actions.len() {
            let i = self.warmed;
            self.warmed += 1;
            tracing::trace!(index = i, "ucb warm-up pick");
            return Ok((0..actions.len())
                .map(|j| if j == i { 1.0 } else { 0.0 })
                .collect());
        }

        let scores: Vec<Option<f64>> = actions.iter().map(|a| self.upper_bound(a)).collect();
        Ok(uniform_over_max(&scores))
    }

    fn learn(
        &mut self,
        _key: Key,
        _context: Option<&Value>,
        action: &Value,
        reward: f64,
        _probability: f64,
    ) -> Result<(), LearnerError> {
        require_finite_reward(reward)?;
        let s = self.arms.entry(action.clone()).or_default();
        if s.pulls == 0 {
            s.mean = reward;
        } else {
            // Step size uses the pull count before this observation is counted.
            let step = 1.0 / s.pulls as f64;
            s.mean = (1.0 - step) * s.mean + step * reward;
        }
        s.pulls = s.pulls.saturating_add(1);
        s.var.update(reward);
        self.t = self.t.saturating_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn actions(n: i32) -> Vec<Value> {
        (0..n).map(Value::from).collect()
    }

    #[test]
    fn warm_up_plays_each_action_once_in_order() {
        let mut u = UcbTunedLearner::new();
        let a = actions(3);
        for i in 0..3 {
            let p = u.predict(i as Key, None, &a).unwrap();
            let expected: Vec<f64> = (0..3).map(|j| if j == i { 1.0 } else { 0.0 }).collect();
            assert_eq!(p, expected);
            u.learn(i as Key, None, &a[i], 0.5, 1.0).unwrap();
        }
    }

    #[test]
    fn first_observation_sets_the_mean_exactly() {
        let mut u = UcbTunedLearner::new();
        let a = Value::from("x");
        u.learn(0, None, &a, 0.3, 1.0).unwrap();
        assert_eq!(u.mean(&a), Some(0.3));
        assert_eq!(u.pulls(), 1);
    }

    #[test]
    fn steady_state_prefers_the_better_arm() {
        let mut u = UcbTunedLearner::new();
        let a = actions(2);
        let mut picks = [0usize; 2];
        for k in 0..200u64 {
            let p = u.predict(k, None, &a).unwrap();
            let i = if p[0] >= p[1] { 0 } else { 1 };
            picks[i] += 1;
            let r = if i == 0 { 0.9 } else { 0.1 };
            u.learn(k, None, &a[i], r, p[i]).unwrap();
        }
        assert!(picks[0] > 180, "picks={picks:?}");
        assert!(u.mean(&a[0]).unwrap() > u.mean(&a[1]).unwrap());
    }

    #[test]
    fn unpulled_actions_are_excluded_after_warm_up() {
        let mut u = UcbTunedLearner::new();
        let a = actions(2);
        u.predict(0, None, &a).unwrap();
        u.learn(0, None, &a[0], 0.0, 1.0).unwrap();
        u.predict(1, None, &a).unwrap();
        u.learn(1, None, &a[1], 0.0, 1.0).unwrap();

        // A fresh action has no bound and cannot win against scored ones.
        let swapped = vec![Value::from(99), a[0].clone()];
        let p = u.predict(2, None, &swapped).unwrap();
        assert_eq!(p, vec![0.0, 1.0]);
    }

    #[test]
    fn rejects_non_finite_reward() {
        let mut u = UcbTunedLearner::new();
        assert!(u.learn(0, None, &Value::from(0), f64::NAN, 1.0).is_err());
    }

    proptest! {
        #[test]
        fn predict_is_a_distribution(
            n_actions in 1i32..6,
            rewards in proptest::collection::vec(0.0f64..=1.0, 0..80),
        ) {
            let mut u = UcbTunedLearner::new();
            let a = actions(n_actions);
            for (k, r) in rewards.into_iter().enumerate() {
                let p = u.predict(k as Key, None, &a).unwrap();
                prop_assert_eq!(p.len(), a.len());
                let s: f64 = p.iter().sum();
                prop_assert!((s - 1.0).abs() < 1e-6, "sum={}", s);
                prop_assert!(p.iter().all(|x| *x >= 0.0 && x.is_finite()));
                let i = p.iter().position(|x| *x > 0.0).unwrap();
                u.learn(k as Key, None, &a[i], r, p[i]).unwrap();
            }
        }
    }
}
