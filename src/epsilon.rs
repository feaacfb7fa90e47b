//! Epsilon-greedy over a lookup table of running reward averages.
//!
//! No function approximation: estimates are kept per `(context, action)` pair, or per action
//! when `include_context` is off. An entry exists only once the pair has been observed, so
//! "never observed" is never confused with "observed, average 0".

use std::collections::BTreeMap;

use crate::learner::{require_actions, require_finite_reward, uniform_over_max};
use crate::{Key, Learner, LearnerError, Params, Value};

/// Configuration for [`EpsilonLearner`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpsilonConfig {
    /// Probability mass spread uniformly over all actions (exploration), in `[0, 1]`.
    pub epsilon: f64,
    /// Key the table by `(context, action)` instead of `action` alone.
    pub include_context: bool,
}

impl Default for EpsilonConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.1,
            include_context: false,
        }
    }
}

/// Running average reward for one table entry.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Estimate {
    pub mean: f64,
    pub count: u64,
}

type TableKey = (Option<Value>, Value);

/// Epsilon-greedy learner with an optional context-keyed table.
#[derive(Debug, Clone)]
pub struct EpsilonLearner {
    cfg: EpsilonConfig,
    table: BTreeMap<TableKey, Estimate>,
}

impl EpsilonLearner {
    pub fn new(cfg: EpsilonConfig) -> Result<Self, LearnerError> {
        if !(0.0..=1.0).contains(&cfg.epsilon) {
            return Err(LearnerError::invalid(format!(
                "epsilon must be in [0, 1], got {}",
                cfg.epsilon
            )));
        }
        Ok(Self {
            cfg,
            table: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> EpsilonConfig {
        self.cfg
    }

    /// Current estimate for `action` (in `context`, if contexts are included).
    pub fn estimate(&self, context: Option<&Value>, action: &Value) -> Option<Estimate> {
        self.table.get(&self.table_key(context, action)).copied()
    }

    fn table_key(&self, context: Option<&Value>, action: &Value) -> TableKey {
        let context = if self.cfg.include_context {
            context.cloned()
        } else {
            None
        };
        (context, action.clone())
    }
}

impl Learner for EpsilonLearner {
    fn family(&self) -> String {
        if self.cfg.include_context {
            "cb_epsilongreedy".to_string()
        } else {
            "bandit_epsilongreedy".to_string()
        }
    }

    fn params(&self) -> Params {
        Params::from([("epsilon".to_string(), Value::Num(self.cfg.epsilon))])
    }

    fn predict(
        &mut self,
        _key: Key,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError> {
        require_actions(actions)?;

        let scores: Vec<Option<f64>> = actions
            .iter()
            .map(|a| self.estimate(context, a).map(|e| e.mean))
            .collect();
        let greedy = uniform_over_max(&scores);

        let eps = self.cfg.epsilon;
        let explore = eps / actions.len() as f64;
        Ok(greedy
            .into_iter()
            .map(|g| explore + (1.0 - eps) * g)
            .collect())
    }

    fn learn(
        &mut self,
        _key: Key,
        context: Option<&Value>,
        action: &Value,
        reward: f64,
        _probability: f64,
    ) -> Result<(), LearnerError> {
        require_finite_reward(reward)?;
        let key = self.table_key(context, action);
        let e = self.table.entry(key).or_insert(Estimate {
            mean: 0.0,
            count: 0,
        });
        e.mean += (reward - e.mean) / (e.count + 1) as f64;
        e.count = e.count.saturating_add(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ab() -> Vec<Value> {
        vec![Value::from("A"), Value::from("B")]
    }

    fn learner(epsilon: f64, include_context: bool) -> EpsilonLearner {
        EpsilonLearner::new(EpsilonConfig {
            epsilon,
            include_context,
        })
        .unwrap()
    }

    #[test]
    fn epsilon_one_is_uniform_regardless_of_state() {
        let mut l = learner(1.0, false);
        let actions = ab();
        l.learn(0, None, &actions[0], 1.0, 0.5).unwrap();
        l.learn(1, None, &actions[1], 0.0, 0.5).unwrap();
        assert_eq!(l.predict(2, None, &actions).unwrap(), vec![0.5, 0.5]);
    }

    #[test]
    fn epsilon_zero_exploits_the_only_rewarded_action() {
        let mut l = learner(0.0, false);
        let actions = ab();
        l.learn(0, None, &actions[0], 1.0, 0.5).unwrap();
        assert_eq!(l.predict(1, None, &actions).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn unobserved_actions_all_tie() {
        let mut l = learner(0.2, false);
        let p = l.predict(0, None, &ab()).unwrap();
        assert!(p.iter().all(|x| (x - 0.5).abs() < 1e-12), "p={p:?}");
    }

    #[test]
    fn observed_zero_beats_never_observed() {
        let mut l = learner(0.0, false);
        let actions = ab();
        l.learn(0, None, &actions[1], 0.0, 1.0).unwrap();
        assert_eq!(l.predict(1, None, &actions).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn running_average_is_incremental_mean() {
        let mut l = learner(0.1, false);
        let a = Value::from("A");
        for (k, r) in [1.0, 0.0, 0.5, 0.5].into_iter().enumerate() {
            l.learn(k as Key, None, &a, r, 1.0).unwrap();
        }
        let e = l.estimate(None, &a).unwrap();
        assert_eq!(e.count, 4);
        assert!((e.mean - 0.5).abs() < 1e-12);
    }

    #[test]
    fn context_separates_tables_only_when_enabled() {
        let hot = Value::from("hot");
        let cold = Value::from("cold");
        let actions = ab();

        let mut with_ctx = learner(0.0, true);
        with_ctx.learn(0, Some(&hot), &actions[0], 1.0, 1.0).unwrap();
        assert_eq!(with_ctx.predict(1, Some(&hot), &actions).unwrap(), vec![1.0, 0.0]);
        assert_eq!(with_ctx.predict(2, Some(&cold), &actions).unwrap(), vec![0.5, 0.5]);
        assert_eq!(with_ctx.family(), "cb_epsilongreedy");

        let mut without_ctx = learner(0.0, false);
        without_ctx.learn(0, Some(&hot), &actions[0], 1.0, 1.0).unwrap();
        assert_eq!(without_ctx.predict(1, Some(&cold), &actions).unwrap(), vec![1.0, 0.0]);
        assert_eq!(without_ctx.family(), "bandit_epsilongreedy");
    }

    #[test]
    fn rejects_out_of_range_epsilon() {
        for eps in [-0.1, 1.1, f64::NAN] {
            assert!(EpsilonLearner::new(EpsilonConfig {
                epsilon: eps,
                include_context: false
            })
            .is_err());
        }
    }

    #[test]
    fn params_report_epsilon() {
        let l = learner(0.25, false);
        assert_eq!(l.params().get("epsilon"), Some(&Value::Num(0.25)));
    }

    proptest! {
        #[test]
        fn predict_is_a_distribution(
            epsilon in 0.0f64..=1.0,
            n_actions in 1usize..8,
            history in proptest::collection::vec((0usize..8, 0.0f64..1.0), 0..50),
        ) {
            let mut l = learner(epsilon, false);
            let actions: Vec<Value> = (0..n_actions as i32).map(Value::from).collect();
            for (k, (a, r)) in history.into_iter().enumerate() {
                l.learn(k as Key, None, &actions[a % n_actions], r, 1.0).unwrap();
            }
            let p = l.predict(0, None, &actions).unwrap();
            prop_assert_eq!(p.len(), n_actions);
            let s: f64 = p.iter().sum();
            prop_assert!((s - 1.0).abs() < 1e-6, "sum={}", s);
            prop_assert!(p.iter().all(|x| *x >= 0.0 && x.is_finite()));
        }
    }
}
