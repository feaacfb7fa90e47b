//! Uniform baseline learner.

use crate::learner::{require_actions, require_finite_reward};
use crate::{Key, Learner, LearnerError, Params, Value};

/// Plays uniformly at random and learns nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomLearner;

impl RandomLearner {
    pub fn new() -> Self {
        Self
    }
}

impl Learner for RandomLearner {
    fn family(&self) -> String {
        "random".to_string()
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
        Ok(vec![1.0 / actions.len() as f64; actions.len()])
    }

    fn learn(
        &mut self,
        _key: Key,
        _context: Option<&Value>,
        _action: &Value,
        reward: f64,
        _probability: f64,
    ) -> Result<(), LearnerError> {
        require_finite_reward(reward)
    }
}
