//! Error type shared by every learner.

use thiserror::Error;

use crate::Key;

/// Failure conditions surfaced by [`Learner`](crate::Learner) implementations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnerError {
    /// A precondition was violated (empty action set, reward out of range, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `learn` was called for a key with no outstanding `predict` (or twice for the same key).
    #[error("no outstanding prediction for key {0}")]
    KeyNotFound(Key),

    /// The log-barrier projection failed to find a normalizing multiplier.
    #[error("log-barrier root search diverged: {reason} (p={ps:?}, eta={etas:?}, losses={losses:?})")]
    OptimizationDivergence {
        reason: String,
        ps: Vec<f64>,
        etas: Vec<f64>,
        losses: Vec<f64>,
    },

    /// The external contextual-bandit solver reported a failure.
    #[error("solver error: {0}")]
    Solver(String),
}

impl LearnerError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        LearnerError::InvalidArgument(msg.into())
    }
}
