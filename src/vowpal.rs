//! Learner backed by an external contextual-bandit solver (Vowpal Wabbit style).
//!
//! The solver itself is out of scope; this module only needs the narrow [`CbSolver`]
//! interface. The learning/exploration mode is a tagged configuration resolved once at
//! construction into a solver flag string, created lazily on the first `predict`.
//!
//! Two learning modes:
//! - [`VwLearning::CbExplore`]: the action set is fixed by the first `predict`; the solver
//!   reports probabilities in that fixed order, which are re-ordered to each caller's order.
//! - [`VwLearning::CbExploreAdf`]: action-dependent features; actions may change per decision
//!   and are carried from `predict` to `learn` by key.

use std::collections::BTreeMap;

use crate::learner::{require_actions, require_finite_reward};
use crate::{Key, Learner, LearnerError, Params, Value};

/// The narrow interface consumed from a native contextual-bandit solver.
pub trait CbSolver {
    /// Whether `create` has been called.
    fn created(&self) -> bool;

    /// One-time initialization from a command-line style flag string.
    fn create(&mut self, flags: &str) -> Result<(), LearnerError>;

    /// One probability per action (in the solver's action order).
    fn predict(
        &mut self,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError>;

    fn learn(
        &mut self,
        probability: f64,
        actions: &[Value],
        context: Option<&Value>,
        action: &Value,
        reward: f64,
    ) -> Result<(), LearnerError>;
}

/// How the solver models actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VwLearning {
    CbExplore,
    CbExploreAdf,
}

impl VwLearning {
    fn name(self) -> &'static str {
        match self {
            VwLearning::CbExplore => "cb_explore",
            VwLearning::CbExploreAdf => "cb_explore_adf",
        }
    }

    fn flags(self, n_actions: usize) -> String {
        match self {
            VwLearning::CbExplore => format!("--cb_explore {n_actions}"),
            VwLearning::CbExploreAdf => "--cb_explore_adf".to_string(),
        }
    }
}

/// Exploration strategy handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VwExploration {
    /// Explore uniformly with probability `epsilon`.
    EpsilonGreedy(f64),
    /// Softmax over scores with inverse temperature `lambda` (0 = uniform).
    Softmax(f64),
    /// Bootstrap-aggregated policies.
    Bagging(u32),
    /// Online cover (Agarwal et al. 2014) with this many policies.
    Cover(u32),
}

impl VwExploration {
    fn name(self) -> &'static str {
        match self {
            VwExploration::EpsilonGreedy(_) => "epsilongreedy",
            VwExploration::Softmax(_) => "softmax",
            VwExploration::Bagging(_) => "bagging",
            VwExploration::Cover(_) => "cover",
        }
    }

    fn flags(self) -> String {
        match self {
            VwExploration::EpsilonGreedy(e) => format!("--epsilon {e}"),
            VwExploration::Softmax(l) => format!("--softmax --lambda {l}"),
            VwExploration::Bagging(n) => format!("--bag {n}"),
            VwExploration::Cover(n) => format!("--cover {n}"),
        }
    }

    fn params(self) -> Params {
        let (k, v) = match self {
            VwExploration::EpsilonGreedy(e) => ("epsilon", e),
            VwExploration::Softmax(l) => ("softmax", l),
            VwExploration::Bagging(n) => ("bag", f64::from(n)),
            VwExploration::Cover(n) => ("cover", f64::from(n)),
        };
        Params::from([(k.to_string(), Value::Num(v))])
    }
}

/// Configuration for [`VowpalLearner`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VowpalConfig {
    pub learning: VwLearning,
    pub exploration: VwExploration,
    /// Seed passed to the solver as `--random_seed`.
    pub seed: Option<u64>,
    /// Extra flags appended verbatim.
    pub flags: String,
}

impl Default for VowpalConfig {
    fn default() -> Self {
        Self {
            learning: VwLearning::CbExploreAdf,
            exploration: VwExploration::EpsilonGreedy(0.025),
            seed: None,
            flags: String::new(),
        }
    }
}

impl VowpalConfig {
    pub fn epsilon(epsilon: f64, adf: bool) -> Self {
        Self {
            learning: if adf {
                VwLearning::CbExploreAdf
            } else {
                VwLearning::CbExplore
            },
            exploration: VwExploration::EpsilonGreedy(epsilon),
            ..Self::default()
        }
    }

    pub fn softmax(lambda: f64) -> Self {
        Self {
            learning: VwLearning::CbExploreAdf,
            exploration: VwExploration::Softmax(lambda),
            ..Self::default()
        }
    }

    pub fn bagging(bag: u32, adf: bool) -> Self {
        Self {
            learning: if adf {
                VwLearning::CbExploreAdf
            } else {
                VwLearning::CbExplore
            },
            exploration: VwExploration::Bagging(bag),
            ..Self::default()
        }
    }

    pub fn cover(cover: u32) -> Self {
        Self {
            learning: VwLearning::CbExplore,
            exploration: VwExploration::Cover(cover),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), LearnerError> {
        match (self.learning, self.exploration) {
            (_, VwExploration::EpsilonGreedy(e)) if !(0.0..=1.0).contains(&e) => Err(
                LearnerError::invalid(format!("epsilon must be in [0, 1], got {e}")),
            ),
            (_, VwExploration::Softmax(l)) if !(l >= 0.0) => Err(LearnerError::invalid(
                format!("softmax lambda must be >= 0, got {l}"),
            )),
            (_, VwExploration::Bagging(0)) | (_, VwExploration::Cover(0)) => Err(
                LearnerError::invalid("bag/cover policy count must be >= 1"),
            ),
            (VwLearning::CbExplore, VwExploration::Softmax(_)) => Err(LearnerError::invalid(
                "softmax exploration requires cb_explore_adf",
            )),
            (VwLearning::CbExploreAdf, VwExploration::Cover(_)) => Err(LearnerError::invalid(
                "cover exploration requires cb_explore",
            )),
            _ => Ok(()),
        }
    }

    /// Full flag string for a solver facing `n_actions` actions.
    pub fn solver_flags(&self, n_actions: usize) -> String {
        let mut parts = vec![self.learning.flags(n_actions), self.exploration.flags()];
        if let Some(seed) = self.seed {
            parts.push(format!("--random_seed {seed}"));
        }
        if !self.flags.trim().is_empty() {
            parts.push(self.flags.trim().to_string());
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
enum ActionMemory {
    /// Action set fixed by the first `predict` (non-ADF).
    Fixed(Option<Vec<Value>>),
    /// Per-key action sets (ADF).
    PerKey(BTreeMap<Key, Vec<Value>>),
}

fn is_permutation(actions: &[Value], fixed: &[Value]) -> bool {
    if actions.len() != fixed.len() {
        return false;
    }
    let mut a: Vec<&Value> = actions.iter().collect();
    let mut b: Vec<&Value> = fixed.iter().collect();
    a.sort();
    b.sort();
    a == b
}

/// Learner delegating to a [`CbSolver`].
#[derive(Debug, Clone)]
pub struct VowpalLearner<S> {
    cfg: VowpalConfig,
    solver: S,
    memory: ActionMemory,
}

impl<S: CbSolver> VowpalLearner<S> {
    pub fn new(solver: S, cfg: VowpalConfig) -> Result<Self, LearnerError> {
        cfg.validate()?;
        let memory = match cfg.learning {
            VwLearning::CbExplore => ActionMemory::Fixed(None),
            VwLearning::CbExploreAdf => ActionMemory::PerKey(BTreeMap::new()),
        };
        Ok(Self {
            cfg,
            solver,
            memory,
        })
    }

    pub fn config(&self) -> &VowpalConfig {
        &self.cfg
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// Number of ADF keys awaiting `learn` (always 0 for non-ADF).
    pub fn pending_len(&self) -> usize {
        match &self.memory {
            ActionMemory::Fixed(_) => 0,
            ActionMemory::PerKey(m) => m.len(),
        }
    }
}

impl<S: CbSolver> Learner for VowpalLearner<S> {
    fn family(&self) -> String {
        format!(
            "vw_{}_{}",
            self.cfg.learning.name(),
            self.cfg.exploration.name()
        )
    }

    fn params(&self) -> Params {
        let mut p = Params::from([(
            "adf".to_string(),
            Value::Num(if self.cfg.learning == VwLearning::CbExploreAdf {
                1.0
            } else {
                0.0
            }),
        )]);
        p.extend(self.cfg.exploration.params());
        p
    }

    fn predict(
        &mut self,
        key: Key,
        context: Option<&Value>,
        actions: &[Value],
    ) -> Result<Vec<f64>, LearnerError> {
        require_actions(actions)?;

        if !self.solver.created() {
            let flags = self.cfg.solver_flags(actions.len());
            tracing::debug!(%flags, "creating contextual-bandit solver");
            self.solver.create(&flags)?;
        }

        match &mut self.memory {
            ActionMemory::PerKey(m) => {
                let probs = self.solver.predict(context, actions)?;
                if probs.len() != actions.len() {
                    return Err(LearnerError::Solver(format!(
                        "solver returned {} probabilities for {} actions",
                        probs.len(),
                        actions.len()
                    )));
                }
                m.insert(key, actions.to_vec());
                Ok(probs)
            }
            ActionMemory::Fixed(fixed) => {
                let fixed = fixed.get_or_insert_with(|| actions.to_vec());
                if !is_permutation(actions, fixed) {
                    return Err(LearnerError::invalid(format!(
                        "a non-ADF solver needs a reordering of its fixed action set \
                         ({} actions), got {} actions",
                        fixed.len(),
                        actions.len()
                    )));
                }
                let probs = self.solver.predict(context, fixed)?;
                if probs.len() != fixed.len() {
                    return Err(LearnerError::Solver(format!(
                        "solver returned {} probabilities for {} actions",
                        probs.len(),
                        fixed.len()
                    )));
                }
                actions
                    .iter()
                    .map(|a| {
                        fixed.iter().position(|f| f == a).map(|i| probs[i]).ok_or_else(|| {
                            LearnerError::invalid(format!(
                                "action {a} is not in the fixed action set of a non-ADF solver"
                            ))
                        })
                    })
                    .collect()
            }
        }
    }

    fn learn(
        &mut self,
        key: Key,
        context: Option<&Value>,
        action: &Value,
        reward: f64,
        probability: f64,
    ) -> Result<(), LearnerError> {
        require_finite_reward(reward)?;
        let actions = match &mut self.memory {
            ActionMemory::PerKey(m) => m.remove(&key).ok_or(LearnerError::KeyNotFound(key))?,
            ActionMemory::Fixed(Some(fixed)) => fixed.clone(),
            ActionMemory::Fixed(None) => return Err(LearnerError::KeyNotFound(key)),
        };
        self.solver
            .learn(probability, &actions, context, action, reward)
    }
}
