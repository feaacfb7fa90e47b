//! `cblearn`: online contextual-bandit learners behind one `predict`/`learn` contract.
//!
//! A [`Learner`] is asked for a distribution over the current actions (`predict`), one action
//! is played, and the observed reward is fed back under the same key (`learn`). The key lets
//! a learner carry per-decision state across the two calls.
//!
//! **Learners:**
//! - [`RandomLearner`]: uniform baseline, learns nothing.
//! - [`EpsilonLearner`]: epsilon-greedy over a lookup table of running averages, keyed by
//!   action or by `(context, action)`.
//! - [`UcbTunedLearner`]: UCB1-Tuned for rewards in `[0, 1]`, with a one-pass warm-up.
//! - [`CorralLearner`]: runs several base learners at once and adapts trust weights between
//!   them with a log-barrier online mirror descent step ([`log_barrier_omd`]).
//! - [`VowpalLearner`]: delegates to an external solver through the narrow [`CbSolver`]
//!   interface, configured by a tagged [`VowpalConfig`].
//!
//! **Goals:**
//! - **Seedable**: the only randomized step ([`CorralLearner`]'s per-base sampling) draws
//!   from an injected [`RandomSource`]; same seed, same trajectory.
//! - **Fail loudly**: protocol violations (unknown key, empty action set, reward out of range)
//!   and root-finding divergence are [`LearnerError`]s, never silent clamps.
//! - **Single-threaded**: learners take `&mut self` and do no internal locking; callers
//!   interleaving decision streams across threads must serialize access per learner.
//!
//! **Non-goals:**
//! - No benchmarking harness, dataset loading, or result persistence.
//! - No native solver: [`VowpalLearner`] only defines what it needs from one.
//!
//! # Example
//!
//! ```rust
//! use cblearn::{
//!     CorralConfig, CorralLearner, EpsilonConfig, EpsilonLearner, Learner, RandomLearner,
//!     UcbTunedLearner, Value,
//! };
//!
//! let base: Vec<Box<dyn Learner>> = vec![
//!     Box::new(RandomLearner::new()),
//!     Box::new(EpsilonLearner::new(EpsilonConfig::default()).unwrap()),
//!     Box::new(UcbTunedLearner::new()),
//! ];
//! let mut corral = CorralLearner::new(
//!     base,
//!     CorralConfig { eta: 0.1, horizon: 1_000.0, seed: 7, ..CorralConfig::default() },
//! )
//! .unwrap();
//!
//! let actions = vec![Value::from("left"), Value::from("right")];
//! for key in 0..10u64 {
//!     let probs = corral.predict(key, None, &actions).unwrap();
//!     let i = if probs[0] > 0.0 { 0 } else { 1 };
//!     let reward = if i == 0 { 1.0 } else { 0.0 };
//!     corral.learn(key, None, &actions[i], reward, probs[i]).unwrap();
//! }
//! assert_eq!(corral.pending_len(), 0);
//! ```
//!
//! ## References
//!
//! - Auer, Cesa-Bianchi & Fischer (2002). Finite-time analysis of the multiarmed bandit
//!   problem. *Machine Learning* 47, 235-256. (UCB1-Tuned)
//! - Agarwal, Luo, Neyshabur & Schapire (2017). Corralling a band of bandit algorithms.
//!   COLT; arXiv:1612.06246. (CORRAL, log-barrier OMD)
//! - Agarwal, Hsu, Kale, Langford, Li & Schapire (2014). Taming the monster: a fast and
//!   simple algorithm for contextual bandits. ICML. (online cover exploration)

#![forbid(unsafe_code)]

mod value;
pub use value::*;

mod error;
pub use error::*;

mod learner;
pub use learner::Learner;

mod sampling;
pub use sampling::*;

mod variance;
pub use variance::*;

mod random;
pub use random::*;

mod epsilon;
pub use epsilon::*;

mod ucb;
pub use ucb::*;

mod log_barrier;
pub use log_barrier::*;

mod corral;
pub use corral::*;

mod vowpal;
pub use vowpal::*;
