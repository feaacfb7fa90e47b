//! Contract checks shared by every learner: distributions over the offered actions,
//! empty action sets rejected, and learn accepted for any predicted key.

use cblearn::{
    CorralConfig, CorralLearner, EpsilonConfig, EpsilonLearner, Key, Learner, LearnerError,
    RandomLearner, UcbTunedLearner, Value,
};
use proptest::prelude::*;

fn learners() -> Vec<Box<dyn Learner>> {
    let corral_base: Vec<Box<dyn Learner>> = vec![
        Box::new(RandomLearner::new()),
        Box::new(EpsilonLearner::new(EpsilonConfig::default()).unwrap()),
        Box::new(UcbTunedLearner::new()),
    ];
    vec![
        Box::new(RandomLearner::new()),
        Box::new(
            EpsilonLearner::new(EpsilonConfig {
                epsilon: 0.2,
                include_context: true,
            })
            .unwrap(),
        ),
        Box::new(UcbTunedLearner::new()),
        Box::new(CorralLearner::new(corral_base, CorralConfig::default()).unwrap()),
    ]
}

fn actions(n: usize) -> Vec<Value> {
    (0..n).map(|i| Value::from(format!("a{i}"))).collect()
}

#[test]
fn families_are_distinct() {
    let families: Vec<String> = learners().iter().map(|l| l.family()).collect();
    assert_eq!(
        families,
        vec!["random", "cb_epsilongreedy", "bandit_UCB", "corral"]
    );
}

#[test]
fn empty_action_sets_are_rejected() {
    for mut l in learners() {
        let err = l.predict(0, None, &[]).unwrap_err();
        assert!(
            matches!(err, LearnerError::InvalidArgument(_)),
            "{}: {err:?}",
            l.family()
        );
    }
}

#[test]
fn non_finite_rewards_are_rejected() {
    let a = actions(2);
    for mut l in learners() {
        let p = l.predict(0, None, &a).unwrap();
        let i = p.iter().position(|x| *x > 0.0).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = l.learn(0, None, &a[i], bad, p[i]).unwrap_err();
            assert!(
                matches!(err, LearnerError::InvalidArgument(_)),
                "{}: reward {bad}: {err:?}",
                l.family()
            );
        }
        // The rejected rewards leave the round open for a valid one.
        l.learn(0, None, &a[i], 0.5, p[i]).unwrap();
    }
}

#[test]
fn single_action_gets_all_the_mass() {
    for mut l in learners() {
        let a = actions(1);
        for key in 0..5u64 {
            let p = l.predict(key, None, &a).unwrap();
            assert_eq!(p.len(), 1);
            assert!((p[0] - 1.0).abs() < 1e-9, "{}: {p:?}", l.family());
            l.learn(key, None, &a[0], 0.5, p[0]).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn predict_returns_a_distribution_for_every_learner(
        n_actions in 1usize..6,
        rounds in proptest::collection::vec((0.0f64..=1.0, 0u8..3), 1..40),
    ) {
        let a = actions(n_actions);
        for mut l in learners() {
            for (k, (reward, ctx)) in rounds.iter().enumerate() {
                let key = k as Key;
                let context = Value::from(i64::from(*ctx));
                let p = l.predict(key, Some(&context), &a).unwrap();
                prop_assert_eq!(p.len(), a.len());
                prop_assert!(p.iter().all(|x| x.is_finite() && *x >= 0.0), "{:?}", p);
                let s: f64 = p.iter().sum();
                prop_assert!((s - 1.0).abs() < 1e-9, "{}: sum={}", l.family(), s);

                let i = p.iter().position(|x| *x > 0.0).unwrap();
                let learned = l.learn(key, Some(&context), &a[i], *reward, p[i]);
                prop_assert!(learned.is_ok(), "{}: key {}: {:?}", l.family(), key, learned);
            }
        }
    }
}
