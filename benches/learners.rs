use cblearn::{
    log_barrier_omd, CorralConfig, CorralLearner, EpsilonConfig, EpsilonLearner, Learner,
    LogBarrierConfig, RandomLearner, RandomSource, UcbTunedLearner, Value,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

fn corral(seed: u64) -> CorralLearner {
    let base: Vec<Box<dyn Learner>> = vec![
        Box::new(RandomLearner::new()),
        Box::new(EpsilonLearner::new(EpsilonConfig::default()).unwrap()),
        Box::new(UcbTunedLearner::new()),
    ];
    CorralLearner::new(
        base,
        CorralConfig {
            horizon: 10_000.0,
            seed,
            ..CorralConfig::default()
        },
    )
    .unwrap()
}

fn bench_rounds(c: &mut Criterion) {
    let rounds = 512u64;
    let mut group = c.benchmark_group("learner_rounds");

    for n_actions in [2usize, 8, 32] {
        let actions: Vec<Value> = (0..n_actions).map(|i| Value::from(i as i64)).collect();

        group.bench_with_input(
            BenchmarkId::new("epsilon", n_actions),
            &actions,
            |b, actions| {
                b.iter(|| {
                    let mut l = EpsilonLearner::new(EpsilonConfig::default()).unwrap();
                    let mut play = StdRng::seed_from_u64(1);
                    for key in 0..rounds {
                        let p = l.predict(key, None, actions).unwrap();
                        let i = play.choice_index(&p).unwrap();
                        // Reward favors low indices.
                        let r = 1.0 / (1.0 + i as f64);
                        l.learn(key, None, &actions[i], r, p[i]).unwrap();
                    }
                    black_box(l);
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("corral", n_actions), &actions, |b, actions| {
            b.iter(|| {
                let mut l = corral(7);
                let mut play = StdRng::seed_from_u64(1);
                for key in 0..rounds {
                    let p = l.predict(key, None, actions).unwrap();
                    let i = play.choice_index(&p).unwrap();
                    let r = 1.0 / (1.0 + i as f64);
                    // A failed solve ends the run; the bench measures the common path.
                    if l.learn(key, None, &actions[i], r, p[i]).is_err() {
                        break;
                    }
                }
                black_box(l.smoothed_weights().to_vec());
            })
        });
    }
    group.finish();
}

fn bench_log_barrier(c: &mut Criterion) {
    let cfg = LogBarrierConfig::default();
    let mut group = c.benchmark_group("log_barrier_omd");

    for m in [2usize, 8, 32] {
        let ps = vec![1.0 / m as f64; m];
        let etas = vec![0.1; m];
        // One learner charged a large importance-weighted loss, the rest nothing.
        let mut losses = vec![0.0; m];
        losses[m - 1] = 20.0;

        group.bench_with_input(BenchmarkId::from_parameter(m), &m, |b, _| {
            b.iter(|| black_box(log_barrier_omd(&ps, &etas, &losses, &cfg)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rounds, bench_log_barrier);
criterion_main!(benches);
