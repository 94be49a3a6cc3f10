use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use notch_core::{Colony, ColonyConfig, DecayDelay};
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn bench_colony_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("colony_step");
    let samples: usize = env_or("NOTCH_BENCH_SAMPLES", 30_usize).max(10);
    group.sample_size(samples);
    group.warm_up_time(Duration::from_secs(env_or("NOTCH_BENCH_WARMUP_SECS", 2)));
    group.measurement_time(Duration::from_secs(env_or("NOTCH_BENCH_MEASURE_SECS", 10)));
    let steps: usize = env_or("NOTCH_BENCH_STEPS", 64_usize).max(1);
    let sizes: Vec<usize> = std::env::var("NOTCH_BENCH_SIZES")
        .ok()
        .map(|s| {
            s.split(',')
                .filter_map(|t| t.trim().parse::<usize>().ok())
                .filter(|v| *v > 0)
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| vec![100_usize, 250, 500]);

    for &size in &sizes {
        for tau in [DecayDelay::Finite(5.0), DecayDelay::Unbounded] {
            group.bench_function(format!("steps{steps}_grid{size}_tau{tau}"), |b| {
                b.iter_batched(
                    || {
                        let config = ColonyConfig {
                            rng_seed: Some(0xBEEF),
                            history_capacity: 1,
                            ..ColonyConfig::new(size, size, tau, 0.5)
                        };
                        Colony::new(config).expect("colony")
                    },
                    |mut colony| {
                        colony.run(steps);
                        colony
                    },
                    BatchSize::LargeInput,
                );
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_colony_steps);
criterion_main!(benches);
