use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use queue_sim::models::Distribution;
use queue_sim::sources::{CongruentialRng, SeededSource, UnitSource};
use queue_sim::workload::sample_many;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAMPLES: usize = 100_000;

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");
    let distributions = [
        Distribution::Uniform { min: 4.0, max: 12.0 },
        Distribution::Exponential { rate: 0.25 },
        Distribution::Weibull {
            scale: 2.0,
            shape: 1.5,
        },
    ];

    for distribution in distributions {
        group.bench_with_input(
            BenchmarkId::new("seeded", distribution.to_string()),
            &distribution,
            |b, distribution| {
                b.iter(|| {
                    let mut source: Box<dyn UnitSource> =
                        Box::new(SeededSource::new(StdRng::seed_from_u64(7)));
                    black_box(sample_many(distribution, source.as_mut(), SAMPLES));
                });
            },
        );
        group.bench_with_input(
            BenchmarkId::new("congruential", distribution.to_string()),
            &distribution,
            |b, distribution| {
                b.iter(|| {
                    let mut source = CongruentialRng::new(22_695_477, 1, 1 << 32, 1)
                        .expect("generator parameters are valid");
                    black_box(sample_many(distribution, &mut source, SAMPLES));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_sampling);
criterion_main!(benches);
