use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use queue_sim::engine::run_simulation_with_options;
use queue_sim::models::{
    ArrivalSource, Distribution, GeneratorConfig, ServiceSource, SimConfig, SimOptions,
    SimulationInput,
};
use queue_sim::workload::build_input;

const JOBS: usize = 100_000;

fn build_workload(buffer_capacity: i64) -> SimulationInput {
    let config = SimConfig {
        arrivals: ArrivalSource::Interarrival(Distribution::Exponential { rate: 1.0 / 3.0 }),
        service: ServiceSource::Sampled(Distribution::Exponential { rate: 1.0 / 4.0 }),
        jobs: Some(JOBS),
        buffer_capacity,
        generator: GeneratorConfig::Seeded,
        seed: Some(42),
        detailed: false,
        tie_epsilon: 1e-9,
    };
    build_input(&config).expect("workload should build")
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");

    for buffer_capacity in [0, 10, 100] {
        let input = build_workload(buffer_capacity);
        for (label, options) in [
            ("basic", SimOptions::default()),
            ("detailed", SimOptions::detailed()),
        ] {
            group.bench_with_input(
                BenchmarkId::new(label, format!("{}xK{}", JOBS, buffer_capacity)),
                &input,
                |b, input: &SimulationInput| {
                    b.iter_batched(
                        || input.clone(),
                        |input| {
                            let result = run_simulation_with_options(&input, &options)
                                .expect("simulation should succeed");
                            black_box(result);
                        },
                        BatchSize::LargeInput,
                    );
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
