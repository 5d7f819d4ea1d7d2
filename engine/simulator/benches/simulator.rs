//! Simulator benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p simulator`
//!
//! These benchmarks measure:
//! - Iteration throughput at several ply depths
//! - Serial vs rayon batch execution
//! - Rollout cost in isolation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use game_core::tile::tiles_from_letters;
use game_core::Rack;
use games_wordgrid::{scored_place, WordgridPosition};
use simulator::randomize::{randomize_drawing_order, randomize_opponent_racks};
use simulator::{LogisticWinEstimator, RolloutEngine, SimmedMove, Simulator};

/// A midgame-ish position with a meaty bag and three candidates.
fn bench_position() -> WordgridPosition {
    WordgridPosition::builder()
        .player("AEINRST")
        .player("BCDGLMO")
        .bag("AAEEIIOOUUBFHKPVWXYZNNRRSSTTLLDDGG")
        .candidates(vec![
            scored_place(tiles_from_letters("AE")),
            scored_place(tiles_from_letters("IN")),
            scored_place(tiles_from_letters("RST")),
        ])
        .build()
}

fn bench_simulate_plies(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_plies");

    for plies in [0i32, 2, 4] {
        group.throughput(Throughput::Elements(20));
        group.bench_with_input(BenchmarkId::new("serial", plies), &plies, |b, &plies| {
            b.iter(|| {
                let mut sim =
                    Simulator::new(bench_position(), LogisticWinEstimator::new()).with_seed(42);
                sim.simulate(plies, 20).unwrap();
                black_box(sim.iterations())
            });
        });
    }

    group.finish();
}

fn bench_serial_vs_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulate_batch");
    let iterations = 64u32;
    group.throughput(Throughput::Elements(u64::from(iterations)));

    group.bench_function("serial", |b| {
        b.iter(|| {
            let mut sim =
                Simulator::new(bench_position(), LogisticWinEstimator::new()).with_seed(7);
            sim.simulate(2, iterations).unwrap();
            black_box(sim.iterations())
        });
    });

    group.bench_function("parallel", |b| {
        b.iter(|| {
            let mut sim =
                Simulator::new(bench_position(), LogisticWinEstimator::new()).with_seed(7);
            sim.simulate_parallel(2, iterations).unwrap();
            black_box(sim.iterations())
        });
    });

    group.finish();
}

fn bench_single_rollout(c: &mut Criterion) {
    let mut group = c.benchmark_group("rollout");

    group.bench_function("two_plies", |b| {
        let estimator = LogisticWinEstimator::new();
        let mut position = bench_position();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        randomize_opponent_racks(&mut position, &Rack::new(), &mut rng).unwrap();
        randomize_drawing_order(&mut position, &mut rng).unwrap();
        let candidate = SimmedMove::new(scored_place(tiles_from_letters("AE")));

        b.iter(|| {
            let engine = RolloutEngine::new(&position, &estimator, 2, false);
            black_box(engine.run(&candidate).unwrap())
        });
    });

    group.bench_function("unbounded_plies", |b| {
        let estimator = LogisticWinEstimator::new();
        let mut position = bench_position();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        randomize_opponent_racks(&mut position, &Rack::new(), &mut rng).unwrap();
        randomize_drawing_order(&mut position, &mut rng).unwrap();
        let candidate = SimmedMove::new(scored_place(tiles_from_letters("AE")));

        b.iter(|| {
            let engine = RolloutEngine::new(&position, &estimator, -1, false);
            black_box(engine.run(&candidate).unwrap())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_simulate_plies,
    bench_serial_vs_parallel,
    bench_single_rollout,
);

criterion_main!(benches);
