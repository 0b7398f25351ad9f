//! Session step throughput.
//!
//! Measures how long one tick takes on grids of increasing size, how much a
//! long escort trail adds, and what the state hash costs.
//!
//! Run with: `cargo bench --bench session_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use fishgrid_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A session that never spawns pickups, so it can be stepped indefinitely
/// without filling the grid.
fn steady_session(side: i32, fish_colors: u8) -> Session {
    Session::with_config(SessionConfig {
        width: side,
        height: side,
        seed: 2024,
        fish_colors,
        rocks: (side * side / 10) as usize,
        snails: (side / 4) as usize,
        heart_chance: 0.0,
        bubble_chance: 0.0,
        ..SessionConfig::default()
    })
    .unwrap()
}

fn wander_frame(i: u64) -> InputFrame {
    InputFrame {
        actions: vec![PlayerAction::Move(Direction::ALL[(i % 4) as usize])],
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_step_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_step");
    for side in [10, 32, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, &side| {
            let mut session = steady_session(side, 8);
            let mut tick = 0u64;
            b.iter(|| {
                tick += 1;
                black_box(session.advance(&wander_frame(tick)).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_crowded_sea(c: &mut Criterion) {
    c.bench_function("session_step_64_fish", |b| {
        let mut session = steady_session(40, 64);
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            black_box(session.advance(&wander_frame(tick)).unwrap());
        });
    });
}

fn bench_session_creation(c: &mut Criterion) {
    c.bench_function("session_create_32x32", |b| {
        b.iter(|| black_box(steady_session(32, 8)));
    });
}

fn bench_state_hash(c: &mut Criterion) {
    c.bench_function("session_state_hash_32x32", |b| {
        b.iter_batched(
            || steady_session(32, 8),
            |session| black_box(session.state_hash()),
            BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Criterion groups and main
// ---------------------------------------------------------------------------

criterion_group!(
    benches,
    bench_step_scaling,
    bench_crowded_sea,
    bench_session_creation,
    bench_state_hash,
);
criterion_main!(benches);
