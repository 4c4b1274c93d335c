//! Benchmarks for single-chain solving.

use criterion::{criterion_group, criterion_main, Criterion};
use chain_constraint::{Anchor, ChainHandle, ChainParams, ChainWorld, NoOpStepObserver, SolverConfig, Vec2, Vec3};

fn hanging_world(segments: usize, iterations: usize) -> (ChainWorld<Vec2<f32>>, ChainHandle) {
    let mut world = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(iterations),
    );
    let handle = world
        .attach_chain(
            Anchor::Pinned(Vec2::new(0.0, 10.0)),
            Anchor::Free(Vec2::new(10.0, 10.0)),
            ChainParams::new(segments, 10.0 / segments as f32),
        )
        .unwrap();
    (world, handle)
}

fn bench_chain_simulation(c: &mut Criterion) {
    c.bench_function("chain_50_segments_60_steps", |b| {
        b.iter(|| {
            let (mut world, handle) = hanging_world(50, 8);
            for _ in 0..60 {
                world.step(1.0 / 60.0, &mut NoOpStepObserver);
            }
            world.chain(handle).unwrap().positions()
        });
    });
}

fn bench_swing_limited_chain(c: &mut Criterion) {
    c.bench_function("chain_3d_swing_limit_60_steps", |b| {
        b.iter(|| {
            let mut world = ChainWorld::new(
                SolverConfig::new()
                    .with_gravity(Vec3::new(0.0, 0.0, -9.81))
                    .with_iterations(8),
            );
            let handle = world
                .attach_chain(
                    Anchor::Pinned(Vec3::new(0.0, 0.0, 10.0)),
                    Anchor::Free(Vec3::new(5.0, 5.0, 10.0)),
                    ChainParams::new(32, 0.25).with_swing_limit(0.6),
                )
                .unwrap();
            for _ in 0..60 {
                world.step(1.0 / 60.0, &mut NoOpStepObserver);
            }
            world.chain(handle).unwrap().positions()
        });
    });
}

fn bench_host_boundary(c: &mut Criterion) {
    c.bench_function("chain_50_segments_step_external", |b| {
        let (mut world, _) = hanging_world(50, 8);
        let states: Vec<_> = world
            .chains()
            .flat_map(|(_, chain)| chain.particles().iter().map(|p| p.state(1.0 / 60.0)))
            .collect();
        let mut out = Vec::with_capacity(states.len());
        b.iter(|| {
            world
                .step_external(1.0 / 60.0, &states, &mut out, &mut NoOpStepObserver)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_chain_simulation, bench_swing_limited_chain, bench_host_boundary);
criterion_main!(benches);
