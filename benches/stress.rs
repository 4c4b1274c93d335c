//! Benchmarks for worlds holding many chains.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use chain_constraint::{Anchor, ChainParams, ChainWorld, NoOpStepObserver, SolverConfig, Vec2};

fn rope_world(chains: usize) -> ChainWorld<Vec2<f32>> {
    let mut world = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(8),
    );
    for i in 0..chains {
        let x = i as f32;
        world
            .attach_chain(
                Anchor::Pinned(Vec2::new(x, 20.0)),
                Anchor::Free(Vec2::new(x + 4.0, 20.0)),
                ChainParams::new(16, 0.25),
            )
            .unwrap();
    }
    world
}

fn bench_many_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("many_chains_step");
    for chains in [10, 100, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(chains), &chains, |b, &chains| {
            let mut world = rope_world(chains);
            b.iter(|| world.step(1.0 / 60.0, &mut NoOpStepObserver));
        });
    }
    group.finish();
}

fn bench_break_and_rebuild(c: &mut Criterion) {
    c.bench_function("restraints_break_100_chains", |b| {
        b.iter(|| {
            let mut world: ChainWorld<Vec2<f32>> = ChainWorld::new(SolverConfig::new());
            for i in 0..100 {
                let x = i as f32 * 2.0;
                world
                    .attach_chain(
                        Anchor::Pinned(Vec2::new(x, 0.0)),
                        Anchor::Pinned(Vec2::new(x, -4.0)),
                        ChainParams::new(8, 0.5).with_max_tension(1.5),
                    )
                    .unwrap();
            }
            let handles: Vec<_> = world.chains().map(|(h, _)| h).collect();
            for h in handles {
                world.apply_force_at(h, 4, Vec2::new(30_000.0, 0.0)).unwrap();
            }
            let report = world.step(1.0 / 60.0, &mut NoOpStepObserver);
            world.step(1.0 / 60.0, &mut NoOpStepObserver);
            report.breaks.len()
        });
    });
}

criterion_group!(benches, bench_many_chains, bench_break_and_rebuild);
criterion_main!(benches);
