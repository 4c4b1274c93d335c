use chain_constraint::{Anchor, ChainParams, ChainWorld, NoOpStepObserver, SolverConfig, Vec2, Vec3};

fn run_world() -> Vec<Vec<Vec2<f32>>> {
    let mut w = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(8),
    );
    for i in 0..8 {
        let x = i as f32 * 3.0;
        w.attach_chain(
            Anchor::Pinned(Vec2::new(x, 10.0)),
            Anchor::Free(Vec2::new(x + 2.0, 10.0)),
            ChainParams::new(10, 0.2).with_max_tension(4.0),
        )
        .unwrap();
    }
    for step in 0..60 {
        if step % 10 == 0 {
            let handles: Vec<_> = w.chains().map(|(h, _)| h).collect();
            for h in handles {
                let _ = w.apply_force_at(h, 1, Vec2::new(40.0, 0.0));
            }
        }
        w.step(1.0 / 60.0, &mut NoOpStepObserver);
    }
    w.chains().map(|(_, c)| c.positions()).collect()
}

#[test]
fn world_deterministic() {
    let results: Vec<_> = (0..5).map(|_| run_world()).collect();

    for r in &results[1..] {
        assert_eq!(results[0].len(), r.len());
        for (chain_a, chain_b) in results[0].iter().zip(r.iter()) {
            for (a, b) in chain_a.iter().zip(chain_b.iter()) {
                assert_eq!(a.x, b.x);
                assert_eq!(a.y, b.y);
            }
        }
    }
}

#[test]
fn chain_3d_deterministic() {
    let results: Vec<_> = (0..5)
        .map(|_| {
            let mut w = ChainWorld::new(
                SolverConfig::new()
                    .with_gravity(Vec3::new(0.0, 0.0, -9.81))
                    .with_sub_steps(2),
            );
            let h = w
                .attach_chain(
                    Anchor::Pinned(Vec3::new(0.0, 0.0, 10.0)),
                    Anchor::Free(Vec3::new(5.0, 5.0, 10.0)),
                    ChainParams::new(12, 0.6).with_swing_limit(1.0),
                )
                .unwrap();
            for _ in 0..90 {
                w.step(1.0 / 60.0, &mut NoOpStepObserver);
            }
            w.chain(h).unwrap().positions()
        })
        .collect();

    for r in &results[1..] {
        assert_eq!(&results[0], r);
    }
}
