//! Long-running scenarios with many chains, modelled on typical game uses.

use chain_constraint::{
    Anchor, BreakOutcome, ChainEnd, ChainHandle, ChainKind, ChainParams, ChainProfile, ChainWorld, NoOpStepObserver,
    SolverConfig, Vec2, Vec3,
};
use chain_constraint::Vec as _;

const DT: f32 = 1.0 / 60.0;

fn all_finite(w: &ChainWorld<Vec2<f32>>) -> bool {
    w.chains().all(|(_, c)| c.particles().iter().all(|p| p.pos.is_finite()))
}

#[test]
fn many_hanging_ropes() {
    let mut w = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(8),
    );
    let mut anchors = Vec::new();
    for i in 0..200 {
        let top = Vec2::new(i as f32 * 0.5, 20.0);
        w.attach_chain(
            Anchor::Pinned(top),
            Anchor::Free(Vec2::new(top.x + 3.0, 20.0)),
            ChainParams::new(12, 0.25),
        )
        .unwrap();
        anchors.push(top);
    }

    for _ in 0..240 {
        let report = w.step(DT, &mut NoOpStepObserver);
        assert_eq!(report.chains_solved, 200);
        assert!(report.breaks.is_empty());
    }

    assert!(all_finite(&w));
    for ((_, chain), top) in w.chains().zip(&anchors) {
        assert_eq!(chain.particle(0).unwrap().pos, *top);
        let end = chain.particle(12).unwrap().pos;
        assert!(end.y < top.y);
        // Never stretched far past the rest length.
        assert!(chain.current_length() < chain.rest_length() * 1.1);
    }
    assert_eq!(w.diagnostics().steps, 240);
}

#[test]
fn platformer_swinging_bridge() {
    // Plank bridge pinned at both ends, a player walking across it.
    let mut w = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(16),
    );
    let bridge = w
        .attach_chain(
            Anchor::Pinned(Vec2::new(0.0, 0.0)),
            Anchor::Pinned(Vec2::new(10.0, 0.0)),
            ChainParams::new(20, 0.52).with_particle_mass(2.0),
        )
        .unwrap();

    for step in 0..300 {
        let under_feet = 1 + (step / 16).min(18);
        w.apply_force_at(bridge, under_feet, Vec2::new(0.0, -400.0)).unwrap();
        w.step(DT, &mut NoOpStepObserver);
    }

    assert!(all_finite(&w));
    let chain = w.chain(bridge).unwrap();
    assert_eq!(chain.particle(0).unwrap().pos, Vec2::new(0.0, 0.0));
    assert_eq!(chain.particle(20).unwrap().pos, Vec2::new(10.0, 0.0));
    assert!(chain.particle(10).unwrap().pos.y < 0.0, "bridge should sag");
}

#[test]
fn combat_restraints_break_and_conserve() {
    // Restraints tethering targets; repeated heavy hits snap some of them.
    let mut w = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_settle(1e-3, 0),
    );
    for i in 0..40 {
        let x = i as f32 * 2.0;
        w.attach_chain(
            Anchor::Pinned(Vec2::new(x, 0.0)),
            Anchor::Pinned(Vec2::new(x, -4.0)),
            ChainParams::new(8, 0.5).with_max_tension(1.5),
        )
        .unwrap();
    }
    let particles_before: usize = w.chains().map(|(_, c)| c.len()).sum();
    let links_before: usize = w.chains().map(|(_, c)| c.link_count()).sum();

    let mut breaks = 0;
    let mut dropped_particles = 0;
    for step in 0..120 {
        if step % 20 == 0 {
            let targets: Vec<ChainHandle> = w.chains().map(|(h, _)| h).step_by(3).collect();
            for h in targets {
                let middle = w.chain(h).unwrap().len() / 2;
                w.apply_force_at(h, middle, Vec2::new(30_000.0, 0.0)).unwrap();
            }
        }
        let report = w.step(DT, &mut NoOpStepObserver);
        for event in &report.breaks {
            breaks += 1;
            dropped_particles += match event.outcome {
                BreakOutcome::Split { .. } => 0,
                BreakOutcome::Trimmed { .. } => 1,
                BreakOutcome::Destroyed => 2,
                BreakOutcome::Deferred => panic!("self-integrated steps report applied breaks"),
            };
        }
    }

    assert!(breaks > 0, "heavy hits should snap some restraints");
    assert!(all_finite(&w));
    let particles_after: usize = w.chains().map(|(_, c)| c.len()).sum();
    let links_after: usize = w.chains().map(|(_, c)| c.link_count()).sum();
    assert_eq!(particles_after + dropped_particles, particles_before);
    assert_eq!(links_after + breaks, links_before);
    assert_eq!(w.diagnostics().breaks as usize, breaks);
}

#[test]
fn side_scroller_grapple_reel() {
    let mut profile: ChainProfile<f32> = ChainProfile::new(ChainKind::Grapple);
    profile.break_tension = None;
    let mut w = ChainWorld::new(
        SolverConfig::new()
            .with_gravity(Vec2::new(0.0, -9.81))
            .with_iterations(12)
            .with_sub_steps(2),
    );
    let hook = w
        .attach_from_profile(
            Anchor::Pinned(Vec2::new(0.0, 12.0)),
            Anchor::Free(Vec2::new(0.0, 0.0)),
            &profile,
            0.0,
        )
        .unwrap();

    let mut length = profile.base_length();
    for step in 0..240 {
        // Reel in while the player runs right, then reattach the hook ahead.
        if step < 120 {
            length = (length - 0.08).max(4.0);
            w.set_target_length(hook, length).unwrap();
        } else if step == 120 {
            w.set_anchor(hook, ChainEnd::Start, Vec2::new(6.0, 10.0)).unwrap();
        }
        let end = w.chain(hook).unwrap().len() - 1;
        w.apply_force_at(hook, end, Vec2::new(2.0, 0.0)).unwrap();
        w.step(DT, &mut NoOpStepObserver);
    }

    assert!(all_finite(&w));
    let chain = w.chain(hook).unwrap();
    let player = chain.particle(chain.len() - 1).unwrap().pos;
    assert!((chain.rest_length() - 4.0).abs() < 1e-3);
    assert_eq!(chain.particle(0).unwrap().pos, Vec2::new(6.0, 10.0));
    assert!(player.distance(Vec2::new(6.0, 10.0)) < 5.0);
}

#[test]
fn churn_attach_detach() {
    let mut w: ChainWorld<Vec3<f32>> = ChainWorld::new(
        SolverConfig::new().with_gravity(Vec3::new(0.0, -9.81, 0.0)),
    );
    let mut live = Vec::new();
    for step in 0..300 {
        if step % 3 == 0 {
            let x = (step % 50) as f32;
            live.push(
                w.attach_chain(
                    Anchor::Pinned(Vec3::new(x, 5.0, 0.0)),
                    Anchor::Free(Vec3::new(x, 5.0, 2.0)),
                    ChainParams::new(6, 0.4),
                )
                .unwrap(),
            );
        }
        if step % 5 == 0 && !live.is_empty() {
            let h = live.remove(0);
            assert!(w.detach_chain(h));
        }
        w.step(DT, &mut NoOpStepObserver);
        assert_eq!(w.chain_count(), live.len());
    }
    for h in &live {
        assert!(w.chain(*h).is_some());
    }
}
