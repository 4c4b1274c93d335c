//! Rope and chain constraints for game physics.
//!
//! `chain-constraint` models ropes as particles joined by distance links and
//! solves them with sequential position-based projection once per fixed
//! step. Links can carry swing limits and break when their tension exceeds a
//! threshold, splitting the chain in two.
//!
//! # Features
//!
//! - **Chain topology**: ropes built between pinned or loose anchors
//! - **Constraint solver**: distance, angular and breakage constraints, Gauss-Seidel
//! - **Lifecycle**: break events, splits, settle collection, generational handles
//! - **Host boundary**: self-integrated `step(dt)` or host-owned particle buffers
//! - **Profiles**: reusable chain presets with distance-based LOD
//! - **Observable**: `StepObserver` hooks, `SolverDiagnostics` counters, `log` records
//! - **`no_std` compatible**: only `alloc` unless `parallel` is enabled
//!
//! ```
//! use chain_constraint::{Anchor, ChainParams, ChainWorld, NoOpStepObserver, SolverConfig, Vec2};
//!
//! let mut world: ChainWorld<Vec2<f32>> =
//!     ChainWorld::new(SolverConfig::new().with_gravity(Vec2::new(0.0, -9.81)));
//! let rope = world
//!     .attach_chain(
//!         Anchor::Pinned(Vec2::new(0.0, 10.0)),
//!         Anchor::Free(Vec2::new(5.0, 10.0)),
//!         ChainParams::new(10, 0.5),
//!     )
//!     .unwrap();
//!
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0, &mut NoOpStepObserver);
//! }
//! assert!(world.chain(rope).unwrap().positions()[10].y < 10.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod float;
pub mod vec;
pub mod particle;
pub mod link;
pub mod chain;
pub mod constraint;
pub mod constraint_set;
pub mod solver;
pub mod event;
pub mod registry;
pub mod profile;
pub mod world;
pub mod observer;
pub mod diagnostics;
pub mod config;
pub mod error;

// Re-export primary API
pub use float::Float;
pub use vec::{Vec, Vec2, Vec3};
pub use particle::{Particle, ParticleState};
pub use link::Link;
pub use chain::{Anchor, Chain, ChainEnd, ChainParams, ChainState, SimulationLod};
pub use constraint::Constraint;
pub use constraint_set::{ChainPartition, ConstraintSet};
pub use solver::{BreakCandidate, ChainSolution, ConstraintSolver};
pub use event::{BreakCause, BreakEvent, BreakOutcome, StepReport};
pub use registry::{ChainHandle, ChainRegistry};
pub use profile::{ChainKind, ChainProfile, LodLevel};
pub use world::ChainWorld;
pub use observer::{NoOpStepObserver, StepObserver};
pub use diagnostics::SolverDiagnostics;
pub use config::SolverConfig;
pub use error::{ChainError, TopologyError};
