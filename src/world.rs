//! The simulation session: boundary between the host tick and the solver.
//!
//! A [`ChainWorld`] is owned by whoever drives the simulation and is passed
//! explicitly to every step. Two ways to drive it:
//!
//! - [`ChainWorld::step`]: the world integrates particles itself.
//! - [`ChainWorld::on_pre_solve`] / [`ChainWorld::solve_constraints`] /
//!   [`ChainWorld::on_post_solve`]: the host integrates and exchanges flat
//!   [`ParticleState`] buffers laid out in constraint-set order.
//!
//! Between `on_pre_solve` and `on_post_solve` the layout is frozen. Chains
//! attached in that window join the next step, and detaches and manual
//! breaks take effect when `on_post_solve` finishes the step.

use crate::chain::{Anchor, Chain, ChainEnd, ChainParams, ChainState, SimulationLod};
use crate::config::SolverConfig;
use crate::constraint_set::ConstraintSet;
use crate::diagnostics::SolverDiagnostics;
use crate::error::ChainError;
use crate::event::{BreakEvent, BreakOutcome, StepReport};
use crate::float::Float;
use crate::observer::StepObserver;
use crate::particle::ParticleState;
use crate::profile::ChainProfile;
use crate::registry::{ChainHandle, ChainRegistry};
use crate::solver::ChainSolution;
use crate::vec::Vec;
use alloc::vec::Vec as AllocVec;

/// A host-integrated step between `on_pre_solve` and `on_post_solve`.
struct StagedStep<F: Float> {
    dt: F,
    report: StepReport<F>,
}

/// Every chain of a session plus the settings used to solve them.
pub struct ChainWorld<V: Vec> {
    registry: ChainRegistry<V>,
    config: SolverConfig<V>,
    diagnostics: SolverDiagnostics<V::Scalar>,
    staged: Option<StagedStep<V::Scalar>>,
}

impl<V: Vec> Default for ChainWorld<V> {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<V: Vec> ChainWorld<V> {
    pub fn new(config: SolverConfig<V>) -> Self {
        ChainWorld {
            registry: ChainRegistry::new(),
            config,
            diagnostics: SolverDiagnostics::default(),
            staged: None,
        }
    }

    pub fn config(&self) -> &SolverConfig<V> {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SolverConfig<V> {
        &mut self.config
    }

    pub fn diagnostics(&self) -> &SolverDiagnostics<V::Scalar> {
        &self.diagnostics
    }

    pub fn registry(&self) -> &ChainRegistry<V> {
        &self.registry
    }

    // ---- gameplay boundary -------------------------------------------------

    /// Build a chain between two anchors. Malformed requests create nothing.
    pub fn attach_chain(
        &mut self,
        anchor_a: Anchor<V>,
        anchor_b: Anchor<V>,
        params: ChainParams<V::Scalar>,
    ) -> Result<ChainHandle, ChainError> {
        let chain = Self::build(anchor_a, anchor_b, params)?;
        Ok(self.registry.create(chain))
    }

    fn build(anchor_a: Anchor<V>, anchor_b: Anchor<V>, params: ChainParams<V::Scalar>) -> Result<Chain<V>, ChainError> {
        Chain::build(anchor_a, anchor_b, params).map_err(|err| {
            log::warn!("rejected chain request: {}", err);
            err
        })
    }

    /// Build a chain from a profile at the LOD matching `camera_distance`.
    ///
    /// The band picks the segment count and how often the chain is
    /// simulated. Profiles with a loose end leave `anchor_b` free regardless
    /// of how it was passed.
    pub fn attach_from_profile(
        &mut self,
        anchor_a: Anchor<V>,
        anchor_b: Anchor<V>,
        profile: &ChainProfile<V::Scalar>,
        camera_distance: V::Scalar,
    ) -> Result<ChainHandle, ChainError> {
        let anchor_b = if profile.loose_end { Anchor::Free(anchor_b.position()) } else { anchor_b };
        let mut chain = Self::build(anchor_a, anchor_b, profile.params_at_distance(camera_distance))?;
        chain.set_simulation(profile.simulation_at_distance(camera_distance));
        Ok(self.registry.create(chain))
    }

    /// Destroy a chain. Returns false for handles that are already gone.
    ///
    /// During an open host step the chain keeps its buffer slot and is
    /// destroyed when the step finishes.
    pub fn detach_chain(&mut self, handle: ChainHandle) -> bool {
        self.registry.destroy(handle)
    }

    /// Tension of `link` as of the last solve.
    pub fn query_tension(&self, handle: ChainHandle, link: usize) -> Result<V::Scalar, ChainError> {
        let chain = self.registry.get(handle).ok_or(ChainError::UnknownChain)?;
        chain
            .link(link)
            .map(|l| l.tension())
            .ok_or(ChainError::LinkOutOfBounds { index: link, count: chain.link_count() })
    }

    pub fn chain(&self, handle: ChainHandle) -> Option<&Chain<V>> {
        self.registry.get(handle)
    }

    pub fn chain_state(&self, handle: ChainHandle) -> ChainState {
        self.registry.state(handle)
    }

    pub fn chain_count(&self) -> usize {
        self.registry.len()
    }

    /// Chains in solve order.
    pub fn chains(&self) -> impl Iterator<Item = (ChainHandle, &Chain<V>)> + '_ {
        self.registry.iter()
    }

    /// Move (and pin) one end of a chain.
    pub fn set_anchor(&mut self, handle: ChainHandle, end: ChainEnd, pos: V) -> Result<(), ChainError> {
        let chain = self.chain_mut(handle)?;
        let index = chain.end_index(end);
        chain.move_pin(index, pos)
    }

    /// Unpin one end so it hangs loose.
    pub fn release_end(&mut self, handle: ChainHandle, end: ChainEnd) -> Result<(), ChainError> {
        let chain = self.chain_mut(handle)?;
        let index = chain.end_index(end);
        chain.unpin(index)
    }

    /// Accumulate a force on one particle for the next integration.
    pub fn apply_force_at(&mut self, handle: ChainHandle, particle: usize, force: V) -> Result<(), ChainError> {
        self.chain_mut(handle)?.apply_force_at(particle, force)
    }

    /// Change the total rest length, e.g. reeling a grapple in or out.
    pub fn set_target_length(&mut self, handle: ChainHandle, length: V::Scalar) -> Result<(), ChainError> {
        self.chain_mut(handle)?.set_total_length(length)
    }

    /// Break `link` immediately and report how the chain was split.
    ///
    /// During an open host step the outcome is [`BreakOutcome::Deferred`]
    /// and the split is reported by `on_post_solve`.
    pub fn break_link(&mut self, handle: ChainHandle, link: usize) -> Result<BreakEvent<V::Scalar>, ChainError> {
        let event = self.registry.break_now(handle, link)?;
        if event.outcome != BreakOutcome::Deferred {
            self.diagnostics.breaks += 1;
        }
        Ok(event)
    }

    /// Change how often a chain is simulated, e.g. after the camera moved.
    pub fn set_simulation(&mut self, handle: ChainHandle, simulation: SimulationLod<V::Scalar>) -> Result<(), ChainError> {
        self.chain_mut(handle)?.set_simulation(simulation);
        Ok(())
    }

    fn chain_mut(&mut self, handle: ChainHandle) -> Result<&mut Chain<V>, ChainError> {
        self.registry.get_mut(handle).ok_or(ChainError::UnknownChain)
    }

    // ---- self-integrated step ----------------------------------------------

    /// Integrate, solve and apply lifecycle events for one fixed step.
    ///
    /// Chains whose simulation rate skips this step are left untouched.
    /// Returns immediately when the world holds no chain.
    pub fn step<O: StepObserver<V::Scalar>>(&mut self, dt: V::Scalar, observer: &mut O) -> StepReport<V::Scalar> {
        self.abandon_staged();
        if self.registry.is_empty() {
            return self.skip();
        }

        let sub_steps = self.config.sub_steps.max(1);
        let sub_dt = dt / V::Scalar::from_usize(sub_steps);
        let mut report = StepReport::default();
        self.registry.advance_ticks();

        for _ in 0..sub_steps {
            self.registry.refresh();
            let (gravity, damping) = (self.config.gravity, self.config.damping);
            for chain in self.registry.chains_mut().values_mut().filter(|c| c.is_ticking()) {
                for p in chain.particles_mut() {
                    p.apply_acceleration(gravity);
                    p.integrate(sub_dt, damping);
                }
            }
            observer.on_integrate();

            let solutions = self.registry.solve(&self.config, observer);
            self.absorb(&solutions, &mut report);
        }

        self.finish(sub_dt, report, observer)
    }

    // ---- host-integrated step ----------------------------------------------

    /// Current constraint set; its partitions describe the host buffer layout.
    ///
    /// Inside an open host step this is the layout `on_pre_solve` read.
    pub fn layout(&mut self) -> &ConstraintSet<V::Scalar> {
        if self.registry.is_held() {
            return self.registry.constraint_set();
        }
        self.registry.refresh()
    }

    /// Pull post-integration states from the host, one per particle in
    /// constraint-set order, and open the step.
    pub fn on_pre_solve(
        &mut self,
        dt: V::Scalar,
        states: &[ParticleState<V>],
    ) -> Result<&ConstraintSet<V::Scalar>, ChainError> {
        self.abandon_staged();
        let expected = self.registry.refresh().particle_count();
        if states.len() != expected {
            return Err(ChainError::BufferMismatch { expected, actual: states.len() });
        }

        self.registry.advance_ticks();
        self.registry.load_states(states, dt);
        self.registry.hold();
        self.staged = Some(StagedStep { dt, report: StepReport::default() });
        Ok(self.registry.constraint_set())
    }

    /// Solve every partition loaded by [`on_pre_solve`](Self::on_pre_solve)
    /// against the staged layout.
    ///
    /// Returns the number of chains solved; zero when nothing was staged.
    pub fn solve_constraints<O: StepObserver<V::Scalar>>(&mut self, observer: &mut O) -> usize {
        let Some(mut staged) = self.staged.take() else { return 0 };
        let solutions = self.registry.solve(&self.config, observer);
        self.absorb(&solutions, &mut staged.report);
        let solved = solutions.len();
        self.staged = Some(staged);
        solved
    }

    /// Push corrected states back to the host, then apply lifecycle events.
    ///
    /// `out` is cleared and refilled in the same layout `on_pre_solve` read.
    pub fn on_post_solve<O: StepObserver<V::Scalar>>(
        &mut self,
        out: &mut AllocVec<ParticleState<V>>,
        observer: &mut O,
    ) -> StepReport<V::Scalar> {
        out.clear();
        let Some(staged) = self.staged.take() else {
            return self.skip();
        };

        for partition in self.registry.constraint_set().partitions() {
            if let Some(chain) = self.registry.get(partition.chain) {
                out.extend(chain.particles().iter().map(|p| p.state(staged.dt)));
            }
        }
        self.finish(staged.dt, staged.report, observer)
    }

    /// `on_pre_solve`, `solve_constraints` and `on_post_solve` in one call.
    pub fn step_external<O: StepObserver<V::Scalar>>(
        &mut self,
        dt: V::Scalar,
        states: &[ParticleState<V>],
        out: &mut AllocVec<ParticleState<V>>,
        observer: &mut O,
    ) -> Result<StepReport<V::Scalar>, ChainError> {
        if self.registry.is_empty() {
            out.clear();
            return Ok(self.skip());
        }
        self.on_pre_solve(dt, states)?;
        self.solve_constraints(observer);
        Ok(self.on_post_solve(out, observer))
    }

    // ---- shared ------------------------------------------------------------

    /// Close a host step that never reached `on_post_solve`, applying what it
    /// deferred.
    fn abandon_staged(&mut self) {
        if self.staged.take().is_some() {
            log::warn!("host step abandoned before on_post_solve");
        }
        self.registry.release();
    }

    fn skip(&mut self) -> StepReport<V::Scalar> {
        let report = StepReport::skipped();
        self.diagnostics.record(&report);
        report
    }

    fn absorb(&mut self, solutions: &[ChainSolution<V::Scalar>], report: &mut StepReport<V::Scalar>) {
        report.chains_solved += solutions.len();
        for solution in solutions {
            report.max_residual = report.max_residual.max(solution.residual);
            if !solution.converged {
                report.unmet_tolerance += 1;
            }
            self.diagnostics.deferred_breaks += solution.extra_candidates as u64;
            if let Some(candidate) = solution.break_candidate {
                if !self.registry.queue_break(solution.chain, candidate) {
                    self.diagnostics.deferred_breaks += 1;
                }
            }
        }
    }

    /// Lifecycle phase: deferred detaches, breaks, settle collection,
    /// bookkeeping.
    fn finish<O: StepObserver<V::Scalar>>(
        &mut self,
        dt: V::Scalar,
        mut report: StepReport<V::Scalar>,
        observer: &mut O,
    ) -> StepReport<V::Scalar> {
        self.registry.release();
        report.breaks = self.registry.apply_breaks();
        for event in &report.breaks {
            observer.on_break(event);
        }
        report.collected = self.registry.collect_settled(&self.config, dt);

        self.diagnostics.record(&report);
        observer.on_step_complete();
        log::trace!(
            "step: {} chains solved, {} breaks, {} unmet, max residual {}",
            report.chains_solved,
            report.breaks.len(),
            report.unmet_tolerance,
            report.max_residual
        );
        report
    }
}
