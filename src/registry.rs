//! Chain lifecycle: creation, breaking, splitting and destruction.

use crate::chain::{Chain, ChainState};
use crate::config::SolverConfig;
use crate::constraint_set::ConstraintSet;
use crate::error::ChainError;
use crate::event::{BreakCause, BreakEvent, BreakOutcome};
use crate::float::Float;
use crate::observer::StepObserver;
use crate::particle::ParticleState;
use crate::solver::{BreakCandidate, ChainSolution, ConstraintSolver};
use crate::vec::Vec;
use alloc::vec::Vec as AllocVec;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Generational handle to a chain. A destroyed chain's handle never
    /// aliases a newer chain.
    pub struct ChainHandle;
}

#[derive(Copy, Clone, Debug)]
struct PendingBreak<F: Float> {
    chain: ChainHandle,
    candidate: BreakCandidate<F>,
    cause: BreakCause,
}

/// Owns every chain of a simulation session.
///
/// Mutated only between solves; the solve reads a [`ConstraintSet`]
/// snapshot built by [`refresh`](Self::refresh). While a step is held open
/// (see [`hold`](Self::hold)) destroys and manual breaks are queued so the
/// snapshot and the chains it names stay in step.
pub struct ChainRegistry<V: Vec> {
    chains: SlotMap<ChainHandle, Chain<V>>,
    /// Chain order: creation order, split halves take the original's place.
    order: AllocVec<ChainHandle>,
    constraint_set: ConstraintSet<V::Scalar>,
    topology_dirty: bool,
    pending: AllocVec<PendingBreak<V::Scalar>>,
    held: bool,
    retiring: AllocVec<ChainHandle>,
}

impl<V: Vec> Default for ChainRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Vec> ChainRegistry<V> {
    pub fn new() -> Self {
        ChainRegistry {
            chains: SlotMap::with_key(),
            order: AllocVec::new(),
            constraint_set: ConstraintSet::default(),
            topology_dirty: false,
            pending: AllocVec::new(),
            held: false,
            retiring: AllocVec::new(),
        }
    }

    /// Register a built chain. It joins the constraint set on the next refresh.
    pub fn create(&mut self, chain: Chain<V>) -> ChainHandle {
        let links = chain.link_count();
        let handle = self.chains.insert(chain);
        self.order.push(handle);
        self.topology_dirty = true;
        log::debug!("created chain {:?} with {} links", handle, links);
        handle
    }

    /// Release a chain. Unknown or already destroyed handles are a no-op.
    ///
    /// While held, the chain stays in place until [`release`](Self::release).
    pub fn destroy(&mut self, handle: ChainHandle) -> bool {
        if self.held {
            if !self.chains.contains_key(handle) || self.retiring.contains(&handle) {
                return false;
            }
            self.retiring.push(handle);
            log::debug!("chain {:?} retires at the end of the step", handle);
            return true;
        }
        if self.chains.remove(handle).is_none() {
            return false;
        }
        self.order.retain(|&h| h != handle);
        self.pending.retain(|p| p.chain != handle);
        self.topology_dirty = true;
        log::debug!("destroyed chain {:?}", handle);
        true
    }

    pub fn get(&self, handle: ChainHandle) -> Option<&Chain<V>> {
        self.chains.get(handle)
    }

    pub fn get_mut(&mut self, handle: ChainHandle) -> Option<&mut Chain<V>> {
        self.chains.get_mut(handle)
    }

    pub(crate) fn chains_mut(&mut self) -> &mut SlotMap<ChainHandle, Chain<V>> {
        &mut self.chains
    }

    /// `Destroyed` for any handle that is no longer live.
    pub fn state(&self, handle: ChainHandle) -> ChainState {
        self.chains.get(handle).map_or(ChainState::Destroyed, |c| c.state)
    }

    pub fn contains(&self, handle: ChainHandle) -> bool {
        self.chains.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Chains in solve order.
    pub fn iter(&self) -> impl Iterator<Item = (ChainHandle, &Chain<V>)> + '_ {
        self.order.iter().filter_map(move |&h| self.chains.get(h).map(|c| (h, c)))
    }

    pub fn handles(&self) -> &[ChainHandle] {
        &self.order
    }

    pub fn is_dirty(&self) -> bool {
        self.topology_dirty
    }

    /// True while a step is held open.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Freeze topology for an open step: destroys and manual breaks queue up
    /// and the constraint set is no longer rebuilt by [`solve`](Self::solve).
    pub fn hold(&mut self) {
        self.held = true;
    }

    /// End the open step and destroy the chains retired during it.
    pub fn release(&mut self) {
        self.held = false;
        for handle in core::mem::take(&mut self.retiring) {
            self.destroy(handle);
        }
    }

    /// Decide which chains tick this step from their simulation rate.
    pub(crate) fn advance_ticks(&mut self) {
        for chain in self.chains.values_mut() {
            chain.advance_tick();
        }
    }

    /// Rebuild the constraint set if topology changed and activate new chains.
    pub fn refresh(&mut self) -> &ConstraintSet<V::Scalar> {
        if self.topology_dirty {
            self.constraint_set = ConstraintSet::build(&self.order, &self.chains);
            for partition in self.constraint_set.partitions() {
                if let Some(chain) = self.chains.get_mut(partition.chain) {
                    if chain.state == ChainState::Created {
                        chain.state = ChainState::Active;
                    }
                }
            }
            self.topology_dirty = false;
            log::trace!("constraint set rebuilt: {} partitions", self.constraint_set.len());
        }
        &self.constraint_set
    }

    pub fn constraint_set(&self) -> &ConstraintSet<V::Scalar> {
        &self.constraint_set
    }

    /// Solve every partition against the snapshot, refreshing it first
    /// unless a step is held open.
    pub fn solve<O>(&mut self, config: &SolverConfig<V>, observer: &mut O) -> AllocVec<ChainSolution<V::Scalar>>
    where
        O: StepObserver<V::Scalar>,
    {
        if !self.held {
            self.refresh();
        }
        ConstraintSolver::solve(&self.constraint_set, &mut self.chains, config, observer)
    }

    /// Copy host states into the chains of the current constraint set.
    pub(crate) fn load_states(&mut self, states: &[ParticleState<V>], dt: V::Scalar) {
        for partition in self.constraint_set.partitions() {
            let Some(chain) = self.chains.get_mut(partition.chain) else { continue };
            let slice = &states[partition.particle_offset..][..partition.particle_count];
            for (particle, state) in chain.particles_mut().iter_mut().zip(slice) {
                particle.load(state, dt);
            }
        }
    }

    /// Accept a break candidate unless the chain already has one this step.
    pub fn queue_break(&mut self, chain: ChainHandle, candidate: BreakCandidate<V::Scalar>) -> bool {
        if self.pending.iter().any(|p| p.chain == chain) {
            return false;
        }
        let Some(c) = self.chains.get_mut(chain) else { return false };
        c.state = ChainState::Breaking;
        self.pending.push(PendingBreak { chain, candidate, cause: BreakCause::Tension });
        true
    }

    /// Resolve queued breaks in chain order.
    pub fn apply_breaks(&mut self) -> AllocVec<BreakEvent<V::Scalar>> {
        let mut pending = core::mem::take(&mut self.pending);
        pending.sort_by_key(|p| self.order.iter().position(|&h| h == p.chain));
        pending
            .into_iter()
            .filter_map(|p| {
                let BreakCandidate { link, tension, threshold } = p.candidate;
                let outcome = self.split(p.chain, link).ok()?;
                Some(BreakEvent {
                    chain: p.chain,
                    link,
                    tension,
                    threshold: (p.cause == BreakCause::Tension).then_some(threshold),
                    cause: p.cause,
                    outcome,
                })
            })
            .collect()
    }

    /// Break `link` right away, outside the step.
    ///
    /// While held, the break replaces any queued candidate for the chain and
    /// is reported with [`BreakOutcome::Deferred`]; the split lands in the
    /// next [`apply_breaks`](Self::apply_breaks).
    pub fn break_now(&mut self, chain: ChainHandle, link: usize) -> Result<BreakEvent<V::Scalar>, ChainError> {
        let c = self.chains.get(chain).ok_or(ChainError::UnknownChain)?;
        c.check_link(link)?;
        let tension = c.link(link).map(|l| l.tension()).unwrap_or_else(V::Scalar::zero);
        self.pending.retain(|p| p.chain != chain);

        if self.held {
            let candidate = BreakCandidate { link, tension, threshold: V::Scalar::zero() };
            self.pending.push(PendingBreak { chain, candidate, cause: BreakCause::Manual });
            if let Some(c) = self.chains.get_mut(chain) {
                c.state = ChainState::Breaking;
            }
            let outcome = BreakOutcome::Deferred;
            return Ok(BreakEvent { chain, link, tension, threshold: None, cause: BreakCause::Manual, outcome });
        }

        let outcome = self.split(chain, link)?;
        Ok(BreakEvent { chain, link, tension, threshold: None, cause: BreakCause::Manual, outcome })
    }

    /// Replace `handle` with the halves of its split; halves without links
    /// are zero-length remainders and are dropped.
    fn split(&mut self, handle: ChainHandle, link: usize) -> Result<BreakOutcome, ChainError> {
        let chain = self.chains.get(handle).ok_or(ChainError::UnknownChain)?;
        chain.check_link(link)?;
        let Some(chain) = self.chains.remove(handle) else {
            return Err(ChainError::UnknownChain);
        };
        let (head, tail) = chain.split_at(link)?;

        let mut survivors = AllocVec::with_capacity(2);
        for half in [head, tail] {
            if half.link_count() > 0 {
                survivors.push(self.chains.insert(half));
            }
        }

        if let Some(at) = self.order.iter().position(|&h| h == handle) {
            self.order.splice(at..=at, survivors.iter().copied());
        }
        self.topology_dirty = true;

        let outcome = match survivors.as_slice() {
            [first, second] => BreakOutcome::Split { first: *first, second: *second },
            [survivor] => BreakOutcome::Trimmed { survivor: *survivor },
            _ => BreakOutcome::Destroyed,
        };
        log::debug!("chain {:?} broke at link {}: {:?}", handle, link, outcome);
        Ok(outcome)
    }

    /// Count settled steps for unpinned chains and destroy those past the limit.
    pub fn collect_settled(&mut self, config: &SolverConfig<V>, dt: V::Scalar) -> AllocVec<ChainHandle> {
        if config.settle_steps == 0 {
            return AllocVec::new();
        }
        let limit = config.settle_speed * dt;
        let mut expired = AllocVec::new();
        for &handle in &self.order {
            let Some(chain) = self.chains.get_mut(handle) else { continue };
            if !chain.is_ticking() {
                continue;
            }
            if chain.pinned_count() > 0 || chain.max_displacement() > limit {
                chain.settled_steps = 0;
                continue;
            }
            chain.settled_steps += 1;
            if chain.settled_steps >= config.settle_steps {
                expired.push(handle);
            }
        }
        for &handle in &expired {
            self.destroy(handle);
        }
        expired
    }
}
