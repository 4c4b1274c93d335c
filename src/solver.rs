//! Iterative constraint solver for chain partitions.
//!
//! Each partition is solved Gauss-Seidel style: constraints are projected in
//! link order and corrections are written in place, so later links already
//! see earlier corrections within the same iteration. Results depend on that
//! order, which is fixed (chain order, then link order) for reproducibility.

use crate::chain::Chain;
use crate::config::SolverConfig;
use crate::constraint::Constraint;
use crate::constraint_set::{ChainPartition, ConstraintSet};
use crate::float::Float;
use crate::observer::StepObserver;
use crate::registry::ChainHandle;
use crate::vec::Vec;
use alloc::vec::Vec as AllocVec;
use slotmap::SlotMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A link whose tension exceeded its threshold during a solve.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BreakCandidate<F: Float> {
    pub link: usize,
    pub tension: F,
    pub threshold: F,
}

/// Result of solving one partition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChainSolution<F: Float> {
    pub chain: ChainHandle,
    /// Largest `|length - rest| / rest` after the last iteration.
    pub residual: F,
    pub converged: bool,
    /// First breaking link in link order, if any.
    pub break_candidate: Option<BreakCandidate<F>>,
    /// Further links over threshold behind `break_candidate`.
    pub extra_candidates: usize,
}

/// Solves every partition of a [`ConstraintSet`].
pub struct ConstraintSolver;

impl ConstraintSolver {
    /// Run `config.iterations` passes over each partition whose chain ticks
    /// this step.
    ///
    /// Never fails: chains that miss the tolerance still keep the best-effort
    /// positions and are reported through the observer.
    pub fn solve<V, O>(
        set: &ConstraintSet<V::Scalar>,
        chains: &mut SlotMap<ChainHandle, Chain<V>>,
        config: &SolverConfig<V>,
        observer: &mut O,
    ) -> AllocVec<ChainSolution<V::Scalar>>
    where
        V: Vec,
        O: StepObserver<V::Scalar>,
    {
        let solutions = Self::solve_partitions(set, chains, config);

        for solution in &solutions {
            observer.on_chain_solved(solution.chain, solution.residual);
            if !solution.converged {
                log::debug!(
                    "chain {:?} missed tolerance {} (residual {})",
                    solution.chain,
                    config.tolerance,
                    solution.residual
                );
                observer.on_unmet_tolerance(solution.chain, solution.residual);
            }
        }
        solutions
    }

    #[cfg(not(feature = "parallel"))]
    fn solve_partitions<V: Vec>(
        set: &ConstraintSet<V::Scalar>,
        chains: &mut SlotMap<ChainHandle, Chain<V>>,
        config: &SolverConfig<V>,
    ) -> AllocVec<ChainSolution<V::Scalar>> {
        set.partitions()
            .iter()
            .filter_map(|partition| {
                let chain = chains.get_mut(partition.chain).filter(|c| c.is_ticking())?;
                Some(solve_chain(chain, partition, config))
            })
            .collect()
    }

    /// Chains share no particles, so partitions run concurrently and are
    /// collected back in chain order.
    #[cfg(feature = "parallel")]
    fn solve_partitions<V: Vec>(
        set: &ConstraintSet<V::Scalar>,
        chains: &mut SlotMap<ChainHandle, Chain<V>>,
        config: &SolverConfig<V>,
    ) -> AllocVec<ChainSolution<V::Scalar>> {
        let mut slots = slotmap::SecondaryMap::with_capacity(set.len());
        for (index, partition) in set.partitions().iter().enumerate() {
            slots.insert(partition.chain, index);
        }

        let mut work: AllocVec<(usize, &mut Chain<V>)> = chains
            .iter_mut()
            .filter(|(_, chain)| chain.is_ticking())
            .filter_map(|(handle, chain)| slots.get(handle).map(|&index| (index, chain)))
            .collect();
        work.sort_unstable_by_key(|(index, _)| *index);

        let partitions = set.partitions();
        work.into_par_iter()
            .map(|(index, chain)| solve_chain(chain, &partitions[index], config))
            .collect()
    }
}

/// Solve a single chain against its partition.
///
/// Tension is the larger of the strain the chain arrived with and the strain
/// left after the last iteration, so it does not grow with the iteration
/// count.
pub fn solve_chain<V: Vec>(
    chain: &mut Chain<V>,
    partition: &ChainPartition<V::Scalar>,
    config: &SolverConfig<V>,
) -> ChainSolution<V::Scalar> {
    let (particles, links) = chain.parts_mut();
    for link in links.iter_mut() {
        link.reset_tension();
        link.observe(particles[link.a].pos.distance(particles[link.b].pos));
    }

    for _ in 0..config.iterations {
        for constraint in partition.constraints.iter().filter(|c| c.is_projected()) {
            constraint.project(particles, links);
        }
    }

    let mut residual = V::Scalar::zero();
    for link in links.iter_mut() {
        let len = particles[link.a].pos.distance(particles[link.b].pos);
        link.observe(len);
        residual = residual.max((len - link.rest_length).abs() / link.rest_length);
    }

    let scale = config.break_threshold_scale;
    let mut over = partition.constraints.iter().filter_map(|c| match *c {
        Constraint::Breakage { link } if links[link].exceeds(scale) => {
            let l = &links[link];
            Some(BreakCandidate {
                link,
                tension: l.tension(),
                threshold: l.break_threshold(scale).unwrap_or_else(V::Scalar::zero),
            })
        }
        _ => None,
    });
    let break_candidate = over.next();
    let extra_candidates = over.count();

    ChainSolution {
        chain: partition.chain,
        residual,
        converged: residual <= config.tolerance,
        break_candidate,
        extra_candidates,
    }
}
