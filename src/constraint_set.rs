//! Per-step view over every active chain's constraints.

use crate::chain::Chain;
use crate::constraint::Constraint;
use crate::float::Float;
use crate::registry::ChainHandle;
use crate::vec::Vec;
use alloc::vec::Vec as AllocVec;
use slotmap::SlotMap;

/// Constraints of a single chain, in link order.
///
/// Chains never share particles, so partitions can be solved independently.
#[derive(Clone, Debug)]
pub struct ChainPartition<F: Float> {
    pub chain: ChainHandle,
    pub constraints: AllocVec<Constraint<F>>,
    /// Offset of this chain's first particle in the flattened host buffer.
    pub particle_offset: usize,
    pub particle_count: usize,
}

/// The transient constraint collection submitted to one solve pass.
///
/// Rebuilt only when the registry topology changes; rest lengths and
/// tensions are read from the chains during the solve.
#[derive(Clone, Debug)]
pub struct ConstraintSet<F: Float> {
    partitions: AllocVec<ChainPartition<F>>,
    particle_count: usize,
}

impl<F: Float> Default for ConstraintSet<F> {
    fn default() -> Self {
        ConstraintSet { partitions: AllocVec::new(), particle_count: 0 }
    }
}

impl<F: Float> ConstraintSet<F> {
    /// Build partitions for `order`, skipping handles that are no longer live.
    pub fn build<V>(order: &[ChainHandle], chains: &SlotMap<ChainHandle, Chain<V>>) -> Self
    where
        V: Vec<Scalar = F>,
    {
        let mut partitions = AllocVec::with_capacity(order.len());
        let mut particle_offset = 0;
        for &handle in order {
            let Some(chain) = chains.get(handle) else { continue };
            partitions.push(ChainPartition {
                chain: handle,
                constraints: constraints_for(chain),
                particle_offset,
                particle_count: chain.len(),
            });
            particle_offset += chain.len();
        }
        ConstraintSet { partitions, particle_count: particle_offset }
    }

    pub fn partitions(&self) -> &[ChainPartition<F>] {
        &self.partitions
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Total particles across all partitions.
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn constraint_count(&self) -> usize {
        self.partitions.iter().map(|p| p.constraints.len()).sum()
    }
}

/// Distance constraints in link order, each swing limit right after the
/// link that closes its pair, breakage checks last.
pub fn constraints_for<V: Vec>(chain: &Chain<V>) -> AllocVec<Constraint<V::Scalar>> {
    let cos_limit = chain.params().swing_limit.map(|angle| {
        let pi = V::Scalar::from_f32(core::f32::consts::PI);
        angle.clamp(V::Scalar::zero(), pi).cos()
    });

    let mut constraints = AllocVec::with_capacity(chain.link_count() * 3);
    for link in 0..chain.link_count() {
        constraints.push(Constraint::Distance { link });
        if let (Some(cos_limit), true) = (cos_limit, link > 0) {
            constraints.push(Constraint::Angular { first: link - 1, cos_limit });
        }
    }
    for (link, l) in chain.links().iter().enumerate() {
        if l.max_tension.is_some() {
            constraints.push(Constraint::Breakage { link });
        }
    }
    constraints
}
