//! Reusable chain presets with distance-based level of detail.

use crate::chain::{ChainParams, SimulationLod};
use crate::float::Float;
use alloc::vec::Vec as AllocVec;

/// High-level classification of a chain, used to pick preset values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ChainKind {
    Rope,
    MetalChain,
    Grapple,
    Restraint,
    Custom,
}

/// A level of detail band keyed by camera distance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LodLevel<F: Float> {
    pub min_distance: F,
    pub max_distance: F,
    /// Replaces the profile's segment count when positive.
    pub segment_count_override: usize,
    /// When false, chains at this distance are frozen.
    pub simulate: bool,
    /// Fraction of steps simulated: 1.0 = every step, 0.5 = every other.
    /// Clamped to `[0.01, 1]` when applied.
    pub simulation_rate: F,
}

impl<F: Float> LodLevel<F> {
    pub fn new(min_distance: F, max_distance: F) -> Self {
        LodLevel {
            min_distance,
            max_distance,
            segment_count_override: 0,
            simulate: true,
            simulation_rate: F::one(),
        }
    }

    /// Override the profile's segment count in this band.
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segment_count_override = segments;
        self
    }

    /// Simulate only a fraction of steps in this band.
    pub fn with_rate(mut self, rate: F) -> Self {
        self.simulation_rate = rate;
        self
    }

    /// Freeze chains in this band.
    pub fn frozen(mut self) -> Self {
        self.simulate = false;
        self
    }

    pub fn simulation(&self) -> SimulationLod<F> {
        SimulationLod { simulate: self.simulate, rate: self.simulation_rate }
    }

    pub fn contains(&self, distance: F) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }
}

/// Data describing a family of chains: geometry, link physics, limits, LOD.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainProfile<F: Float> {
    pub kind: ChainKind,
    pub default_segment_count: usize,
    /// Total rest length of the chain.
    pub default_length: F,
    pub link_mass: F,
    pub stiffness: F,
    /// Largest bend between consecutive links, in radians.
    pub swing_limit: Option<F>,
    pub break_tension: Option<F>,
    /// Leave the far end unattached.
    pub loose_end: bool,
    pub allow_length_change: bool,
    pub lod_levels: AllocVec<LodLevel<F>>,
}

impl<F: Float> ChainProfile<F> {
    /// Preset values for `kind`, with a single LOD band covering all distances.
    pub fn new(kind: ChainKind) -> Self {
        let f = F::from_f32;
        let (segments, length, mass, stiffness, swing, tension) = match kind {
            ChainKind::Rope => (8, 5.0, 0.2, 0.9, None, None),
            ChainKind::MetalChain => (12, 3.0, 1.0, 1.0, Some(0.8), None),
            ChainKind::Grapple => (16, 12.0, 0.1, 1.0, None, Some(4.0)),
            ChainKind::Restraint => (4, 1.0, 0.5, 1.0, Some(0.5), Some(2.0)),
            ChainKind::Custom => (8, 5.0, 1.0, 1.0, None, None),
        };
        ChainProfile {
            kind,
            default_segment_count: segments,
            default_length: f(length),
            link_mass: f(mass),
            stiffness: f(stiffness),
            swing_limit: swing.map(f),
            break_tension: tension.map(f),
            loose_end: matches!(kind, ChainKind::Rope | ChainKind::Grapple),
            allow_length_change: matches!(kind, ChainKind::Rope | ChainKind::Grapple),
            lod_levels: alloc::vec![LodLevel::new(F::zero(), f(100_000.0))],
        }
    }

    pub fn with_lod_levels(mut self, levels: AllocVec<LodLevel<F>>) -> Self {
        self.lod_levels = levels;
        self
    }

    /// Segment count ignoring LOD; never below 2.
    pub fn base_segment_count(&self) -> usize {
        self.default_segment_count.max(2)
    }

    /// Total length ignoring LOD; never below 1.0.
    pub fn base_length(&self) -> F {
        self.default_length.max(F::one())
    }

    /// First LOD band containing `distance`. Negative distances count as 0.
    pub fn lod_index_for_distance(&self, distance: F) -> Option<usize> {
        let distance = distance.max(F::zero());
        self.lod_levels.iter().position(|lod| lod.contains(distance))
    }

    pub fn segment_count_at_distance(&self, distance: F) -> usize {
        match self.lod_index_for_distance(distance).map(|i| &self.lod_levels[i]) {
            Some(lod) if lod.segment_count_override > 0 => lod.segment_count_override.max(2),
            _ => self.base_segment_count(),
        }
    }

    /// False when the matching LOD band disables simulation.
    pub fn simulates_at_distance(&self, distance: F) -> bool {
        self.simulation_at_distance(distance).simulate
    }

    /// Simulation switch and rate of the band containing `distance`; full
    /// rate outside every band.
    pub fn simulation_at_distance(&self, distance: F) -> SimulationLod<F> {
        self.lod_index_for_distance(distance)
            .map_or_else(SimulationLod::full, |i| self.lod_levels[i].simulation())
    }

    /// Chain parameters at `distance`, keeping the total length fixed as the
    /// segment count changes.
    pub fn params_at_distance(&self, distance: F) -> ChainParams<F> {
        let segments = self.segment_count_at_distance(distance);
        let rest = self.base_length() / F::from_usize(segments);
        let mut params = ChainParams::new(segments, rest)
            .with_stiffness(self.stiffness)
            .with_particle_mass(self.link_mass)
            .with_length_change(self.allow_length_change);
        params.swing_limit = self.swing_limit;
        params.max_tension = self.break_tension;
        params
    }
}

impl<F: Float> Default for ChainProfile<F> {
    fn default() -> Self {
        Self::new(ChainKind::Rope)
    }
}
