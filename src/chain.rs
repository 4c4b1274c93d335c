//! Chain topology: particles joined into a simple path by distance links.

use crate::error::{ChainError, TopologyError};
use crate::float::Float;
use crate::link::Link;
use crate::particle::Particle;
use crate::vec::Vec;
use alloc::vec::Vec as AllocVec;

/// Parameters for building a chain between two anchors.
///
/// # Builder Pattern
/// ```
/// use chain_constraint::chain::ChainParams;
///
/// let params: ChainParams<f32> = ChainParams::new(12, 0.5)
///     .with_stiffness(0.9)
///     .with_max_tension(2.0)
///     .with_swing_limit(core::f32::consts::FRAC_PI_4);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ChainParams<F: Float> {
    pub segment_count: usize,
    /// Rest length of each link.
    pub rest_length: F,
    /// 1.0 = rigid, below 1.0 = soft.
    pub stiffness: F,
    pub particle_mass: F,
    /// Per-link break threshold. `None` = unbreakable.
    pub max_tension: Option<F>,
    /// Largest bend between consecutive links, in radians.
    pub swing_limit: Option<F>,
    pub allow_length_change: bool,
}

impl<F: Float> ChainParams<F> {
    pub fn new(segment_count: usize, rest_length: F) -> Self {
        ChainParams {
            segment_count,
            rest_length,
            stiffness: F::one(),
            particle_mass: F::one(),
            max_tension: None,
            swing_limit: None,
            allow_length_change: true,
        }
    }

    /// Set link stiffness in [0, 1].
    pub fn with_stiffness(mut self, stiffness: F) -> Self {
        self.stiffness = stiffness;
        self
    }

    /// Set the mass of every particle.
    pub fn with_particle_mass(mut self, mass: F) -> Self {
        self.particle_mass = mass;
        self
    }

    /// Make every link breakable above `max_tension`.
    pub fn with_max_tension(mut self, max_tension: F) -> Self {
        self.max_tension = Some(max_tension);
        self
    }

    /// Limit the bend between consecutive links.
    pub fn with_swing_limit(mut self, radians: F) -> Self {
        self.swing_limit = Some(radians);
        self
    }

    /// Allow or forbid `set_total_length` at runtime.
    pub fn with_length_change(mut self, allowed: bool) -> Self {
        self.allow_length_change = allowed;
        self
    }

    /// Reject malformed requests before any state is created.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.segment_count < 1 {
            return Err(TopologyError::NoSegments);
        }
        if !self.rest_length.is_finite() || self.rest_length <= F::zero() {
            return Err(TopologyError::InvalidRestLength);
        }
        if !(self.stiffness >= F::zero() && self.stiffness <= F::one()) {
            return Err(TopologyError::InvalidStiffness);
        }
        if !self.particle_mass.is_finite() || self.particle_mass <= F::zero() {
            return Err(TopologyError::InvalidMass);
        }
        if let Some(t) = self.max_tension {
            if !t.is_finite() || t < F::zero() {
                return Err(TopologyError::InvalidMaxTension);
            }
        }
        if let Some(angle) = self.swing_limit {
            if !angle.is_finite() || angle < F::zero() {
                return Err(TopologyError::InvalidSwingLimit);
            }
        }
        Ok(())
    }
}

/// One end of a chain at creation time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Anchor<V: Vec> {
    /// Kinematic attachment point; the end particle is pinned here.
    Pinned(V),
    /// Loose end starting at this position.
    Free(V),
}

impl<V: Vec> Anchor<V> {
    pub fn position(&self) -> V {
        match *self {
            Anchor::Pinned(p) | Anchor::Free(p) => p,
        }
    }

    pub fn is_pinned(&self) -> bool {
        matches!(self, Anchor::Pinned(_))
    }
}

/// Either end of a chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChainEnd {
    Start,
    End,
}

/// Lifecycle of a chain inside the registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChainState {
    /// Built, not yet part of a constraint set.
    Created,
    /// Registered in the constraint set and solved every step.
    Active,
    /// A break was accepted this step; the split is pending.
    Breaking,
    /// Released. Only ever reported for dead handles.
    Destroyed,
}

/// How often a chain is simulated, usually picked from a [`LodLevel`].
///
/// [`LodLevel`]: crate::profile::LodLevel
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimulationLod<F: Float> {
    /// False freezes the chain: no integration, no solve.
    pub simulate: bool,
    /// Fraction of steps the chain ticks on. 1.0 = every step, 0.5 = every
    /// other step.
    pub rate: F,
}

impl<F: Float> SimulationLod<F> {
    /// Lowest accepted rate.
    pub const MIN_RATE: f32 = 0.01;

    pub fn full() -> Self {
        SimulationLod { simulate: true, rate: F::one() }
    }

    pub fn disabled() -> Self {
        SimulationLod { simulate: false, rate: F::one() }
    }

    pub fn with_rate(rate: F) -> Self {
        SimulationLod { simulate: true, rate }
    }

    fn clamped(self) -> Self {
        let rate = if self.rate.is_finite() { self.rate } else { F::one() };
        SimulationLod { rate: rate.clamp(F::from_f32(Self::MIN_RATE), F::one()), ..self }
    }
}

impl<F: Float> Default for SimulationLod<F> {
    fn default() -> Self {
        Self::full()
    }
}

/// A rope: particles `0..=n` joined so that link `i` spans `i` and `i + 1`.
#[derive(Clone, Debug)]
pub struct Chain<V: Vec> {
    particles: AllocVec<Particle<V>>,
    links: AllocVec<Link<V::Scalar>>,
    params: ChainParams<V::Scalar>,
    simulation: SimulationLod<V::Scalar>,
    tick_credit: V::Scalar,
    ticking: bool,
    pub(crate) state: ChainState,
    pub(crate) settled_steps: u32,
}

impl<V: Vec> Chain<V> {
    /// Lay out `segment_count` links on the line between the anchors.
    ///
    /// When the anchors are further apart than the requested total length,
    /// the rest length grows to the span so the chain starts taut. The
    /// stored params carry the rest length actually used.
    pub fn build(
        start: Anchor<V>,
        end: Anchor<V>,
        params: ChainParams<V::Scalar>,
    ) -> Result<Self, ChainError> {
        params.validate()?;
        if !start.position().is_finite() || !end.position().is_finite() {
            return Err(TopologyError::InvalidAnchor.into());
        }

        let segments = params.segment_count;
        let n = V::Scalar::from_usize(segments);
        let span = start.position().distance(end.position());
        let rest_length = params.rest_length.max(span / n);
        let params = ChainParams { rest_length, ..params };

        let mut particles = AllocVec::with_capacity(segments + 1);
        for i in 0..=segments {
            let t = V::Scalar::from_usize(i) / n;
            let pos = start.position().lerp(end.position(), t);
            particles.push(Particle::new(pos, params.particle_mass));
        }
        if start.is_pinned() {
            particles[0].pin();
        }
        if end.is_pinned() {
            particles[segments].pin();
        }

        let links = (0..segments)
            .map(|i| Link::new(i, i + 1, rest_length, params.stiffness, params.max_tension))
            .collect();

        Ok(Chain::assemble(particles, links, params, SimulationLod::full(), ChainState::Created))
    }

    fn assemble(
        particles: AllocVec<Particle<V>>,
        links: AllocVec<Link<V::Scalar>>,
        params: ChainParams<V::Scalar>,
        simulation: SimulationLod<V::Scalar>,
        state: ChainState,
    ) -> Self {
        let params = ChainParams { segment_count: links.len(), ..params };
        Chain {
            particles,
            links,
            params,
            simulation,
            tick_credit: V::Scalar::zero(),
            ticking: simulation.simulate,
            state,
            settled_steps: 0,
        }
    }

    /// Split at `link_index`, dropping that link.
    ///
    /// The first half keeps particles `0..=i`, the second half keeps the
    /// rest. Either half may end up with a single particle and no links.
    pub fn split_at(mut self, link_index: usize) -> Result<(Chain<V>, Chain<V>), ChainError> {
        self.check_link(link_index)?;
        let tail_particles = self.particles.split_off(link_index + 1);
        let tail_links: AllocVec<_> = self
            .links
            .split_off(link_index + 1)
            .iter()
            .map(|l| l.shifted(link_index + 1))
            .collect();
        self.links.truncate(link_index);

        let sim = self.simulation;
        let head = Chain::assemble(self.particles, self.links, self.params.clone(), sim, ChainState::Active);
        let tail = Chain::assemble(tail_particles, tail_links, self.params, sim, ChainState::Active);
        Ok((head, tail))
    }

    pub fn particles(&self) -> &[Particle<V>] {
        &self.particles
    }

    pub fn links(&self) -> &[Link<V::Scalar>] {
        &self.links
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut [Particle<V>], &mut [Link<V::Scalar>]) {
        (&mut self.particles, &mut self.links)
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle<V>] {
        &mut self.particles
    }

    pub fn params(&self) -> &ChainParams<V::Scalar> {
        &self.params
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn simulation(&self) -> SimulationLod<V::Scalar> {
        self.simulation
    }

    /// Change how often the chain is simulated. The rate is clamped to
    /// `[0.01, 1]`.
    pub fn set_simulation(&mut self, simulation: SimulationLod<V::Scalar>) {
        self.simulation = simulation.clamped();
        self.tick_credit = V::Scalar::zero();
        self.ticking = self.simulation.simulate;
    }

    /// Whether the chain is integrated and solved in the current step.
    pub fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Decide whether the chain ticks this step from its simulation rate.
    pub(crate) fn advance_tick(&mut self) -> bool {
        self.ticking = self.simulation.simulate && {
            self.tick_credit = self.tick_credit + self.simulation.rate;
            if self.tick_credit >= V::Scalar::one() {
                self.tick_credit = self.tick_credit - V::Scalar::one();
                true
            } else {
                false
            }
        };
        self.ticking
    }

    pub fn positions(&self) -> AllocVec<V> {
        self.particles.iter().map(|p| p.pos).collect()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn pinned_count(&self) -> usize {
        self.particles.iter().filter(|p| p.pinned).count()
    }

    pub fn particle(&self, index: usize) -> Option<&Particle<V>> {
        self.particles.get(index)
    }

    pub fn link(&self, index: usize) -> Option<&Link<V::Scalar>> {
        self.links.get(index)
    }

    /// Sum of rest lengths.
    pub fn rest_length(&self) -> V::Scalar {
        self.links.iter().fold(V::Scalar::zero(), |acc, l| acc + l.rest_length)
    }

    /// Sum of current link lengths.
    pub fn current_length(&self) -> V::Scalar {
        self.links.iter().fold(V::Scalar::zero(), |acc, l| {
            acc + self.particles[l.a].pos.distance(self.particles[l.b].pos)
        })
    }

    /// Particle index at `end`.
    pub fn end_index(&self, end: ChainEnd) -> usize {
        match end {
            ChainEnd::Start => 0,
            ChainEnd::End => self.particles.len() - 1,
        }
    }

    pub fn pin(&mut self, index: usize) -> Result<(), ChainError> {
        self.check_particle(index)?;
        self.particles[index].pin();
        Ok(())
    }

    pub fn unpin(&mut self, index: usize) -> Result<(), ChainError> {
        self.check_particle(index)?;
        self.particles[index].unpin();
        self.settled_steps = 0;
        Ok(())
    }

    /// Move a pinned particle, pinning it first if it was free.
    pub fn move_pin(&mut self, index: usize, pos: V) -> Result<(), ChainError> {
        self.check_particle(index)?;
        let p = &mut self.particles[index];
        if !p.pinned {
            p.pin();
        }
        p.move_to(pos);
        Ok(())
    }

    pub fn apply_force_at(&mut self, index: usize, force: V) -> Result<(), ChainError> {
        self.check_particle(index)?;
        self.particles[index].apply_force(force);
        self.settled_steps = 0;
        Ok(())
    }

    pub fn apply_acceleration(&mut self, accel: V) {
        for p in self.particles.iter_mut() {
            p.apply_acceleration(accel);
        }
    }

    /// Rescale every link so the rest lengths sum to `total`.
    pub fn set_total_length(&mut self, total: V::Scalar) -> Result<(), ChainError> {
        if !self.params.allow_length_change {
            return Err(ChainError::LengthChangeDisallowed);
        }
        if !total.is_finite() || total <= V::Scalar::zero() {
            return Err(TopologyError::InvalidTargetLength.into());
        }
        if self.links.is_empty() {
            return Ok(());
        }
        let each = total / V::Scalar::from_usize(self.links.len());
        for link in self.links.iter_mut() {
            link.rest_length = each;
        }
        self.params.rest_length = each;
        self.settled_steps = 0;
        Ok(())
    }

    /// Largest per-step displacement of any particle.
    pub(crate) fn max_displacement(&self) -> V::Scalar {
        self.particles
            .iter()
            .fold(V::Scalar::zero(), |acc, p| acc.max(p.displacement().length()))
    }

    pub(crate) fn check_link(&self, index: usize) -> Result<(), ChainError> {
        if index < self.links.len() {
            Ok(())
        } else {
            Err(ChainError::LinkOutOfBounds { index, count: self.links.len() })
        }
    }

    fn check_particle(&self, index: usize) -> Result<(), ChainError> {
        if index < self.particles.len() {
            Ok(())
        } else {
            Err(ChainError::ParticleOutOfBounds { index, count: self.particles.len() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::Vec2;

    fn anchors(len: f32) -> (Anchor<Vec2<f32>>, Anchor<Vec2<f32>>) {
        (Anchor::Pinned(Vec2::new(0.0, 0.0)), Anchor::Free(Vec2::new(len, 0.0)))
    }

    #[test]
    fn zero_segments_rejected() {
        let (a, b) = anchors(1.0);
        let err = Chain::build(a, b, ChainParams::new(0, 1.0)).unwrap_err();
        assert_eq!(err, ChainError::InvalidTopology(TopologyError::NoSegments));
    }

    #[test]
    fn non_positive_rest_length_rejected() {
        let (a, b) = anchors(1.0);
        for rest in [0.0, -1.0, f32::NAN] {
            let err = Chain::build(a, b, ChainParams::new(3, rest)).unwrap_err();
            assert_eq!(err, ChainError::InvalidTopology(TopologyError::InvalidRestLength));
        }
    }

    #[test]
    fn stiffness_out_of_range_rejected() {
        let (a, b) = anchors(1.0);
        let params = ChainParams::new(3, 1.0).with_stiffness(1.5);
        assert!(Chain::build(a, b, params).is_err());
    }

    #[test]
    fn single_segment_has_two_particles() {
        let (a, b) = anchors(1.0);
        let chain = Chain::build(a, b, ChainParams::new(1, 1.0)).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.link_count(), 1);
        assert!(chain.particle(0).unwrap().pinned);
        assert!(!chain.particle(1).unwrap().pinned);
    }

    #[test]
    fn wide_anchors_stretch_rest_length() {
        let (a, _) = anchors(0.0);
        let b = Anchor::Pinned(Vec2::new(6.0, 0.0));
        let chain = Chain::build(a, b, ChainParams::new(5, 1.0)).unwrap();
        for link in chain.links() {
            assert!((link.rest_length - 1.2).abs() < 1e-6);
        }
        assert!((chain.params().rest_length - 1.2).abs() < 1e-6);
        assert!((chain.rest_length() - 6.0).abs() < 1e-5);
    }

    #[test]
    fn slack_build_keeps_requested_rest_length() {
        let (a, b) = anchors(2.0);
        let chain = Chain::build(a, b, ChainParams::new(4, 1.0)).unwrap();
        assert_eq!(chain.params().rest_length, 1.0);
    }

    #[test]
    fn bad_break_and_swing_limits_rejected() {
        let (a, b) = anchors(2.0);
        for t in [-0.5, f32::NAN, f32::INFINITY] {
            let err = Chain::build(a, b, ChainParams::new(2, 1.0).with_max_tension(t)).unwrap_err();
            assert_eq!(err, ChainError::InvalidTopology(TopologyError::InvalidMaxTension));
        }
        for angle in [-0.1, f32::NAN] {
            let err = Chain::build(a, b, ChainParams::new(2, 1.0).with_swing_limit(angle)).unwrap_err();
            assert_eq!(err, ChainError::InvalidTopology(TopologyError::InvalidSwingLimit));
        }
        assert!(ChainParams::<f32>::new(2, 1.0).with_max_tension(0.0).validate().is_ok());
    }

    #[test]
    fn half_rate_ticks_every_other_step() {
        let (a, b) = anchors(2.0);
        let mut chain = Chain::build(a, b, ChainParams::new(2, 1.0)).unwrap();
        chain.set_simulation(SimulationLod::with_rate(0.5));
        let ticks: AllocVec<bool> = (0..4).map(|_| chain.advance_tick()).collect();
        assert_eq!(ticks, alloc::vec![false, true, false, true]);

        chain.set_simulation(SimulationLod::disabled());
        assert!(!chain.is_ticking());
        assert!(!chain.advance_tick());

        chain.set_simulation(SimulationLod::with_rate(0.0));
        assert_eq!(chain.simulation().rate, 0.01);
    }

    #[test]
    fn split_halves_inherit_simulation() {
        let (a, b) = anchors(4.0);
        let mut chain = Chain::build(a, b, ChainParams::new(4, 1.0)).unwrap();
        chain.set_simulation(SimulationLod::with_rate(0.25));
        let (head, tail) = chain.split_at(1).unwrap();
        assert_eq!(head.simulation().rate, 0.25);
        assert_eq!(tail.simulation().rate, 0.25);
    }

    #[test]
    fn split_conserves_particles() {
        let (a, b) = anchors(6.0);
        let chain = Chain::build(a, b, ChainParams::new(6, 1.0)).unwrap();
        let (head, tail) = chain.split_at(2).unwrap();
        assert_eq!(head.len() + tail.len(), 7);
        assert_eq!(head.link_count() + tail.link_count(), 5);
        assert_eq!(head.link_count(), 2);
        assert_eq!(tail.link(0).map(|l| (l.a, l.b)), Some((0, 1)));
        assert_eq!(tail.params().segment_count, 3);
    }

    #[test]
    fn split_at_end_leaves_lone_particle() {
        let (a, b) = anchors(3.0);
        let chain = Chain::build(a, b, ChainParams::new(3, 1.0)).unwrap();
        let (head, tail) = chain.split_at(2).unwrap();
        assert_eq!(head.link_count(), 2);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail.link_count(), 0);
    }

    #[test]
    fn split_out_of_bounds() {
        let (a, b) = anchors(3.0);
        let chain = Chain::build(a, b, ChainParams::new(3, 1.0)).unwrap();
        assert_eq!(
            chain.split_at(3).unwrap_err(),
            ChainError::LinkOutOfBounds { index: 3, count: 3 }
        );
    }

    #[test]
    fn length_change_respects_params() {
        let (a, b) = anchors(4.0);
        let mut chain = Chain::build(a, b, ChainParams::new(4, 1.0)).unwrap();
        chain.set_total_length(8.0).unwrap();
        assert!((chain.rest_length() - 8.0).abs() < 1e-5);

        let mut fixed =
            Chain::build(a, b, ChainParams::new(4, 1.0).with_length_change(false)).unwrap();
        assert_eq!(fixed.set_total_length(8.0), Err(ChainError::LengthChangeDisallowed));
    }
}
