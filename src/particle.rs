//! Chain particles and the state record exchanged with the host.

use crate::float::Float;
use crate::vec::Vec;

/// A Verlet particle owned by exactly one chain.
///
/// Velocity is implicit in `pos - prev_pos`.
#[derive(Clone, Debug)]
pub struct Particle<V: Vec> {
    pub pos: V,
    pub prev_pos: V,
    pub acceleration: V,
    pub inv_mass: V::Scalar,
    pub pinned: bool,
    mass: V::Scalar,
}

impl<V: Vec> Particle<V> {
    pub fn new(pos: V, mass: V::Scalar) -> Self {
        Particle {
            pos,
            prev_pos: pos,
            acceleration: V::zero(),
            inv_mass: inverse(mass),
            pinned: false,
            mass,
        }
    }

    /// A kinematic anchor: infinite effective mass.
    pub fn pinned(pos: V, mass: V::Scalar) -> Self {
        let mut p = Particle::new(pos, mass);
        p.pin();
        p
    }

    pub fn mass(&self) -> V::Scalar {
        self.mass
    }

    pub fn apply_force(&mut self, force: V) {
        if !self.pinned {
            self.acceleration = self.acceleration + force.scale(self.inv_mass);
        }
    }

    pub fn apply_acceleration(&mut self, accel: V) {
        if !self.pinned {
            self.acceleration = self.acceleration + accel;
        }
    }

    pub fn integrate(&mut self, dt: V::Scalar, damping: V::Scalar) {
        if self.pinned {
            self.acceleration = V::zero();
            return;
        }
        let velocity = (self.pos - self.prev_pos).scale(damping);
        let next = self.pos + velocity + self.acceleration.scale(dt * dt);
        self.prev_pos = self.pos;
        self.pos = next;
        self.acceleration = V::zero();
    }

    pub fn velocity(&self, dt: V::Scalar) -> V {
        if dt.is_near_zero(V::Scalar::from_f32(1e-30)) {
            return V::zero();
        }
        (self.pos - self.prev_pos).scale(V::Scalar::one() / dt)
    }

    /// Displacement over the last step.
    pub fn displacement(&self) -> V {
        self.pos - self.prev_pos
    }

    pub fn pin(&mut self) {
        self.pinned = true;
        self.inv_mass = V::Scalar::zero();
        self.prev_pos = self.pos;
    }

    /// Release the particle, restoring the mass it was built with.
    pub fn unpin(&mut self) {
        self.pinned = false;
        self.inv_mass = inverse(self.mass);
    }

    /// Teleport a pinned particle; free particles are left alone.
    pub fn move_to(&mut self, pos: V) {
        if self.pinned {
            self.prev_pos = self.pos;
            self.pos = pos;
        }
    }

    pub fn state(&self, dt: V::Scalar) -> ParticleState<V> {
        ParticleState {
            position: self.pos,
            velocity: self.velocity(dt),
            inv_mass: self.inv_mass,
            pinned: self.pinned,
        }
    }

    /// Overwrite kinematics from a host buffer entry.
    ///
    /// The pinned flag and mass stay owned by the chain; a pinned particle
    /// still accepts its position so the host can drive anchors.
    pub fn load(&mut self, state: &ParticleState<V>, dt: V::Scalar) {
        self.pos = state.position;
        self.prev_pos = if self.pinned {
            state.position
        } else {
            state.position - state.velocity.scale(dt)
        };
    }
}

fn inverse<F: Float>(mass: F) -> F {
    if mass.is_near_zero(F::epsilon()) {
        F::zero()
    } else {
        F::one() / mass
    }
}

/// Particle state at the boundary with the host physics tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParticleState<V: Vec> {
    pub position: V,
    pub velocity: V,
    pub inv_mass: V::Scalar,
    pub pinned: bool,
}
