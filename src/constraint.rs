//! Chain constraints: distance, angular (swing limit) and breakage.
//!
//! Constraints hold indices only. Rest lengths and stiffness are read from
//! the chain's links at solve time, so a length change never invalidates a
//! built constraint list.

use crate::float::Float;
use crate::link::Link;
use crate::particle::Particle;
use crate::vec::Vec;

/// The closed set of constraints a chain is made of.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint<F: Float> {
    /// Keeps `links[link]` at its rest length.
    Distance { link: usize },
    /// Limits the bend between `links[first]` and `links[first + 1]`.
    ///
    /// `cos_limit` is the cosine of the largest allowed deviation from a
    /// straight line, enforced as a minimum distance between the outer
    /// particles of the pair.
    Angular { first: usize, cos_limit: F },
    /// Compares `links[link]` tension against its threshold after the
    /// iterations. Never projected.
    Breakage { link: usize },
}

impl<F: Float> Constraint<F> {
    /// Project this constraint once, in place.
    pub fn project<V>(&self, particles: &mut [Particle<V>], links: &[Link<F>])
    where
        V: Vec<Scalar = F>,
    {
        match *self {
            Constraint::Distance { link } => project_distance(particles, &links[link]),
            Constraint::Angular { first, cos_limit } => {
                project_angular(particles, &links[first], &links[first + 1], cos_limit)
            }
            Constraint::Breakage { .. } => {}
        }
    }

    pub fn is_projected(&self) -> bool {
        !matches!(self, Constraint::Breakage { .. })
    }
}

/// Move both endpoints towards rest length, weighted by inverse mass.
fn project_distance<V: Vec>(particles: &mut [Particle<V>], link: &Link<V::Scalar>) {
    let eps = V::Scalar::epsilon();
    let delta = particles[link.b].pos - particles[link.a].pos;
    let dist = delta.length();
    if dist.is_near_zero(eps) {
        return; // degenerate
    }

    let error = dist - link.rest_length;
    let w_a = particles[link.a].inv_mass;
    let w_b = particles[link.b].inv_mass;
    let w_total = w_a + w_b;
    if w_total.is_near_zero(eps) {
        return; // both pinned
    }

    let correction = delta.scale(error * link.stiffness / (dist * w_total));
    let a = &mut particles[link.a];
    if !a.pinned {
        a.pos = a.pos + correction.scale(w_a);
    }
    let b = &mut particles[link.b];
    if !b.pinned {
        b.pos = b.pos - correction.scale(w_b);
    }
}

fn project_angular<V: Vec>(
    particles: &mut [Particle<V>],
    first: &Link<V::Scalar>,
    second: &Link<V::Scalar>,
    cos_limit: V::Scalar,
) {
    let eps = V::Scalar::epsilon();
    let (l1, l2) = (first.rest_length, second.rest_length);
    let two = V::Scalar::from_f32(2.0);
    let min_sq = l1 * l1 + l2 * l2 + two * l1 * l2 * cos_limit;
    if min_sq <= V::Scalar::zero() {
        return; // limit allows folding flat
    }
    let min_dist = min_sq.sqrt();

    let (ia, ic) = (first.a, second.b);
    let delta = particles[ic].pos - particles[ia].pos;
    let dist = delta.length();
    if dist >= min_dist || dist.is_near_zero(eps) {
        return;
    }

    let w_a = particles[ia].inv_mass;
    let w_c = particles[ic].inv_mass;
    let w_total = w_a + w_c;
    if w_total.is_near_zero(eps) {
        return;
    }

    let stiffness = first.stiffness.min(second.stiffness);
    let correction = delta.scale((dist - min_dist) * stiffness / (dist * w_total));
    let a = &mut particles[ia];
    if !a.pinned {
        a.pos = a.pos + correction.scale(w_a);
    }
    let c = &mut particles[ic];
    if !c.pinned {
        c.pos = c.pos - correction.scale(w_c);
    }
}
