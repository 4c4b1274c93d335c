//! Distance links between adjacent chain particles.

use crate::float::Float;

/// One segment of a chain: particle `a` is always `b - 1`.
///
/// Everything except `tension` (and `rest_length`, on an explicit length
/// change) is fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Link<F: Float> {
    pub a: usize,
    pub b: usize,
    pub rest_length: F,
    /// Fraction of the error corrected per projection, in [0, 1].
    pub stiffness: F,
    /// Tension above which the link breaks. `None` never breaks.
    pub max_tension: Option<F>,
    tension: F,
}

impl<F: Float> Link<F> {
    pub fn new(a: usize, b: usize, rest_length: F, stiffness: F, max_tension: Option<F>) -> Self {
        Link { a, b, rest_length, stiffness, max_tension, tension: F::zero() }
    }

    /// Peak strain the link carried during the last solve, scaled by
    /// stiffness: the larger of the strain at solve entry and after the last
    /// iteration. Never negative.
    pub fn tension(&self) -> F {
        self.tension
    }

    pub(crate) fn reset_tension(&mut self) {
        self.tension = F::zero();
    }

    /// Raise the tension to the strain at `length` if that is higher.
    pub(crate) fn observe(&mut self, length: F) {
        let strain = self.stiffness * (length - self.rest_length) / self.rest_length;
        self.tension = self.tension.max(strain);
    }

    /// Effective break threshold after the global scale is applied.
    pub fn break_threshold(&self, scale: F) -> Option<F> {
        self.max_tension.map(|t| t * scale)
    }

    pub fn exceeds(&self, scale: F) -> bool {
        match self.break_threshold(scale) {
            Some(threshold) => self.tension > threshold,
            None => false,
        }
    }

    /// Same link shifted `offset` particles towards the chain start.
    pub(crate) fn shifted(&self, offset: usize) -> Self {
        Link { a: self.a - offset, b: self.b - offset, ..self.clone() }
    }
}
