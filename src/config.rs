//! Configuration for the chain solver and simulation.

use crate::float::Float;
use crate::vec::Vec;

/// Solver and lifecycle settings shared by every chain in a world.
///
/// # Builder Pattern
/// ```
/// use chain_constraint::config::SolverConfig;
/// use chain_constraint::vec::Vec3;
///
/// let config: SolverConfig<Vec3<f32>> = SolverConfig::new()
///     .with_iterations(16)
///     .with_gravity(Vec3::new(0.0, 0.0, -9.81))
///     .with_break_threshold_scale(1.5)
///     .with_damping(0.98);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig<V: Vec> {
    /// Solver passes per sub-step. Default: 8.
    pub iterations: usize,
    /// Sub-steps per `step` call. Default: 1.
    pub sub_steps: usize,
    /// Applied to every free particle while self-integrating. Default: zero.
    pub gravity: V,
    /// Velocity retention per sub-step in [0, 1]. 1.0 = no damping. Default: 0.99.
    pub damping: V::Scalar,
    /// Global multiplier on every link's break tension. Default: 1.0.
    pub break_threshold_scale: V::Scalar,
    /// Largest relative link error accepted as converged. Default: 1e-3.
    pub tolerance: V::Scalar,
    /// Speed under which an unpinned chain counts as settled. Default: 1e-3.
    pub settle_speed: V::Scalar,
    /// Consecutive settled steps before an unpinned chain is collected.
    /// 0 disables collection. Default: 120.
    pub settle_steps: u32,
}

impl<V: Vec> SolverConfig<V> {
    /// Defaults listed on each field.
    pub fn new() -> Self {
        SolverConfig {
            iterations: 8,
            sub_steps: 1,
            gravity: V::zero(),
            damping: V::Scalar::from_f32(0.99),
            break_threshold_scale: V::Scalar::one(),
            tolerance: V::Scalar::from_f32(1e-3),
            settle_speed: V::Scalar::from_f32(1e-3),
            settle_steps: 120,
        }
    }

    /// Set solver passes per sub-step.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set sub-steps per step; never below 1.
    pub fn with_sub_steps(mut self, sub_steps: usize) -> Self {
        self.sub_steps = sub_steps.max(1);
        self
    }

    /// Set the acceleration applied to free particles.
    pub fn with_gravity(mut self, gravity: V) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set velocity retention, clamped to [0, 1].
    pub fn with_damping(mut self, damping: V::Scalar) -> Self {
        self.damping = damping.clamp(V::Scalar::zero(), V::Scalar::one());
        self
    }

    /// Scale every link's break threshold.
    pub fn with_break_threshold_scale(mut self, scale: V::Scalar) -> Self {
        self.break_threshold_scale = scale;
        self
    }

    /// Set the largest relative link error counted as converged.
    pub fn with_tolerance(mut self, tolerance: V::Scalar) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Collect unpinned chains slower than `speed` for `steps` steps.
    pub fn with_settle(mut self, speed: V::Scalar, steps: u32) -> Self {
        self.settle_speed = speed;
        self.settle_steps = steps;
        self
    }
}

impl<V: Vec> Default for SolverConfig<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec::Vec2;

    #[test]
    fn sub_steps_never_zero() {
        let config: SolverConfig<Vec2<f32>> = SolverConfig::new().with_sub_steps(0);
        assert_eq!(config.sub_steps, 1);
    }

    #[test]
    fn damping_clamped() {
        let config: SolverConfig<Vec2<f32>> = SolverConfig::new().with_damping(1.5);
        assert_eq!(config.damping, 1.0);
    }
}
