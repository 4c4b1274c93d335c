//! Step observer trait for monitoring the chain simulation.

use crate::event::BreakEvent;
use crate::float::Float;
use crate::registry::ChainHandle;

/// Hooks into the phases of a simulation step.
///
/// Implement this for debugging, visualization or profiling. Every method
/// defaults to a no-op.
pub trait StepObserver<F: Float> {
    /// Called after particles were integrated (self-integrated path only).
    fn on_integrate(&mut self) {}

    /// Called after a chain finished its iterations, with its largest
    /// relative link error.
    fn on_chain_solved(&mut self, _chain: ChainHandle, _residual: F) {}

    /// Called when a chain ends the solve above the configured tolerance.
    fn on_unmet_tolerance(&mut self, _chain: ChainHandle, _residual: F) {}

    /// Called once per break applied by the lifecycle phase.
    fn on_break(&mut self, _event: &BreakEvent<F>) {}

    /// Called when a step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// Observer that ignores everything.
pub struct NoOpStepObserver;

impl<F: Float> StepObserver<F> for NoOpStepObserver {}
