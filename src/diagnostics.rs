//! Running counters for the observability collaborator.

use crate::event::StepReport;
use crate::float::Float;

/// Totals accumulated over the lifetime of a world.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverDiagnostics<F: Float> {
    /// `step` calls that did work.
    pub steps: u64,
    /// `step` calls skipped because no chain existed.
    pub skipped_steps: u64,
    pub chain_solves: u64,
    /// Chain solves that ended above tolerance.
    pub unmet_tolerance: u64,
    pub breaks: u64,
    /// Over-threshold links left unbroken because their chain already had a
    /// break that step. Re-evaluated on the next step.
    pub deferred_breaks: u64,
    /// Unpinned chains collected after settling.
    pub collected: u64,
    /// Largest residual seen in the most recent step.
    pub last_max_residual: F,
}

impl<F: Float> Default for SolverDiagnostics<F> {
    fn default() -> Self {
        SolverDiagnostics {
            steps: 0,
            skipped_steps: 0,
            chain_solves: 0,
            unmet_tolerance: 0,
            breaks: 0,
            deferred_breaks: 0,
            collected: 0,
            last_max_residual: F::zero(),
        }
    }
}

impl<F: Float> SolverDiagnostics<F> {
    pub(crate) fn record(&mut self, report: &StepReport<F>) {
        if report.skipped {
            self.skipped_steps += 1;
            return;
        }
        self.steps += 1;
        self.chain_solves += report.chains_solved as u64;
        self.unmet_tolerance += report.unmet_tolerance as u64;
        self.breaks += report.breaks.len() as u64;
        self.collected += report.collected.len() as u64;
        self.last_max_residual = report.max_residual;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
