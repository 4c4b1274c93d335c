//! Break events and per-step reports.

use crate::float::Float;
use crate::registry::ChainHandle;
use alloc::vec::Vec as AllocVec;

/// What triggered a break.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakCause {
    /// Link tension exceeded its scaled threshold.
    Tension,
    /// Requested through `break_link`.
    Manual,
}

/// How the lifecycle manager resolved a break.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BreakOutcome {
    /// Both remainders kept links and became new chains.
    Split { first: ChainHandle, second: ChainHandle },
    /// One remainder was a single particle and was dropped.
    Trimmed { survivor: ChainHandle },
    /// Neither remainder had a link left.
    Destroyed,
    /// Requested during an open host step; the split is reported when the
    /// step finishes.
    Deferred,
}

impl BreakOutcome {
    /// Chains that exist after the break, in chain order.
    pub fn survivors(&self) -> AllocVec<ChainHandle> {
        match *self {
            BreakOutcome::Split { first, second } => alloc::vec![first, second],
            BreakOutcome::Trimmed { survivor } => alloc::vec![survivor],
            BreakOutcome::Destroyed | BreakOutcome::Deferred => AllocVec::new(),
        }
    }
}

/// A link broke. The original chain handle is retired.
#[derive(Clone, Debug, PartialEq)]
pub struct BreakEvent<F: Float> {
    pub chain: ChainHandle,
    pub link: usize,
    pub tension: F,
    /// Scaled threshold that was exceeded; `None` for manual breaks.
    pub threshold: Option<F>,
    pub cause: BreakCause,
    pub outcome: BreakOutcome,
}

/// Summary of one `step` call.
#[derive(Clone, Debug, PartialEq)]
pub struct StepReport<F: Float> {
    /// True when the step returned early because no chain exists.
    pub skipped: bool,
    pub chains_solved: usize,
    pub breaks: AllocVec<BreakEvent<F>>,
    /// Chains that ended the solve above tolerance.
    pub unmet_tolerance: usize,
    /// Largest relative link error across all chains.
    pub max_residual: F,
    /// Unpinned chains collected after settling.
    pub collected: AllocVec<ChainHandle>,
}

impl<F: Float> StepReport<F> {
    pub(crate) fn skipped() -> Self {
        StepReport { skipped: true, ..Self::default() }
    }
}

impl<F: Float> Default for StepReport<F> {
    fn default() -> Self {
        StepReport {
            skipped: false,
            chains_solved: 0,
            breaks: AllocVec::new(),
            unmet_tolerance: 0,
            max_residual: F::zero(),
            collected: AllocVec::new(),
        }
    }
}
