//! Error types for chain requests.

use thiserror::Error;

/// Why a chain request was rejected as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("a chain needs at least one segment")]
    NoSegments,
    #[error("rest length must be positive and finite")]
    InvalidRestLength,
    #[error("stiffness must be in [0, 1]")]
    InvalidStiffness,
    #[error("particle mass must be positive and finite")]
    InvalidMass,
    #[error("target length must be positive and finite")]
    InvalidTargetLength,
    #[error("anchor position is not finite")]
    InvalidAnchor,
    #[error("max tension must be non-negative and finite")]
    InvalidMaxTension,
    #[error("swing limit must be non-negative and finite")]
    InvalidSwingLimit,
}

/// Errors returned synchronously by chain operations.
///
/// Solve-time anomalies never surface here; they are recorded in
/// [`SolverDiagnostics`](crate::diagnostics::SolverDiagnostics).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("invalid chain topology: {0}")]
    InvalidTopology(#[from] TopologyError),
    #[error("chain handle does not refer to a live chain")]
    UnknownChain,
    #[error("link index {index} out of bounds (count: {count})")]
    LinkOutOfBounds { index: usize, count: usize },
    #[error("particle index {index} out of bounds (count: {count})")]
    ParticleOutOfBounds { index: usize, count: usize },
    #[error("particle buffer holds {actual} states, expected {expected}")]
    BufferMismatch { expected: usize, actual: usize },
    #[error("chain was built from a profile that forbids length changes")]
    LengthChangeDisallowed,
}
