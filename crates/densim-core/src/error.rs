//! Error types for the session layer.

use densim_engine::{EngineError, SlotIndex};
use thiserror::Error;

use crate::qubit::QubitRef;

/// Errors reported by a [`Session`](crate::Session) request.
///
/// Every error is terminal for the current request; nothing is retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No free slot left in the pool.
    #[error("Too many qubits in use; capacity is fixed to {capacity}")]
    CapacityExhausted {
        /// Pool size.
        capacity: usize,
    },

    /// Forced projection onto an outcome that is (almost) impossible.
    #[error("Cannot project {qubit} to {target}: {reason}")]
    InfeasibleProjection {
        /// The qubit being measured.
        qubit: QubitRef,
        /// Requested outcome.
        target: u8,
        /// Why the projection was rejected.
        reason: String,
    },

    /// Binding to a slot that is out of range or already live.
    #[error("Slot {0} is not free")]
    SlotUnavailable(SlotIndex),

    /// Gate with an operand count other than one or two.
    #[error("Only one- and two-qubit gates are supported; {0} is too many")]
    UnsupportedArity(usize),

    /// Gate matrix size does not match the operand count.
    #[error("Gate matrix must have {expected} elements, got {actual}")]
    MatrixSize {
        /// Element count required by the operand count.
        expected: usize,
        /// Element count received.
        actual: usize,
    },

    /// The same qubit appears twice in one gate.
    #[error("Qubit {0} appears more than once in a gate")]
    RepeatedOperand(QubitRef),

    /// Number of measurement methods does not match the qubit count.
    #[error("Expected {expected} measurement methods, got {actual}")]
    MethodCount {
        /// Number of qubits in the request.
        expected: usize,
        /// Number of methods supplied.
        actual: usize,
    },

    /// Reference to a qubit that is not allocated.
    #[error("Unknown qubit {0}")]
    UnknownRef(QubitRef),

    /// Allocation of a qubit that is already allocated.
    #[error("Qubit {0} is already allocated")]
    DuplicateRef(QubitRef),

    /// The engine failed to load. The session cannot recover from this.
    #[error("Failed to load simulation engine: {0}")]
    EngineLoad(String),

    /// A request needed the engine after it failed to load.
    #[error("Simulation engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Error reported by the engine.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Invalid session configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
