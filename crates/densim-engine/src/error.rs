//! Error types for the engine crate.

use thiserror::Error;

use crate::slot::SlotIndex;

/// Errors reported by a density-matrix engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A slot index outside the engine's fixed range.
    #[error("Slot {slot} is out of range; engine capacity is {capacity}")]
    SlotOutOfRange {
        /// The offending slot.
        slot: SlotIndex,
        /// Number of slots the engine was created with.
        capacity: usize,
    },

    /// Too many slots are entangled at once.
    #[error("Dense state would exceed {limit} entangled slots")]
    DenseLimitExceeded {
        /// Configured dense limit.
        limit: usize,
    },

    /// Projecting a classical slot onto the value it does not hold.
    #[error("Cannot project classical slot {slot} onto {outcome}")]
    InconsistentProjection {
        /// The slot.
        slot: SlotIndex,
        /// Requested outcome.
        outcome: u8,
    },

    /// Gate matrix has the wrong number of elements.
    #[error("Gate matrix must have {expected} elements, got {actual}")]
    MatrixSize {
        /// Element count required.
        expected: usize,
        /// Element count received.
        actual: usize,
    },

    /// A transfer matrix applied with the wrong number of operands.
    #[error("Transfer matrix acts on {expected} operands, applied to {actual}")]
    ArityMismatch {
        /// Operand count of the transfer matrix.
        expected: usize,
        /// Operand count of the call.
        actual: usize,
    },

    /// Both operands of a two-operand gate are the same slot.
    #[error("Two-operand gate applied twice to slot {0}")]
    DuplicateOperand(SlotIndex),

    /// The slot is part of the dense state and has no classical value.
    #[error("Slot {0} is entangled and has no classical value")]
    SlotEntangled(SlotIndex),

    /// The engine could not be created.
    #[error("Failed to load engine: {0}")]
    Load(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
