//! The engine seam.
//!
//! A [`DensityEngine`] owns a fixed number of slots. Every slot carries a
//! classical bit; slots that gates have touched may additionally be part of
//! an entangled (dense) state. The session above the engine decides which
//! logical qubit lives in which slot; the engine only ever sees indices.
//!
//! ```text
//!   set_classical() ──→ apply_single()/apply_two() ──→ peak_measurement()
//!                                                       │
//!                         renormalize() ←── project_measurement()
//! ```

use crate::error::EngineResult;
use crate::matrix::{Unitary2x2, Unitary4x4};
use crate::slot::SlotIndex;

/// A density-matrix simulation engine with a fixed slot range.
pub trait DensityEngine {
    /// Engine-internal representation of a gate.
    type TransferMatrix;

    /// Number of slots, fixed at construction.
    fn capacity(&self) -> usize;

    /// Unnormalized weights `(w0, w1)` of measuring `slot` as 0 or 1.
    ///
    /// Non-destructive. The weights sum to the current trace, which drops
    /// below one after earlier projections.
    fn peak_measurement(&self, slot: SlotIndex) -> EngineResult<(f64, f64)>;

    /// Collapse `slot` onto `outcome` without renormalizing.
    ///
    /// Afterwards the slot is classical with value `outcome`.
    fn project_measurement(&mut self, slot: SlotIndex, outcome: bool) -> EngineResult<()>;

    /// Rescale the state to unit trace.
    fn renormalize(&mut self);

    /// Classical value of a slot that is not entangled.
    fn classical(&self, slot: SlotIndex) -> EngineResult<bool>;

    /// Overwrite the classical value of a slot that is not entangled.
    fn set_classical(&mut self, slot: SlotIndex, value: bool) -> EngineResult<()>;

    /// Convert a one-operand unitary to the engine's gate representation.
    fn single_transfer_matrix(&self, unitary: &Unitary2x2) -> Self::TransferMatrix;

    /// Convert a two-operand unitary to the engine's gate representation.
    ///
    /// Row/column index of `unitary` is `b_lsb + 2 * b_msb`, matching the
    /// operand order of [`DensityEngine::apply_two`].
    fn two_transfer_matrix(&self, unitary: &Unitary4x4) -> Self::TransferMatrix;

    /// Apply a one-operand gate.
    fn apply_single(&mut self, slot: SlotIndex, gate: &Self::TransferMatrix) -> EngineResult<()>;

    /// Apply a two-operand gate; `msb` is the high bit of the matrix index.
    fn apply_two(
        &mut self,
        msb: SlotIndex,
        lsb: SlotIndex,
        gate: &Self::TransferMatrix,
    ) -> EngineResult<()>;
}

/// Deferred engine construction.
///
/// Loading an engine can be expensive, so a session holds a factory and
/// only calls [`EngineFactory::create`] on first use.
pub trait EngineFactory {
    /// The engine this factory builds.
    type Engine: DensityEngine;

    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Build an engine with `capacity` slots.
    fn create(&self, capacity: usize) -> EngineResult<Self::Engine>;
}
