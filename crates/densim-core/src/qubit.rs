//! Logical qubits and their external references.

use densim_engine::SlotIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference the host uses to address a qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QubitRef(pub u64);

impl fmt::Display for QubitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

impl From<u64> for QubitRef {
    fn from(id: u64) -> Self {
        QubitRef(id)
    }
}

/// A logical qubit.
///
/// While `slot` is `None` the qubit is purely classical and `classical` is
/// its value. While it holds a slot the engine is authoritative and
/// `classical` is only refreshed when the qubit is evicted again.
#[derive(Debug, Clone, PartialEq)]
pub struct Qubit {
    reference: QubitRef,
    slot: Option<SlotIndex>,
    classical: bool,
    probability: f64,
}

impl Qubit {
    pub(crate) fn new(reference: QubitRef) -> Self {
        Self {
            reference,
            slot: None,
            classical: false,
            probability: 1.0,
        }
    }

    /// The host's reference.
    pub fn reference(&self) -> QubitRef {
        self.reference
    }

    /// The engine slot, if the qubit is resident.
    pub fn slot(&self) -> Option<SlotIndex> {
        self.slot
    }

    /// Whether the qubit currently occupies an engine slot.
    pub fn is_resident(&self) -> bool {
        self.slot.is_some()
    }

    /// Last known classical value.
    pub fn classical(&self) -> bool {
        self.classical
    }

    /// Probability of the most recent measurement outcome.
    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub(crate) fn set_slot(&mut self, slot: Option<SlotIndex>) {
        self.slot = slot;
    }

    pub(crate) fn set_classical(&mut self, value: bool) {
        self.classical = value;
    }

    pub(crate) fn set_probability(&mut self, probability: f64) {
        self.probability = probability;
    }
}
