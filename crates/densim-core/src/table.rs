//! The qubit table: logical qubits plus the slot pool they draw from.
//!
//! Keeping both in one struct makes slot binding a single operation that
//! updates a qubit's slot and the pool's free/live partition together.
//! Nothing else in the crate touches either.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use densim_engine::SlotIndex;

use crate::error::{SessionError, SessionResult};
use crate::pool::SlotPool;
use crate::qubit::{Qubit, QubitRef};

/// Allocated qubits and the slot pool backing them.
#[derive(Debug, Clone)]
pub struct QubitTable {
    pool: SlotPool,
    qubits: FxHashMap<QubitRef, Qubit>,
}

impl QubitTable {
    /// Create an empty table over a pool of `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: SlotPool::new(capacity),
            qubits: FxHashMap::default(),
        }
    }

    /// The slot pool.
    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Number of allocated qubits.
    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    /// Whether no qubits are allocated.
    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }

    /// Whether `qubit` is allocated.
    pub fn contains(&self, qubit: QubitRef) -> bool {
        self.qubits.contains_key(&qubit)
    }

    /// Look up an allocated qubit.
    pub fn get(&self, qubit: QubitRef) -> SessionResult<&Qubit> {
        self.qubits
            .get(&qubit)
            .ok_or(SessionError::UnknownRef(qubit))
    }

    fn get_mut(&mut self, qubit: QubitRef) -> SessionResult<&mut Qubit> {
        self.qubits
            .get_mut(&qubit)
            .ok_or(SessionError::UnknownRef(qubit))
    }

    /// Iterate over all allocated qubits in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Qubit> {
        self.qubits.values()
    }

    /// Add a fresh classical-zero qubit.
    pub fn insert(&mut self, qubit: QubitRef) -> SessionResult<()> {
        if self.qubits.contains_key(&qubit) {
            return Err(SessionError::DuplicateRef(qubit));
        }
        self.qubits.insert(qubit, Qubit::new(qubit));
        Ok(())
    }

    /// Remove a qubit that no longer holds a slot.
    pub fn remove(&mut self, qubit: QubitRef) -> SessionResult<Qubit> {
        let removed = self
            .qubits
            .remove(&qubit)
            .ok_or(SessionError::UnknownRef(qubit))?;
        if let Some(slot) = removed.slot() {
            warn!("{} removed while holding {}; releasing it", qubit, slot);
            self.pool.release(slot);
        }
        Ok(removed)
    }

    /// Set the slot a qubit is bound to.
    ///
    /// Binding to the current slot is a no-op. A new slot moves from the
    /// pool's free set to its live set and any previously held slot goes
    /// back to the pool. Fails with [`SessionError::SlotUnavailable`] if the
    /// new slot is not free, leaving the qubit and pool untouched.
    pub fn bind(&mut self, qubit: QubitRef, slot: Option<SlotIndex>) -> SessionResult<()> {
        let unit = self
            .qubits
            .get_mut(&qubit)
            .ok_or(SessionError::UnknownRef(qubit))?;
        let old = unit.slot();
        if old == slot {
            return Ok(());
        }
        if let Some(new) = slot {
            self.pool.take(new)?;
        }
        if let Some(old) = old {
            self.pool.release(old);
        }
        unit.set_slot(slot);
        Ok(())
    }

    /// Give a classical qubit a slot. A resident qubit keeps its slot.
    pub fn promote(&mut self, qubit: QubitRef) -> SessionResult<SlotIndex> {
        if let Some(slot) = self.get(qubit)?.slot() {
            return Ok(slot);
        }
        let Some(slot) = self.pool.lowest_free() else {
            warn!(
                "cannot promote {}: all {} slots in use",
                qubit,
                self.pool.capacity()
            );
            return Err(SessionError::CapacityExhausted {
                capacity: self.pool.capacity(),
            });
        };
        self.bind(qubit, Some(slot))?;
        debug!("{} promoted to {}", qubit, slot);
        Ok(slot)
    }

    /// Record a measurement outcome and release the qubit's slot.
    pub fn evict(&mut self, qubit: QubitRef, value: bool, probability: f64) -> SessionResult<()> {
        let unit = self.get_mut(qubit)?;
        unit.set_classical(value);
        unit.set_probability(probability);
        self.bind(qubit, None)
    }

    /// Record a measurement of a qubit that holds no slot.
    pub fn record_classical(&mut self, qubit: QubitRef, probability: f64) -> SessionResult<()> {
        self.get_mut(qubit)?.set_probability(probability);
        Ok(())
    }

    /// Overwrite the classical value of a qubit.
    pub fn set_classical(&mut self, qubit: QubitRef, value: bool) -> SessionResult<()> {
        self.get_mut(qubit)?.set_classical(value);
        Ok(())
    }

    /// Whether the pool partition holds and no two qubits share a slot.
    pub fn check_invariants(&self) -> bool {
        let mut seen = FxHashSet::default();
        for slot in self.qubits.values().filter_map(Qubit::slot) {
            if !self.pool.is_live(slot) || !seen.insert(slot) {
                return false;
            }
        }
        self.pool.check_partition() && seen.len() == self.pool.num_live()
    }
}
