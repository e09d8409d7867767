//! Reference sparse density-matrix engine.
//!
//! Every slot carries a classical bit. Only slots that a gate has touched are
//! expanded into the dense density matrix, and projecting a slot removes it
//! again. The dense part is an `ndarray` matrix over the entangled slots,
//! where dense position `k` is bit `k` of the row/column index.
//!
//! Memory grows as `4^n` in the number of entangled slots, so the dense part
//! is bounded by [`SparseEngineConfig::max_dense_qubits`].

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::engine::{DensityEngine, EngineFactory};
use crate::error::{EngineError, EngineResult};
use crate::matrix::{Unitary2x2, Unitary4x4};
use crate::ptm::PauliTransferMatrix;
use crate::slot::SlotIndex;

/// Settings for [`SparseDensityMatrix`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseEngineConfig {
    /// Maximum number of simultaneously entangled slots.
    #[serde(default = "default_max_dense_qubits")]
    pub max_dense_qubits: usize,
}

fn default_max_dense_qubits() -> usize {
    10
}

impl Default for SparseEngineConfig {
    fn default() -> Self {
        Self {
            max_dense_qubits: default_max_dense_qubits(),
        }
    }
}

/// Insert bit `value` at position `k` of `index`.
fn insert_bit(index: usize, k: usize, value: usize) -> usize {
    let low = index & ((1 << k) - 1);
    let high = (index >> k) << (k + 1);
    high | (value << k) | low
}

/// Density matrix over a fixed slot range, dense only where entangled.
#[derive(Debug, Clone)]
pub struct SparseDensityMatrix {
    classical: Vec<bool>,
    dense: Vec<SlotIndex>,
    dm: Array2<Complex64>,
    max_dense: usize,
}

impl SparseDensityMatrix {
    /// Create an engine with `capacity` slots, all classical 0.
    pub fn new(capacity: usize, config: &SparseEngineConfig) -> Self {
        Self {
            classical: vec![false; capacity],
            dense: Vec::new(),
            dm: Array2::from_elem((1, 1), Complex64::new(1.0, 0.0)),
            max_dense: config.max_dense_qubits,
        }
    }

    /// Current (unnormalized) trace.
    pub fn trace(&self) -> f64 {
        self.dm.diag().iter().map(|z| z.re).sum()
    }

    /// Number of slots in the dense part.
    pub fn num_dense(&self) -> usize {
        self.dense.len()
    }

    /// Whether `slot` is part of the dense state.
    pub fn is_dense(&self, slot: SlotIndex) -> bool {
        self.dense.contains(&slot)
    }

    fn check(&self, slot: SlotIndex) -> EngineResult<()> {
        if slot.0 < self.classical.len() {
            Ok(())
        } else {
            Err(EngineError::SlotOutOfRange {
                slot,
                capacity: self.classical.len(),
            })
        }
    }

    fn position(&self, slot: SlotIndex) -> Option<usize> {
        self.dense.iter().position(|&s| s == slot)
    }

    /// Make `slot` part of the dense state, returning its bit position.
    fn ensure_dense(&mut self, slot: SlotIndex) -> EngineResult<usize> {
        self.check(slot)?;
        if let Some(k) = self.position(slot) {
            return Ok(k);
        }
        if self.dense.len() >= self.max_dense {
            return Err(EngineError::DenseLimitExceeded {
                limit: self.max_dense,
            });
        }

        // Tensor in |b><b| as the new most-significant bit.
        let k = self.dense.len();
        let bit = usize::from(self.classical[slot.0]) << k;
        let dim = self.dm.nrows();
        let mut grown = Array2::zeros((dim * 2, dim * 2));
        for ((r, c), v) in self.dm.indexed_iter() {
            grown[(r | bit, c | bit)] = *v;
        }
        self.dm = grown;
        self.dense.push(slot);

        debug!("slot {} entered dense state at bit {}", slot, k);
        Ok(k)
    }

    /// Apply `ptm` to every `block x block` sub-matrix spanned by `bits`.
    ///
    /// `bits[0]` is the most-significant operand of the block index.
    fn apply_blocks(&mut self, bits: &[usize], ptm: &PauliTransferMatrix) {
        let mask = bits.iter().fold(0usize, |m, &k| m | (1 << k));
        let block = 1 << bits.len();
        let spread = |base: usize, m: usize| {
            bits.iter().enumerate().fold(base, |idx, (i, &k)| {
                let shift = bits.len() - 1 - i;
                idx | (((m >> shift) & 1) << k)
            })
        };

        let dim = self.dm.nrows();
        for r in (0..dim).filter(|r| r & mask == 0) {
            for c in (0..dim).filter(|c| c & mask == 0) {
                let sub = Array2::from_shape_fn((block, block), |(i, j)| {
                    self.dm[(spread(r, i), spread(c, j))]
                });
                let out = ptm.apply_block(&sub);
                for ((i, j), v) in out.indexed_iter() {
                    self.dm[(spread(r, i), spread(c, j))] = *v;
                }
            }
        }
    }
}

impl DensityEngine for SparseDensityMatrix {
    type TransferMatrix = PauliTransferMatrix;

    fn capacity(&self) -> usize {
        self.classical.len()
    }

    fn peak_measurement(&self, slot: SlotIndex) -> EngineResult<(f64, f64)> {
        self.check(slot)?;
        match self.position(slot) {
            Some(k) => {
                let mut weights = (0.0, 0.0);
                for (i, z) in self.dm.diag().iter().enumerate() {
                    if (i >> k) & 1 == 0 {
                        weights.0 += z.re;
                    } else {
                        weights.1 += z.re;
                    }
                }
                Ok(weights)
            }
            None => {
                let trace = self.trace();
                if self.classical[slot.0] {
                    Ok((0.0, trace))
                } else {
                    Ok((trace, 0.0))
                }
            }
        }
    }

    fn project_measurement(&mut self, slot: SlotIndex, outcome: bool) -> EngineResult<()> {
        self.check(slot)?;
        let Some(k) = self.position(slot) else {
            if self.classical[slot.0] != outcome {
                return Err(EngineError::InconsistentProjection {
                    slot,
                    outcome: u8::from(outcome),
                });
            }
            return Ok(());
        };

        let value = usize::from(outcome);
        let dim = self.dm.nrows() / 2;
        let shrunk = Array2::from_shape_fn((dim, dim), |(r, c)| {
            self.dm[(insert_bit(r, k, value), insert_bit(c, k, value))]
        });
        self.dm = shrunk;
        self.dense.remove(k);
        self.classical[slot.0] = outcome;

        debug!("slot {} projected to {}, left dense state", slot, value);
        Ok(())
    }

    fn renormalize(&mut self) {
        let trace = self.trace();
        if trace > 0.0 {
            self.dm.mapv_inplace(|z| z / trace);
        } else {
            warn!("cannot renormalize density matrix with trace {}", trace);
        }
    }

    fn classical(&self, slot: SlotIndex) -> EngineResult<bool> {
        self.check(slot)?;
        if self.is_dense(slot) {
            return Err(EngineError::SlotEntangled(slot));
        }
        Ok(self.classical[slot.0])
    }

    fn set_classical(&mut self, slot: SlotIndex, value: bool) -> EngineResult<()> {
        self.check(slot)?;
        if self.is_dense(slot) {
            return Err(EngineError::SlotEntangled(slot));
        }
        self.classical[slot.0] = value;
        Ok(())
    }

    fn single_transfer_matrix(&self, unitary: &Unitary2x2) -> PauliTransferMatrix {
        PauliTransferMatrix::from_single(unitary)
    }

    fn two_transfer_matrix(&self, unitary: &Unitary4x4) -> PauliTransferMatrix {
        PauliTransferMatrix::from_two(unitary)
    }

    fn apply_single(&mut self, slot: SlotIndex, gate: &PauliTransferMatrix) -> EngineResult<()> {
        if gate.arity() != 1 {
            return Err(EngineError::ArityMismatch {
                expected: gate.arity(),
                actual: 1,
            });
        }
        let k = self.ensure_dense(slot)?;
        self.apply_blocks(&[k], gate);
        Ok(())
    }

    fn apply_two(
        &mut self,
        msb: SlotIndex,
        lsb: SlotIndex,
        gate: &PauliTransferMatrix,
    ) -> EngineResult<()> {
        if gate.arity() != 2 {
            return Err(EngineError::ArityMismatch {
                expected: gate.arity(),
                actual: 2,
            });
        }
        if msb == lsb {
            return Err(EngineError::DuplicateOperand(msb));
        }
        let k_msb = self.ensure_dense(msb)?;
        let k_lsb = self.ensure_dense(lsb)?;
        self.apply_blocks(&[k_msb, k_lsb], gate);
        Ok(())
    }
}

/// Deferred construction of [`SparseDensityMatrix`].
#[derive(Debug, Clone, Default)]
pub struct SparseEngineFactory {
    config: SparseEngineConfig,
}

impl SparseEngineFactory {
    /// Create a factory with the given settings.
    pub fn new(config: SparseEngineConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for SparseEngineFactory {
    type Engine = SparseDensityMatrix;

    fn name(&self) -> &str {
        "sparse-dm"
    }

    fn create(&self, capacity: usize) -> EngineResult<SparseDensityMatrix> {
        if capacity == 0 {
            return Err(EngineError::Load("capacity must be at least 1".into()));
        }
        if self.config.max_dense_qubits == 0 {
            return Err(EngineError::Load(
                "max_dense_qubits must be at least 1".into(),
            ));
        }
        info!(
            "sparse density-matrix engine ready: {} slots, up to {} entangled",
            capacity, self.config.max_dense_qubits
        );
        Ok(SparseDensityMatrix::new(capacity, &self.config))
    }
}
