//! A call-recording engine for tests.
//!
//! [`RecordingEngine`] keeps no quantum state. Measurement weights are
//! scripted per slot and every call is appended to a log, so tests can
//! assert exactly which engine operations a request triggered.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::engine::{DensityEngine, EngineFactory};
use crate::error::{EngineError, EngineResult};
use crate::matrix::{GateMatrix, Unitary2x2, Unitary4x4};
use crate::slot::SlotIndex;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `peak_measurement(slot)`.
    Peak(SlotIndex),
    /// `project_measurement(slot, outcome)`.
    Project(SlotIndex, bool),
    /// `renormalize()`.
    Renormalize,
    /// `set_classical(slot, value)`.
    SetClassical(SlotIndex, bool),
    /// `apply_single(slot, gate)`.
    ApplySingle(SlotIndex, GateMatrix),
    /// `apply_two(msb, lsb, gate)`.
    ApplyTwo(SlotIndex, SlotIndex, GateMatrix),
}

/// Engine double with scripted weights and a call log.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    capacity: usize,
    weights: BTreeMap<SlotIndex, (f64, f64)>,
    classical: BTreeMap<SlotIndex, bool>,
    calls: Vec<EngineCall>,
    peaks: Cell<usize>,
}

impl RecordingEngine {
    /// Create an engine with `capacity` slots. Unscripted slots report
    /// weights `(1.0, 0.0)`.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Script the weights `peak_measurement` reports for `slot`.
    pub fn set_weights(&mut self, slot: SlotIndex, w0: f64, w1: f64) {
        self.weights.insert(slot, (w0, w1));
    }

    /// Every mutating call so far, in order.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// Number of `peak_measurement` calls so far.
    pub fn peak_count(&self) -> usize {
        self.peaks.get()
    }

    /// Total number of calls, including peaks.
    pub fn call_count(&self) -> usize {
        self.calls.len() + self.peaks.get()
    }

    fn check(&self, slot: SlotIndex) -> EngineResult<()> {
        if slot.0 < self.capacity {
            Ok(())
        } else {
            Err(EngineError::SlotOutOfRange {
                slot,
                capacity: self.capacity,
            })
        }
    }
}

impl DensityEngine for RecordingEngine {
    type TransferMatrix = GateMatrix;

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn peak_measurement(&self, slot: SlotIndex) -> EngineResult<(f64, f64)> {
        self.check(slot)?;
        self.peaks.set(self.peaks.get() + 1);
        Ok(self.weights.get(&slot).copied().unwrap_or((1.0, 0.0)))
    }

    fn project_measurement(&mut self, slot: SlotIndex, outcome: bool) -> EngineResult<()> {
        self.check(slot)?;
        self.calls.push(EngineCall::Project(slot, outcome));
        self.classical.insert(slot, outcome);
        Ok(())
    }

    fn renormalize(&mut self) {
        self.calls.push(EngineCall::Renormalize);
    }

    fn classical(&self, slot: SlotIndex) -> EngineResult<bool> {
        self.check(slot)?;
        Ok(self.classical.get(&slot).copied().unwrap_or(false))
    }

    fn set_classical(&mut self, slot: SlotIndex, value: bool) -> EngineResult<()> {
        self.check(slot)?;
        self.calls.push(EngineCall::SetClassical(slot, value));
        self.classical.insert(slot, value);
        Ok(())
    }

    fn single_transfer_matrix(&self, unitary: &Unitary2x2) -> GateMatrix {
        GateMatrix::Single(*unitary)
    }

    fn two_transfer_matrix(&self, unitary: &Unitary4x4) -> GateMatrix {
        GateMatrix::Two(*unitary)
    }

    fn apply_single(&mut self, slot: SlotIndex, gate: &GateMatrix) -> EngineResult<()> {
        self.check(slot)?;
        self.calls.push(EngineCall::ApplySingle(slot, *gate));
        Ok(())
    }

    fn apply_two(&mut self, msb: SlotIndex, lsb: SlotIndex, gate: &GateMatrix) -> EngineResult<()> {
        self.check(msb)?;
        self.check(lsb)?;
        self.calls.push(EngineCall::ApplyTwo(msb, lsb, *gate));
        Ok(())
    }
}

/// Factory for [`RecordingEngine`]; can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    fail: Option<String>,
    loads: Cell<usize>,
}

impl RecordingFactory {
    /// A factory that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose `create` fails with `reason`.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            fail: Some(reason.into()),
            loads: Cell::new(0),
        }
    }

    /// How often `create` was called.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl EngineFactory for RecordingFactory {
    type Engine = RecordingEngine;

    fn name(&self) -> &str {
        "recording"
    }

    fn create(&self, capacity: usize) -> EngineResult<RecordingEngine> {
        self.loads.set(self.loads.get() + 1);
        match &self.fail {
            Some(reason) => Err(EngineError::Load(reason.clone())),
            None => Ok(RecordingEngine::new(capacity)),
        }
    }
}
