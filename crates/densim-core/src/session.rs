//! The session controller.
//!
//! A [`Session`] owns the qubit table, the slot pool and the engine, and
//! runs every host request to completion before the next one. Qubits start
//! out classical and only claim an engine slot when a gate touches them;
//! measuring a resident qubit projects it and hands the slot back.
//!
//! Requests touching several qubits process them in the order given. The
//! random stream is drawn once per resident qubit measured with
//! [`MeasurementMethod::Random`], in that same order, so a seeded session
//! replays identically. Requests are fail-fast: when one qubit fails, the
//! qubits before it keep their new state.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, instrument};

use densim_engine::{
    DensityEngine, EngineError, EngineFactory, GateMatrix, SlotIndex, Unitary2x2,
};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::measurement::{Measurement, MeasurementMethod};
use crate::pool::SlotPool;
use crate::qubit::{Qubit, QubitRef};
use crate::table::QubitTable;

/// Lifecycle of the engine owned by a session.
#[derive(Debug)]
enum EngineState<E> {
    Unloaded,
    Ready(E),
    Failed(String),
}

/// Load the engine on first use and hand out a reference to it.
///
/// A failed load is remembered; every later call reports the engine as
/// unavailable without retrying.
fn load_engine<'a, F: EngineFactory>(
    state: &'a mut EngineState<F::Engine>,
    factory: &F,
    capacity: usize,
) -> SessionResult<&'a mut F::Engine> {
    if let EngineState::Unloaded = state {
        debug!("Loading {} engine with {} slots", factory.name(), capacity);
        let loaded = factory
            .create(capacity)
            .map_err(|e| match e {
                EngineError::Load(reason) => reason,
                other => other.to_string(),
            })
            .and_then(|engine| {
                if engine.capacity() < capacity {
                    Err(format!(
                        "engine provides {} slots, session needs {}",
                        engine.capacity(),
                        capacity
                    ))
                } else {
                    Ok(engine)
                }
            });
        match loaded {
            Ok(engine) => {
                info!("{} engine loaded with {} slots", factory.name(), capacity);
                *state = EngineState::Ready(engine);
            }
            Err(reason) => {
                error!("Failed to load {} engine: {}", factory.name(), reason);
                *state = EngineState::Failed(reason.clone());
                return Err(SessionError::EngineLoad(reason));
            }
        }
    }

    match state {
        EngineState::Ready(engine) => Ok(engine),
        EngineState::Failed(reason) => Err(SessionError::EngineUnavailable(reason.clone())),
        EngineState::Unloaded => Err(SessionError::EngineUnavailable(
            "engine was not loaded".to_string(),
        )),
    }
}

/// A simulation session over one engine.
pub struct Session<F: EngineFactory> {
    config: SessionConfig,
    factory: F,
    engine: EngineState<F::Engine>,
    table: QubitTable,
    rng: StdRng,
}

impl<F: EngineFactory> Session<F> {
    /// Create a session. The engine is not loaded until it is needed.
    pub fn new(config: SessionConfig, factory: F) -> SessionResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            table: QubitTable::new(config.capacity),
            config,
            factory,
            engine: EngineState::Unloaded,
            rng,
        })
    }

    /// Load the engine now instead of on first use.
    ///
    /// Idempotent once the engine is loaded. A failed load is fatal: it
    /// returns [`SessionError::EngineLoad`] and every later request that
    /// needs the engine returns [`SessionError::EngineUnavailable`].
    pub fn initialize(&mut self) -> SessionResult<()> {
        load_engine(&mut self.engine, &self.factory, self.config.capacity).map(|_| ())
    }

    /// Whether the engine has been loaded successfully.
    pub fn is_initialized(&self) -> bool {
        matches!(self.engine, EngineState::Ready(_))
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The engine factory.
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// The engine, if it has been loaded.
    pub fn engine(&self) -> Option<&F::Engine> {
        match &self.engine {
            EngineState::Ready(engine) => Some(engine),
            _ => None,
        }
    }

    /// Mutable access to the engine, if it has been loaded.
    pub fn engine_mut(&mut self) -> Option<&mut F::Engine> {
        match &mut self.engine {
            EngineState::Ready(engine) => Some(engine),
            _ => None,
        }
    }

    /// The slot pool.
    pub fn pool(&self) -> &SlotPool {
        self.table.pool()
    }

    /// Look up an allocated qubit.
    pub fn qubit(&self, qubit: QubitRef) -> Option<&Qubit> {
        self.table.get(qubit).ok()
    }

    /// Number of allocated qubits.
    pub fn num_qubits(&self) -> usize {
        self.table.len()
    }

    /// Whether the pool partition and slot exclusivity hold.
    pub fn check_invariants(&self) -> bool {
        self.table.check_invariants()
    }

    /// Allocate fresh qubits in the classical zero state.
    #[instrument(skip(self))]
    pub fn allocate(&mut self, refs: &[QubitRef]) -> SessionResult<()> {
        for &qubit in refs {
            self.table.insert(qubit)?;
        }
        debug!("{} qubits allocated", self.table.len());
        Ok(())
    }

    /// Free qubits, measuring resident ones first so their slots return to
    /// the pool.
    #[instrument(skip(self))]
    pub fn free(&mut self, refs: &[QubitRef]) -> SessionResult<()> {
        for &qubit in refs {
            self.measure_one(qubit, MeasurementMethod::Random)?;
            self.table.remove(qubit)?;
        }
        Ok(())
    }

    /// Measure qubits in the Z basis with random outcomes.
    pub fn measure(&mut self, refs: &[QubitRef]) -> SessionResult<Vec<Measurement>> {
        let methods = vec![MeasurementMethod::Random; refs.len()];
        self.measure_with(refs, &methods)
    }

    /// Measure qubits in the Z basis, one method per qubit.
    #[instrument(skip(self))]
    pub fn measure_with(
        &mut self,
        refs: &[QubitRef],
        methods: &[MeasurementMethod],
    ) -> SessionResult<Vec<Measurement>> {
        check_method_count(refs, methods)?;
        refs.iter()
            .zip(methods)
            .map(|(&qubit, &method)| self.measure_one(qubit, method))
            .collect()
    }

    /// Measure qubits in the basis `basis` maps the Z basis to.
    ///
    /// Each qubit is rotated by `basis†`, measured, and rotated back by
    /// `basis`. An identity basis skips both rotations.
    #[instrument(skip(self))]
    pub fn measure_in_basis(
        &mut self,
        refs: &[QubitRef],
        basis: &Unitary2x2,
        methods: &[MeasurementMethod],
    ) -> SessionResult<Vec<Measurement>> {
        check_method_count(refs, methods)?;
        let rotate = !basis.is_identity();
        let inverse = GateMatrix::Single(basis.dagger());
        let forward = GateMatrix::Single(*basis);

        let mut measurements = Vec::with_capacity(refs.len());
        for (&qubit, &method) in refs.iter().zip(methods) {
            if rotate {
                self.gate(&[qubit], &inverse)?;
            }
            measurements.push(self.measure_one(qubit, method)?);
            if rotate {
                self.gate(&[qubit], &forward)?;
            }
        }
        Ok(measurements)
    }

    /// Reset qubits to |0> and then apply `basis` to each.
    #[instrument(skip(self))]
    pub fn prepare(&mut self, refs: &[QubitRef], basis: &Unitary2x2) -> SessionResult<()> {
        let rotate = !basis.is_identity();
        let forward = GateMatrix::Single(*basis);
        for &qubit in refs {
            self.prep(qubit)?;
            if rotate {
                self.gate(&[qubit], &forward)?;
            }
        }
        Ok(())
    }

    /// Reset a qubit to the classical zero state.
    pub fn prep(&mut self, qubit: QubitRef) -> SessionResult<()> {
        self.measure_one(qubit, MeasurementMethod::Random)?;
        self.table.set_classical(qubit, false)
    }

    /// Apply a gate given as a flat row-major matrix.
    ///
    /// Four elements for one operand, sixteen for two. For two operands
    /// the first reference is the least significant bit of the matrix
    /// index.
    #[instrument(skip(self, elements))]
    pub fn unitary_gate(&mut self, refs: &[QubitRef], elements: &[Complex64]) -> SessionResult<()> {
        let expected = match refs.len() {
            1 => 4,
            2 => 16,
            n => return Err(SessionError::UnsupportedArity(n)),
        };
        if elements.len() != expected {
            return Err(SessionError::MatrixSize {
                expected,
                actual: elements.len(),
            });
        }
        let gate = GateMatrix::from_elements(elements)?;
        self.gate(refs, &gate)
    }

    /// Apply a gate, promoting its operands into the engine first.
    pub fn gate(&mut self, refs: &[QubitRef], gate: &GateMatrix) -> SessionResult<()> {
        match (refs, gate) {
            (&[qubit], GateMatrix::Single(unitary)) => {
                let slot = self.ensure_resident(qubit)?;
                let engine = load_engine(&mut self.engine, &self.factory, self.config.capacity)?;
                debug!("Single-qubit gate on {} ({}): {:?}", qubit, slot, unitary);
                let tm = engine.single_transfer_matrix(unitary);
                engine.apply_single(slot, &tm)?;
                Ok(())
            }
            (&[a, b], GateMatrix::Two(unitary)) => {
                if a == b {
                    return Err(SessionError::RepeatedOperand(a));
                }
                let slot_a = self.ensure_resident(a)?;
                let slot_b = self.ensure_resident(b)?;
                let engine = load_engine(&mut self.engine, &self.factory, self.config.capacity)?;
                debug!(
                    "Two-qubit gate on {} ({}), {} ({}): {:?}",
                    a, slot_a, b, slot_b, unitary
                );
                let tm = engine.two_transfer_matrix(unitary);
                engine.apply_two(slot_b, slot_a, &tm)?;
                Ok(())
            }
            (&[_] | &[_, _], _) => Err(SessionError::MatrixSize {
                expected: 4usize.pow(refs.len() as u32),
                actual: gate.elements().len(),
            }),
            _ => Err(SessionError::UnsupportedArity(refs.len())),
        }
    }

    /// Make sure `qubit` holds an engine slot and return it.
    ///
    /// A freshly claimed slot is seeded with the qubit's classical value so
    /// nothing leaks over from the slot's previous occupant.
    fn ensure_resident(&mut self, qubit: QubitRef) -> SessionResult<SlotIndex> {
        let unit = self.table.get(qubit)?;
        if let Some(slot) = unit.slot() {
            return Ok(slot);
        }
        let value = unit.classical();

        let engine = load_engine(&mut self.engine, &self.factory, self.config.capacity)?;
        let slot = self.table.promote(qubit)?;
        if let Err(e) = engine.set_classical(slot, value) {
            self.table.bind(qubit, None)?;
            return Err(e.into());
        }
        Ok(slot)
    }

    /// Measure one qubit, evicting it from the engine if it is resident.
    fn measure_one(
        &mut self,
        qubit: QubitRef,
        method: MeasurementMethod,
    ) -> SessionResult<Measurement> {
        let unit = self.table.get(qubit)?;
        let Some(slot) = unit.slot() else {
            let value = unit.classical();
            return self.measure_classical(qubit, value, method);
        };

        let engine = load_engine(&mut self.engine, &self.factory, self.config.capacity)?;
        let (w0, w1) = engine.peak_measurement(slot)?;
        let mut trace = w0 + w1;
        if !(trace.is_finite() && trace > 0.0) {
            return Err(SessionError::InfeasibleProjection {
                qubit,
                target: method.forced_value().map_or(0, u8::from),
                reason: format!("state at {} has trace {}", slot, trace),
            });
        }
        let p0 = w0 / trace;
        let p1 = w1 / trace;

        let rng = &mut self.rng;
        let value = method
            .select(p0, p1, self.config.projection_epsilon, || rng.r#gen::<f64>())
            .ok_or_else(|| {
                let target = method.forced_value().unwrap_or_default();
                SessionError::InfeasibleProjection {
                    qubit,
                    target: u8::from(target),
                    reason: format!(
                        "outcome has probability {:e}",
                        if target { p1 } else { p0 }
                    ),
                }
            })?;

        engine.project_measurement(slot, value)?;
        let probability = if value { p1 } else { p0 };

        trace *= probability;
        if trace < self.config.renormalize_threshold {
            debug!("Renormalizing state, trace was {:e}", trace);
            engine.renormalize();
        }

        self.table.evict(qubit, value, probability)?;
        debug!(
            "{} measured as {} with p = {}, {} released",
            qubit,
            u8::from(value),
            probability,
            slot
        );
        Ok(Measurement::new(qubit, value, probability))
    }

    /// Measure a qubit that holds no slot. Never touches the engine.
    fn measure_classical(
        &mut self,
        qubit: QubitRef,
        value: bool,
        method: MeasurementMethod,
    ) -> SessionResult<Measurement> {
        if let Some(target) = method.forced_value() {
            if target != value {
                return Err(SessionError::InfeasibleProjection {
                    qubit,
                    target: u8::from(target),
                    reason: format!("qubit state was classical {}", u8::from(value)),
                });
            }
        }
        self.table.record_classical(qubit, 1.0)?;
        Ok(Measurement::new(qubit, value, 1.0))
    }
}

fn check_method_count(refs: &[QubitRef], methods: &[MeasurementMethod]) -> SessionResult<()> {
    if refs.len() == methods.len() {
        Ok(())
    } else {
        Err(SessionError::MethodCount {
            expected: refs.len(),
            actual: methods.len(),
        })
    }
}

impl<F: EngineFactory> std::fmt::Debug for Session<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("engine", &self.factory.name())
            .field("initialized", &self.is_initialized())
            .field("qubits", &self.table.len())
            .field("live_slots", &self.table.pool().num_live())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use densim_engine::testing::{EngineCall, RecordingFactory};
    use densim_engine::{SparseEngineFactory, Unitary4x4};

    fn session(capacity: usize) -> Session<RecordingFactory> {
        Session::new(SessionConfig::seeded(capacity, 7), RecordingFactory::new()).unwrap()
    }

    #[test]
    fn test_allocate_does_not_load_engine() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1), QubitRef(2)]).unwrap();
        assert_eq!(s.num_qubits(), 2);
        assert!(!s.is_initialized());
        assert_eq!(s.factory().load_count(), 0);
    }

    #[test]
    fn test_duplicate_allocation() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1)]).unwrap();
        assert!(matches!(
            s.allocate(&[QubitRef(1)]),
            Err(SessionError::DuplicateRef(QubitRef(1)))
        ));
    }

    #[test]
    fn test_gate_promotes_and_seeds_classical_bit() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1)]).unwrap();
        s.gate(&[QubitRef(1)], &GateMatrix::Single(Unitary2x2::x()))
            .unwrap();

        let slot = s.qubit(QubitRef(1)).unwrap().slot().unwrap();
        let calls = s.engine().unwrap().calls();
        assert_eq!(calls[0], EngineCall::SetClassical(slot, false));
        assert_eq!(
            calls[1],
            EngineCall::ApplySingle(slot, GateMatrix::Single(Unitary2x2::x()))
        );
        assert!(s.check_invariants());
    }

    #[test]
    fn test_two_qubit_gate_operand_order() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1), QubitRef(2)]).unwrap();
        s.gate(&[QubitRef(1), QubitRef(2)], &GateMatrix::Two(Unitary4x4::cx()))
            .unwrap();

        let a = s.qubit(QubitRef(1)).unwrap().slot().unwrap();
        let b = s.qubit(QubitRef(2)).unwrap().slot().unwrap();
        assert_ne!(a, b);
        let last = s.engine().unwrap().calls().last().cloned();
        assert_eq!(
            last,
            Some(EngineCall::ApplyTwo(b, a, GateMatrix::Two(Unitary4x4::cx())))
        );
    }

    #[test]
    fn test_gate_shape_errors() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1), QubitRef(2), QubitRef(3)]).unwrap();

        assert!(matches!(
            s.gate(
                &[QubitRef(1), QubitRef(2), QubitRef(3)],
                &GateMatrix::Single(Unitary2x2::x())
            ),
            Err(SessionError::UnsupportedArity(3))
        ));
        assert!(matches!(
            s.gate(&[QubitRef(1)], &GateMatrix::Two(Unitary4x4::cx())),
            Err(SessionError::MatrixSize {
                expected: 4,
                actual: 16
            })
        ));
        assert!(matches!(
            s.gate(&[QubitRef(1), QubitRef(1)], &GateMatrix::Two(Unitary4x4::cx())),
            Err(SessionError::RepeatedOperand(QubitRef(1)))
        ));
        assert!(matches!(
            s.unitary_gate(&[], &[]),
            Err(SessionError::UnsupportedArity(0))
        ));
        assert!(matches!(
            s.unitary_gate(&[QubitRef(1)], &[Complex64::new(1.0, 0.0); 3]),
            Err(SessionError::MatrixSize {
                expected: 4,
                actual: 3
            })
        ));
        assert!(!s.is_initialized());
    }

    #[test]
    fn test_measure_method_count() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1)]).unwrap();
        assert!(matches!(
            s.measure_with(&[QubitRef(1)], &[]),
            Err(SessionError::MethodCount {
                expected: 1,
                actual: 0
            })
        ));
    }

    #[test]
    fn test_prep_resets_classical_one() {
        let mut s = session(4);
        s.allocate(&[QubitRef(1)]).unwrap();
        s.table.set_classical(QubitRef(1), true).unwrap();

        s.prep(QubitRef(1)).unwrap();
        let q = s.qubit(QubitRef(1)).unwrap();
        assert!(!q.classical());
        assert!(!q.is_resident());
        assert_eq!(s.factory().load_count(), 0);
    }

    #[test]
    fn test_sparse_engine_x_then_measure() {
        let mut s = Session::new(
            SessionConfig::seeded(8, 1),
            SparseEngineFactory::default(),
        )
        .unwrap();
        s.allocate(&[QubitRef(10)]).unwrap();
        s.gate(&[QubitRef(10)], &GateMatrix::Single(Unitary2x2::x()))
            .unwrap();
        let m = s.measure(&[QubitRef(10)]).unwrap();
        assert!(m[0].value);
        assert!((m[0].probability - 1.0).abs() < 1e-12);
        assert_eq!(s.pool().num_live(), 0);
    }
}
