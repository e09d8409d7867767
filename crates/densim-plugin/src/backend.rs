//! The host-facing backend.
//!
//! The host drives a backend through a fixed set of callbacks, one request at
//! a time:
//!
//! ```text
//!   initialize() ──→ allocate() ──→ unitary_gate() ──→ measurement_gate() ──→ free()
//!                                   prepare_gate()
//! ```
//!
//! | Callback | Returns |
//! |----------|---------|
//! | `info()` | `&PluginInfo` |
//! | `initialize()` | `PluginResult<()>` |
//! | `allocate()` | `PluginResult<()>` |
//! | `free()` | `PluginResult<()>` |
//! | `unitary_gate()` | `PluginResult<()>` |
//! | `measurement_gate()` | `PluginResult<Vec<Measurement>>` |
//! | `prepare_gate()` | `PluginResult<()>` |

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument};

use densim_core::{EngineFactory, Measurement, QubitRef, Session, SessionError, Unitary2x2};
use densim_engine::SparseEngineFactory;

use crate::config::PluginConfig;
use crate::error::PluginResult;
use crate::method::parse_methods;

/// Metadata the backend reports to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name.
    pub name: String,
    /// Plugin author.
    pub author: String,
    /// Plugin version.
    pub version: String,
}

impl PluginInfo {
    /// Create plugin metadata.
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.into(),
            version: version.into(),
        }
    }
}

impl Default for PluginInfo {
    fn default() -> Self {
        Self::new(
            "densim density-matrix backend",
            "densim contributors",
            env!("CARGO_PKG_VERSION"),
        )
    }
}

/// Callbacks a host invokes on a simulation backend.
///
/// Calls are synchronous and never overlap. Gate and basis matrices arrive
/// as flat row-major element lists.
pub trait HostBackend {
    /// Plugin metadata.
    fn info(&self) -> &PluginInfo;

    /// Called once before any other request.
    fn initialize(&mut self) -> PluginResult<()>;

    /// Allocate qubits in the |0> state.
    fn allocate(&mut self, refs: &[QubitRef]) -> PluginResult<()>;

    /// Free qubits.
    fn free(&mut self, refs: &[QubitRef]) -> PluginResult<()>;

    /// Apply a unitary to one or two qubits.
    fn unitary_gate(&mut self, refs: &[QubitRef], matrix: &[Complex64]) -> PluginResult<()>;

    /// Measure qubits in the basis given by a 2x2 matrix.
    fn measurement_gate(
        &mut self,
        refs: &[QubitRef],
        basis: &[Complex64],
        arb: &Value,
    ) -> PluginResult<Vec<Measurement>>;

    /// Reset qubits to the state the 2x2 basis matrix maps |0> to.
    fn prepare_gate(
        &mut self,
        refs: &[QubitRef],
        basis: &[Complex64],
        arb: &Value,
    ) -> PluginResult<()>;
}

/// [`HostBackend`] over a [`Session`].
#[derive(Debug)]
pub struct SessionBackend<F: EngineFactory> {
    info: PluginInfo,
    session: Session<F>,
}

impl<F: EngineFactory> SessionBackend<F> {
    /// Wrap an existing session.
    pub fn new(session: Session<F>) -> Self {
        Self {
            info: PluginInfo::default(),
            session,
        }
    }

    /// Replace the reported metadata.
    pub fn with_info(mut self, info: PluginInfo) -> Self {
        self.info = info;
        self
    }

    /// The underlying session.
    pub fn session(&self) -> &Session<F> {
        &self.session
    }

    /// Mutable access to the underlying session.
    pub fn session_mut(&mut self) -> &mut Session<F> {
        &mut self.session
    }
}

impl SessionBackend<SparseEngineFactory> {
    /// Build a backend on the sparse reference engine.
    pub fn from_config(config: &PluginConfig) -> PluginResult<Self> {
        config.validate()?;
        let factory = SparseEngineFactory::new(config.engine.clone());
        let session = Session::new(config.session.clone(), factory)?;
        Ok(Self::new(session))
    }
}

fn basis_matrix(basis: &[Complex64]) -> PluginResult<Unitary2x2> {
    if basis.len() != 4 {
        return Err(SessionError::MatrixSize {
            expected: 4,
            actual: basis.len(),
        }
        .into());
    }
    Ok(Unitary2x2::from_slice(basis).map_err(SessionError::from)?)
}

impl<F: EngineFactory> HostBackend for SessionBackend<F> {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn initialize(&mut self) -> PluginResult<()> {
        debug!("Trying to load {} engine...", self.session.factory().name());
        self.session.initialize()?;
        info!(
            "{} {} ready with {} slots",
            self.info.name,
            self.info.version,
            self.session.pool().capacity()
        );
        Ok(())
    }

    fn allocate(&mut self, refs: &[QubitRef]) -> PluginResult<()> {
        Ok(self.session.allocate(refs)?)
    }

    fn free(&mut self, refs: &[QubitRef]) -> PluginResult<()> {
        Ok(self.session.free(refs)?)
    }

    fn unitary_gate(&mut self, refs: &[QubitRef], matrix: &[Complex64]) -> PluginResult<()> {
        Ok(self.session.unitary_gate(refs, matrix)?)
    }

    #[instrument(skip(self, basis))]
    fn measurement_gate(
        &mut self,
        refs: &[QubitRef],
        basis: &[Complex64],
        arb: &Value,
    ) -> PluginResult<Vec<Measurement>> {
        let methods = parse_methods(arb, refs.len())?;
        let basis = basis_matrix(basis)?;
        Ok(self.session.measure_in_basis(refs, &basis, &methods)?)
    }

    fn prepare_gate(
        &mut self,
        refs: &[QubitRef],
        basis: &[Complex64],
        _arb: &Value,
    ) -> PluginResult<()> {
        let basis = basis_matrix(basis)?;
        Ok(self.session.prepare(refs, &basis)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PluginError;
    use densim_core::SessionConfig;
    use densim_engine::testing::RecordingFactory;
    use serde_json::json;

    fn backend() -> SessionBackend<RecordingFactory> {
        let session =
            Session::new(SessionConfig::seeded(4, 0), RecordingFactory::new()).unwrap();
        SessionBackend::new(session)
    }

    fn z_basis() -> Vec<Complex64> {
        vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        ]
    }

    #[test]
    fn test_info() {
        let b = backend().with_info(PluginInfo::new("test", "me", "1.0"));
        assert_eq!(b.info().name, "test");
        assert_eq!(PluginInfo::default().version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_initialize_loads_engine() {
        let mut b = backend();
        b.initialize().unwrap();
        assert!(b.session().is_initialized());
        assert_eq!(b.session().factory().load_count(), 1);
    }

    #[test]
    fn test_measurement_gate_parses_methods() {
        let mut b = backend();
        b.allocate(&[QubitRef(1), QubitRef(2)]).unwrap();

        let m = b
            .measurement_gate(&[QubitRef(1), QubitRef(2)], &z_basis(), &json!({"method": 0}))
            .unwrap();
        assert_eq!(m.len(), 2);
        assert!(m.iter().all(|m| !m.value && m.probability == 1.0));

        let err = b
            .measurement_gate(&[QubitRef(1)], &z_basis(), &json!({"method": 1}))
            .unwrap_err();
        assert!(matches!(
            err,
            PluginError::Session(SessionError::InfeasibleProjection { .. })
        ));
    }

    #[test]
    fn test_bad_basis_size() {
        let mut b = backend();
        b.allocate(&[QubitRef(1)]).unwrap();
        assert!(matches!(
            b.prepare_gate(&[QubitRef(1)], &z_basis()[..3], &Value::Null),
            Err(PluginError::Session(SessionError::MatrixSize {
                expected: 4,
                actual: 3
            }))
        ));
    }

    #[test]
    fn test_session_errors_pass_through() {
        let mut b = backend();
        b.allocate(&[QubitRef(1)]).unwrap();
        assert!(matches!(
            b.allocate(&[QubitRef(1)]),
            Err(PluginError::Session(SessionError::DuplicateRef(_)))
        ));
        assert!(matches!(
            b.measurement_gate(&[QubitRef(1)], &z_basis(), &json!({"method": "sometimes"})),
            Err(PluginError::InvalidMethod(_))
        ));
    }
}
