//! Host-facing adapter for densim.
//!
//! Wraps a [`densim_core::Session`] in the callback surface a simulation host
//! drives ([`HostBackend`]), parses per-qubit measurement methods from the
//! host's JSON argument payload, and loads configuration and log output
//! settings.
//!
//! # Example
//!
//! ```rust
//! use densim_core::QubitRef;
//! use densim_plugin::{HostBackend, PluginConfig, SessionBackend};
//! use num_complex::Complex64;
//! use serde_json::json;
//!
//! let config = PluginConfig::default();
//! let mut backend = SessionBackend::from_config(&config)?;
//! backend.initialize()?;
//! backend.allocate(&[QubitRef(1)])?;
//!
//! let one = Complex64::new(1.0, 0.0);
//! let zero = Complex64::new(0.0, 0.0);
//! backend.unitary_gate(&[QubitRef(1)], &[zero, one, one, zero])?;
//!
//! let z = [one, zero, zero, one];
//! let m = backend.measurement_gate(&[QubitRef(1)], &z, &json!({"method": "probable"}))?;
//! assert!(m[0].value);
//! # Ok::<(), densim_plugin::PluginError>(())
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod method;
pub mod tracing_config;

pub use backend::{HostBackend, PluginInfo, SessionBackend};
pub use config::PluginConfig;
pub use error::{PluginError, PluginResult};
pub use method::parse_methods;
pub use tracing_config::{TracingConfig, TracingFormat, init_default_tracing, init_tracing};
