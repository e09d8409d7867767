//! Lazy qubit-to-slot binding for a fixed-capacity density-matrix engine.
//!
//! The engine underneath a densim session cannot grow or shrink. Instead it
//! is created once with a fixed number of slots, and this crate decides
//! which logical qubit occupies which slot at any given time.
//!
//! # Overview
//!
//! Qubits are classical until a gate touches them. A classical qubit is just
//! a bit and costs the engine nothing. The first gate on a qubit claims a
//! free slot from the [`SlotPool`], seeds it with the qubit's bit and applies
//! the gate there. Measuring a resident qubit projects the engine state,
//! records the outcome and its probability, and hands the slot back.
//!
//! # Core Components
//!
//! - **Slot pool**: [`SlotPool`] partitions `0..capacity` into free and live
//!   slots
//! - **Qubits**: [`QubitRef`] addresses a [`Qubit`], which is either
//!   classical or bound to a slot
//! - **Measurement**: [`MeasurementMethod`] selects random, most probable or
//!   forced outcomes; [`Measurement`] carries the result
//! - **Session**: [`Session`] runs allocate, free, gate, measure and prepare
//!   requests against an engine built by an
//!   [`EngineFactory`](densim_engine::EngineFactory)
//!
//! # Example: Bell pair
//!
//! ```rust
//! use densim_core::{QubitRef, Session, SessionConfig};
//! use densim_engine::{GateMatrix, SparseEngineFactory, Unitary2x2, Unitary4x4};
//!
//! let mut session = Session::new(SessionConfig::seeded(16, 42), SparseEngineFactory::default())?;
//! let (a, b) = (QubitRef(1), QubitRef(2));
//! session.allocate(&[a, b])?;
//!
//! session.gate(&[a], &GateMatrix::Single(Unitary2x2::h()))?;
//! session.gate(&[a, b], &GateMatrix::Two(Unitary4x4::cx()))?;
//!
//! let m = session.measure(&[a, b])?;
//! assert_eq!(m[0].value, m[1].value);
//! assert_eq!(session.pool().num_live(), 0);
//! # Ok::<(), densim_core::SessionError>(())
//! ```

pub mod config;
pub mod error;
pub mod measurement;
pub mod pool;
pub mod qubit;
pub mod session;
pub mod table;

pub use config::SessionConfig;
pub use error::{ConfigError, SessionError, SessionResult};
pub use measurement::{Measurement, MeasurementMethod};
pub use pool::SlotPool;
pub use qubit::{Qubit, QubitRef};
pub use session::Session;
pub use table::QubitTable;

pub use densim_engine::{EngineFactory, GateMatrix, SlotIndex, Unitary2x2, Unitary4x4};
