//! Density-matrix engine interface for densim.
//!
//! The session layer treats the simulation engine as an opaque service with a
//! fixed number of slots. This crate defines that seam and ships a reference
//! implementation:
//!
//! - [`DensityEngine`]: measurement weights, projection, renormalization,
//!   classical overlay and gate application per slot
//! - [`EngineFactory`]: deferred construction, so loading can wait until the
//!   first request that needs the engine
//! - [`GateMatrix`], [`Unitary2x2`], [`Unitary4x4`]: gate payloads as the host
//!   delivers them
//! - [`SparseDensityMatrix`]: keeps untouched slots as classical bits and
//!   only expands entangled slots into a dense matrix
//!
//! # Example
//!
//! ```rust
//! use densim_engine::{DensityEngine, SlotIndex, SparseDensityMatrix, SparseEngineConfig, Unitary2x2};
//!
//! let mut engine = SparseDensityMatrix::new(8, &SparseEngineConfig::default());
//! let h = engine.single_transfer_matrix(&Unitary2x2::h());
//! engine.apply_single(SlotIndex(3), &h).unwrap();
//!
//! let (w0, w1) = engine.peak_measurement(SlotIndex(3)).unwrap();
//! assert!((w0 - 0.5).abs() < 1e-12 && (w1 - 0.5).abs() < 1e-12);
//! ```

pub mod engine;
pub mod error;
pub mod matrix;
pub mod ptm;
pub mod slot;
pub mod sparse;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{DensityEngine, EngineFactory};
pub use error::{EngineError, EngineResult};
pub use matrix::{GateMatrix, Unitary2x2, Unitary4x4};
pub use ptm::PauliTransferMatrix;
pub use slot::SlotIndex;
pub use sparse::{SparseDensityMatrix, SparseEngineConfig, SparseEngineFactory};
