//! Gate matrices as delivered by the host.
//!
//! Matrices are row-major. For two-operand gates the first operand is the
//! least-significant bit of the row/column index, so `index = b0 + 2 * b1`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Tolerance for floating point comparisons.
const EPSILON: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// A 2x2 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unitary2x2 {
    /// The matrix elements in row-major order: [[a, b], [c, d]].
    pub data: [Complex64; 4],
}

impl Unitary2x2 {
    /// Create a new 2x2 matrix.
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self { data: [a, b, c, d] }
    }

    /// Create the identity matrix.
    pub fn identity() -> Self {
        Self::new(ONE, ZERO, ZERO, ONE)
    }

    /// Create a Hadamard matrix.
    pub fn h() -> Self {
        let s = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Self::new(s, s, s, -s)
    }

    /// Create a Pauli-X matrix.
    pub fn x() -> Self {
        Self::new(ZERO, ONE, ONE, ZERO)
    }

    /// Create a Pauli-Y matrix.
    pub fn y() -> Self {
        Self::new(ZERO, Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0), ZERO)
    }

    /// Create a Pauli-Z matrix.
    pub fn z() -> Self {
        Self::new(ONE, ZERO, ZERO, -ONE)
    }

    /// Create an S gate (sqrt(Z)).
    pub fn s() -> Self {
        Self::new(ONE, ZERO, ZERO, Complex64::new(0.0, 1.0))
    }

    /// Create an RX rotation matrix.
    pub fn rx(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(0.0, -s),
            Complex64::new(0.0, -s),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RY rotation matrix.
    pub fn ry(theta: f64) -> Self {
        let c = (theta / 2.0).cos();
        let s = (theta / 2.0).sin();
        Self::new(
            Complex64::new(c, 0.0),
            Complex64::new(-s, 0.0),
            Complex64::new(s, 0.0),
            Complex64::new(c, 0.0),
        )
    }

    /// Create an RZ rotation matrix.
    pub fn rz(theta: f64) -> Self {
        Self::new(
            Complex64::from_polar(1.0, -theta / 2.0),
            ZERO,
            ZERO,
            Complex64::from_polar(1.0, theta / 2.0),
        )
    }

    /// Build from a flat row-major slice of exactly four elements.
    pub fn from_slice(elements: &[Complex64]) -> EngineResult<Self> {
        let data: [Complex64; 4] = elements.try_into().map_err(|_| EngineError::MatrixSize {
            expected: 4,
            actual: elements.len(),
        })?;
        Ok(Self { data })
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * 2 + col]
    }

    /// Multiply this matrix by another: self * other.
    #[allow(clippy::many_single_char_names)]
    pub fn mul(&self, other: &Self) -> Self {
        let [a, b, c, d] = self.data;
        let [e, f, g, h] = other.data;
        Self::new(a * e + b * g, a * f + b * h, c * e + d * g, c * f + d * h)
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let [a, b, c, d] = self.data;
        Self::new(a.conj(), c.conj(), b.conj(), d.conj())
    }

    /// Whether this matrix is the identity, ignoring global phase.
    pub fn is_identity(&self) -> bool {
        let [a, b, c, d] = self.data;
        b.norm() < EPSILON
            && c.norm() < EPSILON
            && (a - d).norm() < EPSILON
            && (a.norm() - 1.0).abs() < EPSILON
    }
}

impl Default for Unitary2x2 {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 4x4 unitary matrix in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unitary4x4 {
    /// The matrix elements in row-major order.
    pub data: [Complex64; 16],
}

impl Unitary4x4 {
    /// Create the identity matrix.
    pub fn identity() -> Self {
        let mut data = [ZERO; 16];
        for i in 0..4 {
            data[i * 4 + i] = ONE;
        }
        Self { data }
    }

    /// Build a permutation matrix mapping basis state `i` to `perm[i]`.
    fn permutation(perm: [usize; 4]) -> Self {
        let mut data = [ZERO; 16];
        for (col, &row) in perm.iter().enumerate() {
            data[row * 4 + col] = ONE;
        }
        Self { data }
    }

    /// Controlled-X with the control on the first operand.
    pub fn cx() -> Self {
        // |b0 b1> -> |b0, b1 ^ b0>; index = b0 + 2 * b1
        Self::permutation([0, 3, 2, 1])
    }

    /// Controlled-Z.
    pub fn cz() -> Self {
        let mut m = Self::identity();
        m.data[15] = -ONE;
        m
    }

    /// Swap the two operands.
    pub fn swap() -> Self {
        Self::permutation([0, 2, 1, 3])
    }

    /// Build from a flat row-major slice of exactly sixteen elements.
    pub fn from_slice(elements: &[Complex64]) -> EngineResult<Self> {
        let data: [Complex64; 16] = elements.try_into().map_err(|_| EngineError::MatrixSize {
            expected: 16,
            actual: elements.len(),
        })?;
        Ok(Self { data })
    }

    /// Element at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * 4 + col]
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        let mut data = [ZERO; 16];
        for row in 0..4 {
            for col in 0..4 {
                data[col * 4 + row] = self.data[row * 4 + col].conj();
            }
        }
        Self { data }
    }
}

impl Default for Unitary4x4 {
    fn default() -> Self {
        Self::identity()
    }
}

/// A gate matrix of either supported arity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GateMatrix {
    /// One-operand gate.
    Single(Unitary2x2),
    /// Two-operand gate.
    Two(Unitary4x4),
}

impl GateMatrix {
    /// Interpret a flat row-major element list; the arity follows from the
    /// length (4 or 16).
    pub fn from_elements(elements: &[Complex64]) -> EngineResult<Self> {
        match elements.len() {
            4 => Unitary2x2::from_slice(elements).map(Self::Single),
            16 => Unitary4x4::from_slice(elements).map(Self::Two),
            actual => Err(EngineError::MatrixSize {
                expected: 4,
                actual,
            }),
        }
    }

    /// Number of operands the matrix acts on.
    pub fn arity(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Two(_) => 2,
        }
    }

    /// Flat row-major elements.
    pub fn elements(&self) -> &[Complex64] {
        match self {
            Self::Single(u) => &u.data,
            Self::Two(u) => &u.data,
        }
    }
}

impl From<Unitary2x2> for GateMatrix {
    fn from(u: Unitary2x2) -> Self {
        Self::Single(u)
    }
}

impl From<Unitary4x4> for GateMatrix {
    fn from(u: Unitary4x4) -> Self {
        Self::Two(u)
    }
}
