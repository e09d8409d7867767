//! Pauli transfer matrices.
//!
//! For a `d`-dimensional unitary `U` the Pauli transfer matrix is
//! `R_pq = Tr(P_p U P_q U†) / d`, where `P` runs over the tensor products of
//! `{I, X, Y, Z}`. It maps the Pauli coefficients of an operator `A` to those
//! of `U A U†`, which lets the engine apply a gate block by block.

use ndarray::Array2;
use num_complex::Complex64;

use crate::matrix::{Unitary2x2, Unitary4x4};

/// Single-operand Pauli basis `I, X, Y, Z`.
fn single_paulis() -> Vec<Array2<Complex64>> {
    [
        Unitary2x2::identity(),
        Unitary2x2::x(),
        Unitary2x2::y(),
        Unitary2x2::z(),
    ]
    .iter()
    .map(|p| to_array(&p.data, 2))
    .collect()
}

/// Two-operand Pauli basis; index `4 * a + b` is `P_a ⊗ P_b` with `P_a`
/// acting on the most-significant operand.
fn two_paulis() -> Vec<Array2<Complex64>> {
    let single = single_paulis();
    let mut basis = Vec::with_capacity(16);
    for a in &single {
        for b in &single {
            basis.push(kron(a, b));
        }
    }
    basis
}

fn to_array(data: &[Complex64], dim: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((dim, dim), |(r, c)| data[r * dim + c])
}

fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ra, ca) = a.dim();
    let (rb, cb) = b.dim();
    Array2::from_shape_fn((ra * rb, ca * cb), |(r, c)| {
        a[(r / rb, c / cb)] * b[(r % rb, c % cb)]
    })
}

fn trace(m: &Array2<Complex64>) -> Complex64 {
    m.diag().iter().sum()
}

/// A real-valued Pauli transfer matrix for a one- or two-operand unitary.
#[derive(Debug, Clone)]
pub struct PauliTransferMatrix {
    arity: usize,
    data: Array2<f64>,
    basis: Vec<Array2<Complex64>>,
}

impl PauliTransferMatrix {
    /// Transfer matrix of a one-operand unitary.
    pub fn from_single(unitary: &Unitary2x2) -> Self {
        Self::build(1, to_array(&unitary.data, 2), single_paulis())
    }

    /// Transfer matrix of a two-operand unitary.
    ///
    /// The unitary's index `b_lsb + 2 * b_msb` lines up with the kron order
    /// of the two-operand Pauli basis.
    pub fn from_two(unitary: &Unitary4x4) -> Self {
        Self::build(2, to_array(&unitary.data, 4), two_paulis())
    }

    fn build(arity: usize, u: Array2<Complex64>, basis: Vec<Array2<Complex64>>) -> Self {
        let dim = u.nrows() as f64;
        let u_dag = u.t().mapv(|z| z.conj());
        let n = basis.len();
        let data = Array2::from_shape_fn((n, n), |(p, q)| {
            let conjugated = u.dot(&basis[q]).dot(&u_dag);
            trace(&basis[p].dot(&conjugated)).re / dim
        });
        Self { arity, data, basis }
    }

    /// Number of operands.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The `4^arity` square matrix.
    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    /// Apply the channel to one operator block `A`, returning `U A U†`.
    ///
    /// `block` must be `2^arity` square. Works for non-Hermitian blocks too,
    /// since the Pauli coefficients are allowed to be complex.
    pub fn apply_block(&self, block: &Array2<Complex64>) -> Array2<Complex64> {
        let dim = block.nrows();
        let coefficients: Vec<Complex64> = self
            .basis
            .iter()
            .map(|p| trace(&p.dot(block)))
            .collect();

        let mut out = Array2::zeros((dim, dim));
        for (p, pauli) in self.basis.iter().enumerate() {
            let c: Complex64 = self
                .data
                .row(p)
                .iter()
                .zip(&coefficients)
                .map(|(r, c)| c * *r)
                .sum();
            if c.norm() > 0.0 {
                out.scaled_add(c / dim as f64, pauli);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_identity_ptm_is_identity() {
        let ptm = PauliTransferMatrix::from_single(&Unitary2x2::identity());
        for ((p, q), v) in ptm.as_array().indexed_iter() {
            let expected = if p == q { 1.0 } else { 0.0 };
            assert!((v - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn test_x_flips_z() {
        let ptm = PauliTransferMatrix::from_single(&Unitary2x2::x());
        // X Z X = -Z, X X X = X
        assert!((ptm.as_array()[(3, 3)] + 1.0).abs() < EPSILON);
        assert!((ptm.as_array()[(1, 1)] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_hadamard_swaps_x_and_z() {
        let ptm = PauliTransferMatrix::from_single(&Unitary2x2::h());
        assert!((ptm.as_array()[(1, 3)] - 1.0).abs() < EPSILON);
        assert!((ptm.as_array()[(3, 1)] - 1.0).abs() < EPSILON);
        assert!((ptm.as_array()[(2, 2)] + 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_apply_block_matches_conjugation() {
        let u = Unitary2x2::ry(0.4).mul(&Unitary2x2::rz(1.1));
        let ptm = PauliTransferMatrix::from_single(&u);

        let rho = to_array(
            &[
                Complex64::new(0.7, 0.0),
                Complex64::new(0.1, 0.2),
                Complex64::new(0.1, -0.2),
                Complex64::new(0.3, 0.0),
            ],
            2,
        );
        let ua = to_array(&u.data, 2);
        let expected = ua.dot(&rho).dot(&ua.t().mapv(|z| z.conj()));
        let got = ptm.apply_block(&rho);

        for (a, b) in got.iter().zip(expected.iter()) {
            assert!((a - b).norm() < EPSILON);
        }
    }

    #[test]
    fn test_two_operand_ptm_is_unital() {
        let ptm = PauliTransferMatrix::from_two(&Unitary4x4::cx());
        assert_eq!(ptm.arity(), 2);
        assert_eq!(ptm.as_array().dim(), (16, 16));
        assert!((ptm.as_array()[(0, 0)] - 1.0).abs() < EPSILON);
        for q in 1..16 {
            assert!(ptm.as_array()[(0, q)].abs() < EPSILON);
        }
    }
}
