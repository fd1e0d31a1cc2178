use crate::circuit::{Circuit, MAX_MATRIX_QUBITS};
use crate::error::SimError;
use crate::state::apply_gate_to_slice;
use nalgebra::DMatrix;
use num_complex::Complex64;

/// Full unitary of a circuit, little-endian like `StateVector`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub num_qubits: usize,
    pub matrix: DMatrix<Complex64>,
}

impl Operator {
    pub fn identity(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        Self {
            num_qubits,
            matrix: DMatrix::identity(dim, dim),
        }
    }

    /// Builds the unitary column by column. Fails on measurements, resets,
    /// conditioned gates or unbound parameters.
    pub fn from_circuit(circuit: &Circuit) -> Result<Self, SimError> {
        circuit.validate_width(MAX_MATRIX_QUBITS)?;
        let mut op = Self::identity(circuit.num_qubits);
        let dim = op.matrix.nrows();
        for gate in &circuit.gates {
            // nalgebra storage is column-major, so each chunk is one column
            for column in op.matrix.as_mut_slice().chunks_mut(dim) {
                apply_gate_to_slice(column, gate)?;
            }
        }
        Ok(op)
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn adjoint(&self) -> Operator {
        Operator {
            num_qubits: self.num_qubits,
            matrix: self.matrix.adjoint(),
        }
    }

    /// Frobenius norm of the difference.
    pub fn distance(&self, other: &Operator) -> f64 {
        (&self.matrix - &other.matrix).norm()
    }

    /// Equal up to a global phase, within `atol`.
    pub fn equiv(&self, other: &Operator, atol: f64) -> bool {
        if self.dim() != other.dim() {
            return false;
        }
        // the entry of largest magnitude fixes the relative phase
        let (pos, _) = other
            .matrix
            .iter()
            .enumerate()
            .fold((0, 0.0), |best, (i, z)| if z.norm() > best.1 { (i, z.norm()) } else { best });
        let a = self.matrix.as_slice()[pos];
        let b = other.matrix.as_slice()[pos];
        if a.norm() < atol {
            return false;
        }
        let phase = b / a;
        let phase = phase / phase.norm();
        (&self.matrix * phase - &other.matrix).iter().all(|z| z.norm() <= atol)
    }
}

/// |Tr(target† U)|² / d²
pub fn process_fidelity(unitary: &DMatrix<Complex64>, target: &DMatrix<Complex64>) -> f64 {
    let d = unitary.nrows() as f64;
    (target.adjoint() * unitary).trace().norm_sqr() / (d * d)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < EPSILON
    }

    #[test]
    fn test_cx_operator_little_endian() {
        let mut qc = Circuit::new(2, 0);
        qc.cx(0, 1);
        let op = Operator::from_circuit(&qc).unwrap();
        // |01> (q0 = 1) -> |11>
        assert!(approx_eq(op.matrix[(3, 1)], Complex64::new(1.0, 0.0)));
        assert!(approx_eq(op.matrix[(1, 3)], Complex64::new(1.0, 0.0)));
        assert!(approx_eq(op.matrix[(2, 2)], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_circuit_times_inverse_is_identity() {
        let mut qc = Circuit::new(3, 0);
        qc.h(0).cp(PI / 4.0, 0, 2).ccx(0, 2, 1).ry(0.3, 1).swap(1, 2);
        let mut both = qc.clone();
        both.append(&qc.inverse().unwrap()).unwrap();
        let op = Operator::from_circuit(&both).unwrap();
        assert!(op.distance(&Operator::identity(3)) < EPSILON);
    }

    #[test]
    fn test_equiv_ignores_global_phase() {
        let mut a = Circuit::new(1, 0);
        a.rz(PI / 2.0, 0);
        let mut b = Circuit::new(1, 0);
        b.s(0);
        let a = Operator::from_circuit(&a).unwrap();
        let b = Operator::from_circuit(&b).unwrap();
        assert!(a.distance(&b) > 0.1);
        assert!(a.equiv(&b, 1e-9));
    }

    #[test]
    fn test_process_fidelity() {
        let id = Operator::identity(2).matrix;
        assert!((process_fidelity(&id, &id) - 1.0).abs() < EPSILON);
        let mut qc = Circuit::new(2, 0);
        qc.x(0);
        let x = Operator::from_circuit(&qc).unwrap().matrix;
        assert!(process_fidelity(&x, &id).abs() < EPSILON);
    }
}
