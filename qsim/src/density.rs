use crate::circuit::{Circuit, MAX_MATRIX_QUBITS};
use crate::error::SimError;
use crate::gate::{Gate, Pauli};
use crate::noise::{NoiseModel, QuantumError};
use crate::state::{StateVector, apply_gate_to_slice};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;

/// Mixed state; same little-endian qubit order as `StateVector`.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityMatrix {
    pub num_qubits: usize,
    pub matrix: DMatrix<Complex64>,
}

impl DensityMatrix {
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut matrix = DMatrix::zeros(dim, dim);
        matrix[(0, 0)] = Complex64::new(1.0, 0.0);
        Self { num_qubits, matrix }
    }

    pub fn from_state(state: &StateVector) -> Self {
        let psi = nalgebra::DVector::from_column_slice(&state.amplitudes);
        Self {
            num_qubits: state.num_qubits,
            matrix: &psi * psi.adjoint(),
        }
    }

    /// Evolves |0...0> through a measurement-free circuit, applying the gate
    /// errors of `noise` after each matching instruction.
    pub fn from_circuit(circuit: &Circuit, noise: Option<&NoiseModel>) -> Result<Self, SimError> {
        circuit.validate_width(MAX_MATRIX_QUBITS)?;
        let mut rho = Self::new(circuit.num_qubits);
        for gate in &circuit.gates {
            rho.apply_gate(gate)?;
            if let Some(error) = noise.and_then(|n| n.error_for(gate)) {
                rho.apply_error(error, &gate.qubits())?;
            }
        }
        Ok(rho)
    }

    fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// rho -> U rho U†, using U(U rho)† = U rho U† for Hermitian rho.
    pub fn apply_gate(&mut self, gate: &Gate) -> Result<(), SimError> {
        if gate.is_directive() {
            return Ok(());
        }
        let dim = self.dim();
        for column in self.matrix.as_mut_slice().chunks_mut(dim) {
            apply_gate_to_slice(column, gate)?;
        }
        self.matrix.adjoint_mut();
        for column in self.matrix.as_mut_slice().chunks_mut(dim) {
            apply_gate_to_slice(column, gate)?;
        }
        Ok(())
    }

    /// rho -> sum_k p_k P_k rho P_k over Pauli strings acting on `qubits`.
    pub fn apply_pauli_channel(
        &mut self,
        terms: &[(f64, Vec<Pauli>)],
        qubits: &[usize],
    ) -> Result<(), SimError> {
        let mut out = DMatrix::zeros(self.dim(), self.dim());
        for (probability, paulis) in terms {
            if *probability == 0.0 {
                continue;
            }
            let mut branch = self.clone();
            for (pauli, &q) in paulis.iter().zip(qubits) {
                if *pauli != Pauli::I {
                    branch.apply_gate(&pauli_gate(*pauli, q))?;
                }
            }
            out += branch.matrix * Complex64::new(*probability, 0.0);
        }
        self.matrix = out;
        Ok(())
    }

    pub fn apply_error(&mut self, error: &QuantumError, qubits: &[usize]) -> Result<(), SimError> {
        if error.is_identity() {
            return Ok(());
        }
        self.apply_pauli_channel(&error.terms, qubits)
    }

    /// Probability of each computational basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.matrix.diagonal().iter().map(|z| z.re.max(0.0)).collect()
    }

    /// Tr(rho A)
    pub fn expectation(&self, observable: &DMatrix<Complex64>) -> Result<Complex64, SimError> {
        if observable.shape() != self.matrix.shape() {
            return Err(SimError::Internal(format!(
                "observable of shape {:?} on a {}-qubit density matrix",
                observable.shape(),
                self.num_qubits
            )));
        }
        Ok((&self.matrix * observable).trace())
    }

    pub fn trace(&self) -> f64 {
        self.matrix.trace().re
    }

    /// Projective measurement of one qubit with collapse.
    pub fn measure_qubit(&mut self, qubit: usize, rng: &mut impl Rng) -> bool {
        let mask = 1 << qubit;
        let p_one: f64 = self
            .probabilities()
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, p)| p)
            .sum();
        let outcome = rng.r#gen::<f64>() < p_one;
        let p = if outcome { p_one } else { 1.0 - p_one };
        let scale = if p > 0.0 { 1.0 / p } else { 0.0 };
        let dim = self.dim();
        for col in 0..dim {
            for row in 0..dim {
                let keep = ((row & mask) != 0) == outcome && ((col & mask) != 0) == outcome;
                self.matrix[(row, col)] = if keep {
                    self.matrix[(row, col)] * scale
                } else {
                    Complex64::new(0.0, 0.0)
                };
            }
        }
        outcome
    }

    /// Non-selective reset channel |0><0| rho |0><0| + |0><1| rho |1><0|.
    pub fn reset_qubit(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let dim = self.dim();
        let mut out = DMatrix::zeros(dim, dim);
        for col in 0..dim {
            for row in 0..dim {
                if (row & mask) == (col & mask) {
                    out[(row & !mask, col & !mask)] += self.matrix[(row, col)];
                }
            }
        }
        self.matrix = out;
    }
}

fn pauli_gate(pauli: Pauli, qubit: usize) -> Gate {
    match pauli {
        Pauli::I => Gate::I(qubit),
        Pauli::X => Gate::X(qubit),
        Pauli::Y => Gate::Y(qubit),
        Pauli::Z => Gate::Z(qubit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_unitary_evolution_matches_statevector() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1).sdg(1);
        let state = StateVector::from_circuit(&qc).unwrap();
        let mut rho = DensityMatrix::new(2);
        for gate in &qc.gates {
            rho.apply_gate(gate).unwrap();
        }
        let expected = DensityMatrix::from_state(&state);
        assert!((&rho.matrix - &expected.matrix).norm() < EPSILON);
    }

    #[test]
    fn test_depolarized_hadamard_loses_coherence() {
        use crate::noise::depolarizing_error;
        let mut noise = NoiseModel::new();
        noise.add_all_qubit_quantum_error(depolarizing_error(0.5, 1), &["h"]);
        let mut qc = Circuit::new(1, 0);
        qc.h(0);
        let rho = DensityMatrix::from_circuit(&qc, Some(&noise)).unwrap();
        // off-diagonal shrinks by (1 - lambda)
        assert!((rho.matrix[(0, 1)].re - 0.25).abs() < EPSILON);
        assert!((rho.trace() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_full_bit_flip_channel() {
        let mut rho = DensityMatrix::new(1);
        rho.apply_pauli_channel(&[(1.0, vec![Pauli::X])], &[0]).unwrap();
        let p = rho.probabilities();
        assert!((p[1] - 1.0).abs() < EPSILON);
        assert!((rho.trace() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_reset_channel_on_mixed_state() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        let mut rho = DensityMatrix::from_state(&StateVector::from_circuit(&qc).unwrap());
        rho.reset_qubit(1);
        let p = rho.probabilities();
        // q1 forced to 0, q0 still 50/50
        assert!((p[0] - 0.5).abs() < EPSILON);
        assert!((p[1] - 0.5).abs() < EPSILON);
        assert!(p[2].abs() < EPSILON && p[3].abs() < EPSILON);
    }

    #[test]
    fn test_measurement_collapse_is_normalised() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        let mut rho = DensityMatrix::from_state(&StateVector::from_circuit(&qc).unwrap());
        let mut rng = StdRng::seed_from_u64(11);
        let outcome = rho.measure_qubit(0, &mut rng);
        let p = rho.probabilities();
        let index = if outcome { 3 } else { 0 };
        assert!((p[index] - 1.0).abs() < EPSILON);
    }
}
