use crate::circuit::{Circuit, MAX_STATE_QUBITS};
use crate::error::SimError;
use crate::gate::{Gate, GateMatrix, PAULI_X};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;

/// Pure state of `num_qubits` qubits; qubit k is bit k of the amplitude index.
#[derive(Serialize, Clone, Debug)]
pub struct StateVector {
    pub num_qubits: usize,
    #[serde(rename = "amplitudes")]
    pub amplitudes: Vec<Complex64>,
}

impl StateVector {
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits; // 2^num_qubits
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            num_qubits,
            amplitudes,
        }
    }

    pub fn from_amplitudes(amplitudes: Vec<Complex64>) -> Result<Self, SimError> {
        let len = amplitudes.len();
        if len == 0 || !len.is_power_of_two() {
            return Err(SimError::Internal(format!(
                "state of length {} is not a power of two",
                len
            )));
        }
        Ok(Self {
            num_qubits: len.trailing_zeros() as usize,
            amplitudes,
        })
    }

    /// Simulates a purely unitary circuit (barriers allowed) from |0...0>.
    pub fn from_circuit(circuit: &Circuit) -> Result<Self, SimError> {
        circuit.validate_width(MAX_STATE_QUBITS)?;
        let mut state = Self::new(circuit.num_qubits);
        for gate in &circuit.gates {
            state.apply_gate(gate)?;
        }
        Ok(state)
    }

    pub fn apply_gate(&mut self, gate: &Gate) -> Result<(), SimError> {
        apply_gate_to_slice(&mut self.amplitudes, gate)
    }

    pub fn apply_single_qubit_gate(&mut self, gate_matrix: &GateMatrix, target_qubit: usize) {
        apply_single_to_slice(&mut self.amplitudes, gate_matrix, target_qubit);
    }

    pub fn apply_cx(&mut self, control_qubit: usize, target_qubit: usize) {
        apply_cx_to_slice(&mut self.amplitudes, control_qubit, target_qubit);
    }

    /// Applies a 2^k x 2^k matrix to `qubits` (first qubit = least significant local bit).
    pub fn apply_matrix(&mut self, matrix: &DMatrix<Complex64>, qubits: &[usize]) {
        apply_matrix_to_slice(&mut self.amplitudes, matrix, qubits);
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Measures one qubit, collapsing the state. Returns the outcome bit.
    pub fn measure_qubit(&mut self, qubit: usize, rng: &mut impl Rng) -> bool {
        let mask = 1 << qubit;
        let p_one: f64 = self
            .amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum();
        let outcome = rng.r#gen::<f64>() < p_one;
        let p = if outcome { p_one } else { 1.0 - p_one };
        let scale = if p > 0.0 { 1.0 / p.sqrt() } else { 0.0 };
        for (i, amp) in self.amplitudes.iter_mut().enumerate() {
            if ((i & mask) != 0) == outcome {
                *amp *= scale;
            } else {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        outcome
    }

    /// Resets one qubit to |0> (measure, then flip on a 1).
    pub fn reset_qubit(&mut self, qubit: usize, rng: &mut impl Rng) {
        if self.measure_qubit(qubit, rng) {
            self.apply_single_qubit_gate(&PAULI_X, qubit);
        }
    }

    pub fn reset(&mut self) {
        for amp in &mut self.amplitudes {
            *amp = Complex64::new(0.0, 0.0);
        }
        self.amplitudes[0] = Complex64::new(1.0, 0.0);
    }

    /// <self|other>
    pub fn inner(&self, other: &StateVector) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// |<self|other>|^2
    pub fn fidelity(&self, other: &StateVector) -> f64 {
        self.inner(other).norm_sqr()
    }

    /// Euclidean norm of the amplitude difference.
    pub fn distance(&self, other: &StateVector) -> f64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| (a - b).norm_sqr())
            .sum::<f64>()
            .sqrt()
    }

    /// <psi|A|psi> for a full-width matrix.
    pub fn expectation(&self, observable: &DMatrix<Complex64>) -> Result<Complex64, SimError> {
        let dim = self.amplitudes.len();
        if observable.nrows() != dim || observable.ncols() != dim {
            return Err(SimError::Internal(format!(
                "observable of shape {}x{} on a {}-qubit state",
                observable.nrows(),
                observable.ncols(),
                self.num_qubits
            )));
        }
        let psi = nalgebra::DVector::from_column_slice(&self.amplitudes);
        Ok(psi.dotc(&(observable * &psi)))
    }
}

/// Applies a unitary gate to a length-2^n amplitude slice. Barriers are no-ops.
pub fn apply_gate_to_slice(amplitudes: &mut [Complex64], gate: &Gate) -> Result<(), SimError> {
    match gate {
        Gate::Barrier(_) => Ok(()),
        Gate::CX(c, t) => {
            apply_cx_to_slice(amplitudes, *c, *t);
            Ok(())
        }
        Gate::Measure(..) | Gate::Reset(_) | Gate::IfValue(..) => {
            Err(SimError::NonUnitary(gate.name().to_string()))
        }
        _ => {
            if let Some(m) = gate.single_qubit_matrix()? {
                apply_single_to_slice(amplitudes, &m, gate.qubits()[0]);
            } else {
                apply_matrix_to_slice(amplitudes, &gate.matrix()?, &gate.qubits());
            }
            Ok(())
        }
    }
}

fn apply_single_to_slice(amplitudes: &mut [Complex64], gate_matrix: &GateMatrix, target_qubit: usize) {
    let k = 1 << target_qubit;
    for i in 0..amplitudes.len() {
        if (i & k) == 0 {
            let j = i | k;
            let amp_i = amplitudes[i];
            let amp_j = amplitudes[j];

            amplitudes[i] = gate_matrix[0][0] * amp_i + gate_matrix[0][1] * amp_j;
            amplitudes[j] = gate_matrix[1][0] * amp_i + gate_matrix[1][1] * amp_j;
        }
    }
}

fn apply_cx_to_slice(amplitudes: &mut [Complex64], control_qubit: usize, target_qubit: usize) {
    let control_mask = 1 << control_qubit;
    let target_mask = 1 << target_qubit;

    for i in 0..amplitudes.len() {
        if (i & control_mask) != 0 && (i & target_mask) == 0 {
            amplitudes.swap(i, i | target_mask);
        }
    }
}

/// Applies `matrix` to the sub-register `qubits` of a length-2^n amplitude slice.
pub fn apply_matrix_to_slice(amplitudes: &mut [Complex64], matrix: &DMatrix<Complex64>, qubits: &[usize]) {
    let dim = 1usize << qubits.len();
    let mask: usize = qubits.iter().map(|&q| 1usize << q).sum();
    let offsets: Vec<usize> = (0..dim)
        .map(|j| {
            qubits
                .iter()
                .enumerate()
                .filter(|(bit, _)| j & (1usize << *bit) != 0)
                .map(|(_, &q)| 1usize << q)
                .sum()
        })
        .collect();
    let mut local = vec![Complex64::new(0.0, 0.0); dim];
    for base in 0..amplitudes.len() {
        if base & mask != 0 {
            continue;
        }
        for (j, off) in offsets.iter().enumerate() {
            local[j] = amplitudes[base | off];
        }
        for (row, off) in offsets.iter().enumerate() {
            amplitudes[base | off] = (0..dim).map(|col| matrix[(row, col)] * local[col]).sum();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{HADAMARD, PAULI_Z};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a.re - b.re).abs() < EPSILON && (a.im - b.im).abs() < EPSILON
    }

    #[test]
    fn test_state_vector_initialization() {
        let num_qubits = 3;
        let state = StateVector::new(num_qubits);
        assert_eq!(state.num_qubits, num_qubits);
        assert_eq!(state.amplitudes.len(), 1 << num_qubits);
        assert!(approx_eq(state.amplitudes[0], Complex64::new(1.0, 0.0)));
        for i in 1..state.amplitudes.len() {
            assert!(approx_eq(state.amplitudes[i], Complex64::new(0.0, 0.0)));
        }
    }

    #[test]
    fn test_measurement_collapses() {
        let mut state = StateVector::new(2); // State is |00>
        state.apply_single_qubit_gate(&PAULI_X, 1);

        let mut rng = StdRng::seed_from_u64(7);
        assert!(state.measure_qubit(1, &mut rng));
        assert!(!state.measure_qubit(0, &mut rng));
        assert!(approx_eq(state.amplitudes[2], Complex64::new(1.0, 0.0)));
    }

    #[test]
    fn test_bell_state_from_circuit() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        let state = StateVector::from_circuit(&qc).unwrap();
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert!(approx_eq(state.amplitudes[0], Complex64::new(r, 0.0)));
        assert!(approx_eq(state.amplitudes[3], Complex64::new(r, 0.0)));
        assert!(approx_eq(state.amplitudes[1], Complex64::new(0.0, 0.0)));
    }

    #[test]
    fn test_general_matrix_matches_cx_path() {
        let mut fast = StateVector::new(3);
        fast.apply_single_qubit_gate(&HADAMARD, 2);
        let mut slow = fast.clone();
        fast.apply_cx(2, 0);
        slow.apply_matrix(&Gate::CX(2, 0).matrix().unwrap(), &[2, 0]);
        for (a, b) in fast.amplitudes.iter().zip(&slow.amplitudes) {
            assert!(approx_eq(*a, *b));
        }
    }

    #[test]
    fn test_expectation_of_z() {
        let mut state = StateVector::new(1);
        state.apply_single_qubit_gate(&PAULI_X, 0);
        let z = DMatrix::from_row_slice(
            2,
            2,
            &[PAULI_Z[0][0], PAULI_Z[0][1], PAULI_Z[1][0], PAULI_Z[1][1]],
        );
        let value = state.expectation(&z).unwrap();
        assert!(approx_eq(value, Complex64::new(-1.0, 0.0)));
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut state = StateVector::new(1);
        state.apply_single_qubit_gate(&HADAMARD, 0);
        let mut rng = StdRng::seed_from_u64(3);
        state.reset_qubit(0, &mut rng);
        assert!((state.probabilities()[0] - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_measure_gate_is_rejected_in_pure_simulation() {
        let mut qc = Circuit::new(1, 1);
        qc.measure(0, 0);
        assert!(matches!(
            StateVector::from_circuit(&qc),
            Err(SimError::NonUnitary(_))
        ));
    }
}
