use crate::error::SimError;
use crate::gate::{Gate, Pauli};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A Pauli channel on `num_qubits` qubits: probability and the Pauli applied
/// to each qubit of the instruction it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantumError {
    pub num_qubits: usize,
    pub terms: Vec<(f64, Vec<Pauli>)>,
}

impl QuantumError {
    pub fn pauli(terms: Vec<(f64, Vec<Pauli>)>) -> Result<Self, SimError> {
        let num_qubits = terms.first().map(|(_, p)| p.len()).unwrap_or(0);
        if terms.iter().any(|(p, ops)| ops.len() != num_qubits || *p < 0.0) {
            return Err(SimError::Internal("inconsistent Pauli error terms".into()));
        }
        let total: f64 = terms.iter().map(|(p, _)| p).sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(SimError::Internal(format!(
                "Pauli error probabilities sum to {}",
                total
            )));
        }
        Ok(Self { num_qubits, terms })
    }

    pub fn is_identity(&self) -> bool {
        self.terms
            .iter()
            .all(|(p, ops)| *p == 0.0 || ops.iter().all(|o| *o == Pauli::I))
    }
}

/// Depolarizing channel rho -> (1 - lambda) rho + lambda I / d, written as a Pauli mixture.
pub fn depolarizing_error(lambda: f64, num_qubits: usize) -> QuantumError {
    let n_paulis = 1usize << (2 * num_qubits);
    let each = lambda / n_paulis as f64;
    let paulis = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];
    let terms = (0..n_paulis)
        .map(|index| {
            let ops: Vec<Pauli> = (0..num_qubits)
                .map(|q| paulis[(index >> (2 * q)) & 3])
                .collect();
            let probability = if index == 0 {
                1.0 - lambda + each
            } else {
                each
            };
            (probability, ops)
        })
        .collect();
    QuantumError { num_qubits, terms }
}

/// Classical bit-flip on readout: P(read 1 | 0) and P(read 0 | 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadoutError {
    pub p1_given_0: f64,
    pub p0_given_1: f64,
}

impl ReadoutError {
    pub fn symmetric(p: f64) -> Self {
        Self {
            p1_given_0: p,
            p0_given_1: p,
        }
    }

    pub fn flip_probability(&self, bit: bool) -> f64 {
        if bit { self.p0_given_1 } else { self.p1_given_0 }
    }
}

/// Gate errors keyed by instruction name, optionally pinned to specific qubits.
/// Qubit-specific errors take precedence over all-qubit ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseModel {
    all_qubit: HashMap<String, QuantumError>,
    local: Vec<(String, Vec<usize>, QuantumError)>,
    readout: Option<ReadoutError>,
}

impl NoiseModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_all_qubit_quantum_error(&mut self, error: QuantumError, instructions: &[&str]) {
        for name in instructions {
            self.all_qubit.insert(name.to_string(), error.clone());
        }
    }

    pub fn add_quantum_error(&mut self, error: QuantumError, instructions: &[&str], qubits: &[usize]) {
        for name in instructions {
            self.local
                .retain(|(n, q, _)| !(n == name && q.as_slice() == qubits));
            self.local
                .push((name.to_string(), qubits.to_vec(), error.clone()));
        }
    }

    pub fn add_readout_error(&mut self, error: ReadoutError) {
        self.readout = Some(error);
    }

    pub fn readout(&self) -> Option<&ReadoutError> {
        self.readout.as_ref()
    }

    pub fn is_ideal(&self) -> bool {
        self.all_qubit.is_empty() && self.local.is_empty() && self.readout.is_none()
    }

    /// The error that follows `gate`, if any.
    pub fn error_for(&self, gate: &Gate) -> Option<&QuantumError> {
        let name = gate.name();
        let qubits = gate.qubits();
        self.local
            .iter()
            .find(|(n, q, _)| n == name && *q == qubits)
            .map(|(_, _, e)| e)
            .or_else(|| {
                self.all_qubit
                    .get(name)
                    .filter(|e| e.num_qubits == qubits.len())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_depolarizing_probabilities() {
        let error = depolarizing_error(0.01, 1);
        assert_eq!(error.terms.len(), 4);
        assert!((error.terms[0].0 - (1.0 - 0.0075)).abs() < EPSILON);
        assert!((error.terms[1].0 - 0.0025).abs() < EPSILON);
        let two = depolarizing_error(0.02, 2);
        let total: f64 = two.terms.iter().map(|(p, _)| p).sum();
        assert_eq!(two.terms.len(), 16);
        assert!((total - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_local_error_wins_over_all_qubit_error() {
        let mut model = NoiseModel::new();
        model.add_all_qubit_quantum_error(depolarizing_error(0.1, 1), &["h"]);
        model.add_quantum_error(depolarizing_error(0.2, 1), &["h"], &[1]);
        let on_zero = model.error_for(&Gate::H(0)).unwrap();
        let on_one = model.error_for(&Gate::H(1)).unwrap();
        assert!((on_zero.terms[1].0 - 0.025).abs() < EPSILON);
        assert!((on_one.terms[1].0 - 0.05).abs() < EPSILON);
        assert!(model.error_for(&Gate::X(0)).is_none());
    }

    #[test]
    fn test_all_qubit_error_needs_matching_width() {
        let mut model = NoiseModel::new();
        model.add_all_qubit_quantum_error(depolarizing_error(0.1, 2), &["cx"]);
        assert!(model.error_for(&Gate::CX(0, 1)).is_some());
        model.add_all_qubit_quantum_error(depolarizing_error(0.1, 1), &["x"]);
        assert!(model.error_for(&Gate::X(3)).is_some());
    }

    #[test]
    fn test_pauli_error_validation() {
        assert!(QuantumError::pauli(vec![(0.5, vec![Pauli::I]), (0.5, vec![Pauli::X])]).is_ok());
        assert!(QuantumError::pauli(vec![(0.5, vec![Pauli::I]), (0.4, vec![Pauli::X])]).is_err());
        assert!(depolarizing_error(0.0, 1).is_identity());
    }
}
