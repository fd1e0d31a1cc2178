//! Reference operators and states, stored as JSON next to the crate.

use crate::error::GradeError;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::Deserialize;
use serde::de::DeserializeOwned;

const OBSERVABLE_2B: &str = include_str!("../fixtures/2b_observable.json");
const BASES_4A: &str = include_str!("../fixtures/4a_bases.json");
const OPERATORS_4B: &str = include_str!("../fixtures/4b_operators.json");
const COST_6B: &str = include_str!("../fixtures/6b_cost.json");
const CONSTRAINT_6C: &str = include_str!("../fixtures/6c_constraint.json");
const STATE_6D: &str = include_str!("../fixtures/6d_state.json");

/// Row-major matrix, or just its diagonal.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MatrixData {
    Diagonal {
        diagonal: Vec<f64>,
    },
    Dense {
        rows: usize,
        cols: usize,
        real: Vec<f64>,
        #[serde(default)]
        imag: Vec<f64>,
    },
}

impl MatrixData {
    pub fn to_matrix(&self) -> Result<DMatrix<Complex64>, GradeError> {
        match self {
            MatrixData::Diagonal { diagonal } => {
                let n = diagonal.len();
                Ok(DMatrix::from_fn(n, n, |r, c| {
                    if r == c { Complex64::new(diagonal[r], 0.0) } else { Complex64::new(0.0, 0.0) }
                }))
            }
            MatrixData::Dense { rows, cols, real, imag } => {
                let len = rows * cols;
                if real.len() != len || !(imag.is_empty() || imag.len() == len) {
                    return Err(GradeError::Shape {
                        expected: vec![*rows, *cols],
                        found: vec![real.len(), imag.len()],
                    });
                }
                Ok(DMatrix::from_fn(*rows, *cols, |r, c| {
                    let k = r * cols + c;
                    Complex64::new(real[k], imag.get(k).copied().unwrap_or(0.0))
                }))
            }
        }
    }
}

fn parse<T: DeserializeOwned>(name: &str, text: &str) -> Result<T, GradeError> {
    serde_json::from_str(text).map_err(|source| GradeError::FixtureFormat {
        name: name.to_string(),
        source,
    })
}

fn matrices(list: &[MatrixData]) -> Result<Vec<DMatrix<Complex64>>, GradeError> {
    list.iter().map(MatrixData::to_matrix).collect()
}

#[derive(Deserialize)]
struct ObservableFixture {
    observable: MatrixData,
}

#[derive(Deserialize)]
struct BasesFixture {
    alice: Vec<MatrixData>,
    bob: Vec<MatrixData>,
}

#[derive(Deserialize)]
struct OperatorsFixture {
    operators: Vec<MatrixData>,
}

#[derive(Deserialize)]
struct HamiltonianFixture {
    hamiltonian: MatrixData,
}

#[derive(Deserialize)]
struct StateFixture {
    state: MatrixData,
}

/// 4x4 target of the mixed Pauli observable.
pub fn pauli_observable() -> Result<DMatrix<Complex64>, GradeError> {
    parse::<ObservableFixture>("2b_observable", OBSERVABLE_2B)?.observable.to_matrix()
}

/// Alice's and Bob's single-qubit measurement rotations.
pub fn measurement_bases() -> Result<(Vec<DMatrix<Complex64>>, Vec<DMatrix<Complex64>>), GradeError> {
    let fixture: BasesFixture = parse("4a_bases", BASES_4A)?;
    Ok((matrices(&fixture.alice)?, matrices(&fixture.bob)?))
}

/// Nine two-qubit operators, index `3 * alice_trit + bob_trit`.
pub fn trit_operators() -> Result<Vec<DMatrix<Complex64>>, GradeError> {
    matrices(&parse::<OperatorsFixture>("4b_operators", OPERATORS_4B)?.operators)
}

pub fn cost_hamiltonian() -> Result<DMatrix<Complex64>, GradeError> {
    parse::<HamiltonianFixture>("6b_cost", COST_6B)?.hamiltonian.to_matrix()
}

pub fn constraint_hamiltonian() -> Result<DMatrix<Complex64>, GradeError> {
    parse::<HamiltonianFixture>("6c_constraint", CONSTRAINT_6C)?.hamiltonian.to_matrix()
}

/// Amplitudes of the 4-qubit initial state.
pub fn initial_state() -> Result<Vec<Complex64>, GradeError> {
    let state = parse::<StateFixture>("6d_state", STATE_6D)?.state.to_matrix()?;
    Ok(state.iter().copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_have_expected_shapes() {
        assert_eq!(pauli_observable().unwrap().shape(), (4, 4));
        let (alice, bob) = measurement_bases().unwrap();
        assert_eq!((alice.len(), bob.len()), (3, 3));
        assert!(alice.iter().chain(&bob).all(|m| m.shape() == (2, 2)));
        let ops = trit_operators().unwrap();
        assert_eq!(ops.len(), 9);
        assert_eq!(cost_hamiltonian().unwrap().shape(), (16, 16));
        assert_eq!(constraint_hamiltonian().unwrap().shape(), (16, 16));
        assert_eq!(initial_state().unwrap().len(), 16);
    }

    #[test]
    fn trit_operators_are_unitary() {
        for op in trit_operators().unwrap() {
            let product = op.adjoint() * &op;
            assert!((product - DMatrix::<Complex64>::identity(4, 4)).norm() < 1e-6);
        }
    }

    #[test]
    fn dense_length_mismatch_is_rejected() {
        let data = MatrixData::Dense { rows: 2, cols: 2, real: vec![1.0; 3], imag: vec![] };
        assert!(matches!(data.to_matrix(), Err(GradeError::Shape { .. })));
    }
}
