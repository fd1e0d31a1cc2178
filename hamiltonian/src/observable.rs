use crate::{PauliError, SparsePauliOp};
use nalgebra::DMatrix;
use num_complex::Complex64;

/// An observable handed in either as a Pauli sum or as a dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Observable {
    Pauli(SparsePauliOp),
    Dense(DMatrix<Complex64>),
}

impl Observable {
    pub fn num_qubits(&self) -> usize {
        match self {
            Observable::Pauli(op) => op.num_qubits,
            Observable::Dense(m) => m.nrows().trailing_zeros() as usize,
        }
    }

    pub fn to_matrix(&self) -> DMatrix<Complex64> {
        match self {
            Observable::Pauli(op) => op.to_matrix(),
            Observable::Dense(m) => m.clone(),
        }
    }

    pub fn as_pauli(&self) -> Option<&SparsePauliOp> {
        match self {
            Observable::Pauli(op) => Some(op),
            Observable::Dense(_) => None,
        }
    }

    /// Pauli form, decomposing dense matrices on demand.
    pub fn to_pauli(&self) -> Result<SparsePauliOp, PauliError> {
        match self {
            Observable::Pauli(op) => Ok(op.clone()),
            Observable::Dense(m) => SparsePauliOp::from_operator(m),
        }
    }
}

impl From<SparsePauliOp> for Observable {
    fn from(op: SparsePauliOp) -> Self {
        Observable::Pauli(op)
    }
}

impl From<DMatrix<Complex64>> for Observable {
    fn from(m: DMatrix<Complex64>) -> Self {
        Observable::Dense(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dense_and_pauli_agree() {
        let op = SparsePauliOp::from_list(&[("ZI", 1.0), ("IX", 0.5)]).unwrap();
        let dense = Observable::from(op.to_matrix());
        assert!(dense.as_pauli().is_none());
        assert_eq!(dense.num_qubits(), 2);
        let back = dense.to_pauli().unwrap();
        assert!((back.to_matrix() - op.to_matrix()).norm() < 1e-12);
        assert!(Observable::from(op).as_pauli().is_some());
    }
}
