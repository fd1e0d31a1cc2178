use crate::context::Grader;
use crate::error::GradeError;
use crate::verdict::Verdict;
use hamiltonian::SparsePauliOp;
use nalgebra::{DMatrix, SymmetricEigen};
use num_complex::Complex64;
use qsim::{Circuit, Operator, process_fidelity};
use serde_json::json;
use tracing::debug;

const NUM_QUBITS: usize = 5;
const TIME: f64 = 1.0;
const STEPS: usize = 5;

/// Nearest-neighbour XX + YY + ZZ chain on `num_qubits` qubits.
pub fn heisenberg_chain(num_qubits: usize) -> Result<SparsePauliOp, GradeError> {
    let mut labels = Vec::new();
    for k in 0..num_qubits.saturating_sub(1) {
        for p in ['X', 'Y', 'Z'] {
            let label: String = (0..num_qubits)
                .map(|j| if j == k || j == k + 1 { p } else { 'I' })
                .collect();
            labels.push(label);
        }
    }
    let list: Vec<(&str, f64)> = labels.iter().map(|l| (l.as_str(), 1.0)).collect();
    Ok(SparsePauliOp::from_list(&list)?)
}

/// exp(-i H t) for Hermitian H, through its eigendecomposition.
fn evolution(hamiltonian: &DMatrix<Complex64>, time: f64) -> DMatrix<Complex64> {
    let eigen = SymmetricEigen::new(hamiltonian.clone());
    let phases = DMatrix::from_diagonal(
        &eigen.eigenvalues.map(|lambda| Complex64::from_polar(1.0, -lambda * time)),
    );
    &eigen.eigenvectors * phases * eigen.eigenvectors.adjoint()
}

impl Grader {
    /// 5: Trotterised evolution of the Heisenberg chain, `trotterize(t / m, m)`,
    /// must reach process fidelity 0.9 with the exact propagator.
    pub fn trotterization(
        &mut self,
        trotterize: impl Fn(f64, usize) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("5");
        let hamiltonian = heisenberg_chain(NUM_QUBITS)?.to_matrix();
        let target = evolution(&hamiltonian, TIME);
        let candidate = Operator::from_circuit(&trotterize(TIME / STEPS as f64, STEPS)?)?;
        if candidate.matrix.shape() != target.shape() {
            return Err(GradeError::Shape {
                expected: vec![target.nrows(), target.ncols()],
                found: vec![candidate.matrix.nrows(), candidate.matrix.ncols()],
            });
        }
        let fidelity = process_fidelity(&candidate.matrix, &target);
        debug!(fidelity, "trotter fidelity");

        verdict.say(format!("Fidelidad= {}", fidelity));
        if fidelity >= 0.9 {
            verdict.say("Felicidades, su solución tiene una fidelidad superior al 90%");
        } else {
            verdict.fail("Su solución tiene fidelidad muy baja.");
        }
        Ok(verdict.with_details(json!({ "fidelity": fidelity })).finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_has_three_terms_per_bond() {
        let h = heisenberg_chain(5).unwrap();
        assert_eq!(h.terms.len(), 12);
        assert_eq!(h.num_qubits, 5);
    }

    #[test]
    fn evolution_is_unitary_and_matches_small_case() {
        // exp(-i t ZZ) on two qubits is diagonal with phases e^{-it}, e^{it}, e^{it}, e^{-it}
        let zz = SparsePauliOp::from_list(&[("ZZ", 1.0)]).unwrap().to_matrix();
        let u = evolution(&zz, 0.3);
        let expected = [-0.3, 0.3, 0.3, -0.3];
        for (k, phase) in expected.iter().enumerate() {
            assert!((u[(k, k)] - Complex64::from_polar(1.0, *phase)).norm() < 1e-9);
        }
        let h = heisenberg_chain(3).unwrap().to_matrix();
        let u = evolution(&h, 0.7);
        assert!((u.adjoint() * &u - DMatrix::<Complex64>::identity(8, 8)).norm() < 1e-9);
    }
}
