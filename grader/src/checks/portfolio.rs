use crate::context::Grader;
use crate::error::GradeError;
use crate::fixtures;
use crate::tolerance::{allclose, isclose_complex};
use crate::verdict::Verdict;
use hamiltonian::Observable;
use nalgebra::DMatrix;
use num_complex::Complex64;
use qsim::{Circuit, StateVector};
use serde_json::json;
use tracing::debug;

const MSG_HAMILTONIAN_OK: &str = "Tu solución esta correcta, felicidades!!";
const MSG_HAMILTONIAN_WRONG: &str = "Tu solución no implementa el Hamiltoniano correcto";

/// Binary variable of one asset, `(I - Z_qubit) / 2`, embedded in `num_assets` qubits.
fn asset_projector(qubit: usize, num_assets: usize) -> DMatrix<Complex64> {
    let dim = 1usize << num_assets;
    DMatrix::from_fn(dim, dim, |r, c| {
        if r == c && (r >> qubit) & 1 == 1 {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

fn hamiltonian_verdict(
    check: &str,
    candidate: &Observable,
    reference: &DMatrix<Complex64>,
) -> Verdict {
    let mut verdict = Verdict::new(check);
    if allclose(&candidate.to_matrix(), reference) {
        verdict.say(MSG_HAMILTONIAN_OK);
    } else {
        verdict.fail(MSG_HAMILTONIAN_WRONG);
    }
    verdict.finish()
}

impl Grader {
    /// 6a: `asset_operator(qubit, num_assets)` for 2, 3 and 4 assets and every qubit.
    pub fn asset_operator(
        &mut self,
        asset_operator: impl Fn(usize, usize) -> Result<Observable, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("6a");
        for num_assets in 2..=4 {
            for qubit in 0..num_assets {
                let op = asset_operator(qubit, num_assets)?;
                if !allclose(&op.to_matrix(), &asset_projector(qubit, num_assets)) {
                    debug!(qubit, num_assets, "asset operator mismatch");
                    verdict.fail("Tu operador esta incorrecto");
                    return Ok(verdict
                        .with_details(json!({ "qubit": qubit, "num_assets": num_assets }))
                        .finish());
                }
            }
        }
        verdict.say("Felicidades, tu solución esta correcta!");
        Ok(verdict.finish())
    }

    /// 6b: portfolio cost Hamiltonian against the tabulated 16x16 matrix.
    pub fn cost_hamiltonian(&mut self, hamiltonian: &Observable) -> Result<Verdict, GradeError> {
        Ok(hamiltonian_verdict("6b", hamiltonian, &fixtures::cost_hamiltonian()?))
    }

    /// 6c: budget penalty Hamiltonian against the tabulated 16x16 matrix.
    pub fn constraint_hamiltonian(&mut self, hamiltonian: &Observable) -> Result<Verdict, GradeError> {
        Ok(hamiltonian_verdict("6c", hamiltonian, &fixtures::constraint_hamiltonian()?))
    }

    /// 6d: the circuit must prepare the tabulated 4-qubit state.
    pub fn initial_state(&mut self, circuit: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("6d");
        let reference = fixtures::initial_state()?;
        let state = StateVector::from_circuit(circuit)?;
        let equal = state.amplitudes.len() == reference.len()
            && state
                .amplitudes
                .iter()
                .zip(&reference)
                .all(|(a, b)| isclose_complex(*a, *b));
        if equal {
            verdict.say(MSG_HAMILTONIAN_OK);
        } else {
            verdict.fail("Tu solución no implementa el estado correcto");
        }
        Ok(verdict.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projector_marks_basis_states_with_bit_set() {
        let p = asset_projector(1, 3);
        let diagonal: Vec<f64> = (0..8).map(|k| p[(k, k)].re).collect();
        assert_eq!(diagonal, vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0]);
    }
}
