use crate::context::Grader;
use crate::error::GradeError;
use crate::fixtures;
use crate::tolerance::allclose;
use crate::verdict::Verdict;
use hamiltonian::Observable;
use qsim::{Circuit, Estimator, NoiseModel, Operator, depolarizing_error, random_circuit};
use serde_json::json;
use tracing::debug;

const MSG_CORRECT: &str = "Felicitaciones, tu solución es correcta!";
const MSG_WRONG: &str = "Su solución está equivocada, intenta de nuevo";

/// Depolarizing noise on the single-qubit gates of both qubits; `sdg` and `cx` stay clean.
fn extrapolation_noise() -> NoiseModel {
    let error = depolarizing_error(0.01, 1);
    let gates = ["x", "h", "u", "y", "z"];
    let mut noise = NoiseModel::new();
    noise.add_quantum_error(error.clone(), &gates, &[0]);
    noise.add_quantum_error(error, &gates, &[1]);
    noise
}

fn extrapolation_circuit() -> Circuit {
    let mut qc = Circuit::new(2, 0);
    qc.h(0).cx(0, 1).sdg(1);
    qc
}

impl Grader {
    /// 2a: `folding(U, N)` must have depth `depth(U) * (2N + 1)` and the same unitary.
    pub fn folding(
        &mut self,
        folding: impl Fn(&Circuit, usize) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("2a");
        let mut failure = None;
        'circuits: for num_qubits in 1..=3 {
            let base = random_circuit(num_qubits, 4, &mut self.rng);
            let base_op = Operator::from_circuit(&base)?;
            for n in 0..=3 {
                let folded = folding(&base, n)?;
                let depth_ok = folded.depth() == base.depth() * (2 * n + 1);
                let operator_ok = depth_ok
                    && allclose(&Operator::from_circuit(&folded)?.matrix, &base_op.matrix);
                debug!(num_qubits, n, depth_ok, operator_ok, "folded circuit");
                if !operator_ok {
                    failure = Some(json!({
                        "num_qubits": num_qubits,
                        "folds": n,
                        "base_depth": base.depth(),
                        "folded_depth": folded.depth(),
                    }));
                    break 'circuits;
                }
            }
        }
        match failure {
            None => {
                verdict.say(MSG_CORRECT);
            }
            Some(details) => {
                verdict.fail(MSG_WRONG);
                verdict = verdict.with_details(details);
            }
        }
        Ok(verdict.finish())
    }

    /// 2b: the observable must be given as a Pauli sum equal to the tabulated matrix.
    pub fn pauli_observable(&mut self, observable: &Observable) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("2b");
        let reference = fixtures::pauli_observable()?;
        match observable.as_pauli() {
            None => {
                verdict.fail("A tiene que ser un operador SparsePauliOp");
            }
            Some(op) if allclose(&op.to_matrix(), &reference) => {
                verdict.say(MSG_CORRECT);
            }
            Some(_) => {
                verdict.fail(MSG_WRONG);
            }
        }
        Ok(verdict.finish())
    }

    /// 2c: zero-noise extrapolation. Noisy expectations of the folded circuits are
    /// fitted with the candidate's `(a, b)` against the noise scale `2N + 1`; the fit
    /// must not undershoot the data and the intercept must land near the ideal value.
    pub fn zero_noise_extrapolation(
        &mut self,
        extrapolation: impl Fn(&[usize], &[f64]) -> Result<(f64, f64), GradeError>,
        observable: &Observable,
        folds: &[usize],
        folding: impl Fn(&Circuit, usize) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("2c");
        let circuit = extrapolation_circuit();
        let matrix = observable.to_matrix();
        let noisy = Estimator::noisy(extrapolation_noise());

        let observed = folds
            .iter()
            .map(|&n| -> Result<f64, GradeError> { Ok(noisy.run(&folding(&circuit, n)?, &matrix)?) })
            .collect::<Result<Vec<_>, _>>()?;
        let ideal = Estimator::ideal().run(&circuit, &matrix)?;
        let (a, b) = extrapolation(folds, &observed)?;
        let fit_error: f64 = folds
            .iter()
            .zip(&observed)
            .map(|(&n, obs)| obs - (a * (2 * n + 1) as f64 + b))
            .sum();
        debug!(?observed, ideal, a, b, fit_error, "extrapolated");

        if fit_error > 0.01 || (ideal - b).abs() >= 0.09 {
            verdict.fail(format!("{}.", MSG_WRONG));
        } else {
            verdict.say("Tu solución esta correcta!");
        }
        Ok(verdict
            .with_details(json!({
                "observed": observed,
                "ideal": ideal,
                "slope": a,
                "intercept": b,
                "fit_error": fit_error,
            }))
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hamiltonian::SparsePauliOp;

    #[test]
    fn extrapolation_circuit_has_known_ideal_value() {
        let a = SparsePauliOp::from_list(&[("XY", 1.0), ("YX", 2.0), ("ZX", 3.0)]).unwrap();
        let value = Estimator::ideal().run(&extrapolation_circuit(), &a.to_matrix()).unwrap();
        assert!((value + 3.0).abs() < 1e-9);
        let noisy = Estimator::noisy(extrapolation_noise())
            .run(&extrapolation_circuit(), &a.to_matrix())
            .unwrap();
        assert!(noisy > -3.0 && noisy < -2.9);
    }
}
