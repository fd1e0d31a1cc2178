use crate::context::Grader;
use crate::error::GradeError;
use crate::tolerance::{ATOL, isclose};
use crate::verdict::Verdict;
use nalgebra::DMatrix;
use num_complex::Complex64;
use qsim::{Circuit, Operator, Sampler};
use serde_json::json;
use std::f64::consts::PI;
use tracing::debug;

/// Eigenphase of the controlled-phase unitary the phase-estimation exercises target.
pub const PHASE: f64 = 0.375;
const MSG_SUCCESS: &str = "Felicidades, tu solución es correcta!";

/// Unitary DFT matrix `F[j][k] = exp(2 pi i jk / N) / sqrt(N)`.
fn fourier_matrix(num_qubits: usize) -> DMatrix<Complex64> {
    let dim = 1usize << num_qubits;
    let norm = (dim as f64).sqrt();
    DMatrix::from_fn(dim, dim, |j, k| {
        Complex64::from_polar(1.0, 2.0 * PI * ((j * k) % dim) as f64 / dim as f64) / norm
    })
}

/// diag(1, 1, 1, e^{2 pi i 0.375 n})
fn controlled_phase_power(power: u32) -> DMatrix<Complex64> {
    let mut m = DMatrix::identity(4, 4);
    m[(3, 3)] = Complex64::from_polar(1.0, 2.0 * PI * PHASE * f64::from(power));
    m
}

/// Frobenius distance, infinite when the shapes differ.
fn distance(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>) -> f64 {
    if a.shape() != b.shape() {
        return f64::INFINITY;
    }
    (a - b).norm()
}

impl Grader {
    /// 3a: `fourier(n)` must implement the n-qubit quantum Fourier transform for n = 2..=5.
    pub fn fourier_transform(
        &mut self,
        fourier: impl Fn(usize) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("3a");
        for num_qubits in 2..=5 {
            let op = Operator::from_circuit(&fourier(num_qubits)?)?;
            let d = distance(&fourier_matrix(num_qubits), &op.matrix);
            debug!(num_qubits, distance = d, "fourier transform");
            if d > ATOL {
                verdict.fail(format!(
                    "La función no implementa la transformada de Fourier para {} qubits",
                    num_qubits
                ));
                return Ok(verdict.finish());
            }
        }
        verdict.say(MSG_SUCCESS);
        Ok(verdict.finish())
    }

    /// 3b: `power_of(n)` must implement the n-th power of the controlled phase for n = 1..=5.
    pub fn controlled_power(
        &mut self,
        power_of: impl Fn(u32) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("3b");
        for power in 1..=5 {
            let op = Operator::from_circuit(&power_of(power)?)?;
            let d = distance(&controlled_phase_power(power), &op.matrix);
            debug!(power, distance = d, "controlled power");
            if d > ATOL {
                verdict.fail(format!("La función no implementa $U^n$ para potencia {}", power));
                return Ok(verdict.finish());
            }
        }
        verdict.say(MSG_SUCCESS);
        Ok(verdict.finish())
    }

    /// 3c: the most likely outcome of `estimation(n)` over 2^n must recover the phase.
    pub fn phase_estimation(
        &mut self,
        estimation: impl Fn(usize) -> Result<Circuit, GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("3c");
        let sampler = Sampler::ideal();
        for num_qubits in 3..=5 {
            let qc = estimation(num_qubits)?;
            let dist = self.outcome_probabilities(&sampler, &qc)?;
            let best = dist
                .iter()
                .fold(None, |best: Option<(u64, f64)>, (&v, &p)| match best {
                    Some((_, bp)) if bp >= p => best,
                    _ => Some((v, p)),
                })
                .map_or(0, |(v, _)| v);
            let phi_hat = best as f64 / (1u64 << num_qubits) as f64;
            debug!(num_qubits, phi_hat, "estimated phase");
            if !isclose((phi_hat - PHASE).abs(), 0.0) {
                verdict.fail(format!(
                    "La función no estima correctamente la fase para {} qubits",
                    num_qubits
                ));
                verdict.say(format!("$\\tilde\\phi=${}", phi_hat));
                return Ok(verdict.with_details(json!({ "phi_hat": phi_hat })).finish());
            }
        }
        verdict.say(MSG_SUCCESS);
        Ok(verdict.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn fourier_matrix_is_unitary() {
        let f = fourier_matrix(3);
        let product = f.adjoint() * &f;
        assert!((product - DMatrix::<Complex64>::identity(8, 8)).norm() < 1e-9);
        assert!((f[(1, 1)] - Complex64::from_polar(1.0, PI / 4.0) / 8f64.sqrt()).norm() < EPSILON);
    }

    #[test]
    fn eighth_power_is_identity() {
        // 0.375 * 8 = 3 full turns
        let m = controlled_phase_power(8);
        assert!((m[(3, 3)] - Complex64::new(1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn shape_mismatch_is_far() {
        assert!(distance(&DMatrix::identity(2, 2), &DMatrix::identity(4, 4)).is_infinite());
    }
}
