use crate::context::Grader;
use crate::error::GradeError;
use crate::fixtures;
use crate::tolerance::ATOL;
use crate::verdict::Verdict;
use nalgebra::DMatrix;
use num_complex::Complex64;
use qsim::{Circuit, Operator};
use serde_json::json;
use tracing::debug;

const MSG_CORRECT: &str = "Felicitaciones, tu solución es correcta!";

fn matches_single(circuit: &Circuit, reference: Option<&DMatrix<Complex64>>) -> Result<bool, GradeError> {
    let op = Operator::from_circuit(circuit)?;
    Ok(reference.is_some_and(|r| r.shape() == op.matrix.shape() && (&op.matrix - r).norm() <= ATOL))
}

/// `|op^dagger U|` equals the identity entrywise, so U matches op up to per-column phases.
fn matches_up_to_phase(op: &DMatrix<Complex64>, unitary: &DMatrix<Complex64>) -> bool {
    if op.shape() != unitary.shape() {
        return false;
    }
    let product = op.adjoint() * unitary;
    product.iter().enumerate().all(|(k, z)| {
        let (r, c) = (k % product.nrows(), k / product.nrows());
        let target = if r == c { 1.0 } else { 0.0 };
        (z.norm() - target).abs() <= ATOL
    })
}

/// Index of the trit pair among the nine operators: `3 * alice + bob`.
fn trit_index(alice: u8, bob: u8) -> usize {
    3 * usize::from(alice) + usize::from(bob)
}

impl Grader {
    /// 4a: Alice's and Bob's single-qubit rotations, circuit by circuit.
    pub fn measurement_bases(&mut self, alice: &[Circuit], bob: &[Circuit]) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("4a");
        let (alice_ref, bob_ref) = fixtures::measurement_bases()?;
        let mut wrong = json!({ "alice": [], "bob": [] });

        for (party, circuits, references, label) in [
            ("alice", alice, &alice_ref, "Alice"),
            ("bob", bob, &bob_ref, "Bob"),
        ] {
            for (j, qc) in circuits.iter().enumerate() {
                if qc.num_qubits > 1 {
                    verdict.say("Los circuitos deben tener 1 qubit");
                }
                if !matches_single(qc, references.get(j))? {
                    debug!(party, j, "basis rotation mismatch");
                    verdict.fail(format!("El circuito {} de {} no es correcto", j, label));
                    if let Some(list) = wrong[party].as_array_mut() {
                        list.push(json!(j));
                    }
                }
            }
            for j in circuits.len()..references.len() {
                debug!(party, j, "basis rotation missing");
                verdict.fail(format!("El circuito {} de {} no es correcto", j, label));
                if let Some(list) = wrong[party].as_array_mut() {
                    list.push(json!(j));
                }
            }
        }

        if verdict.passed() {
            verdict.say(MSG_CORRECT);
        }
        Ok(verdict.with_details(wrong).finish())
    }

    /// 4b: every circuit must implement one of the nine measurement operators, and
    /// operator `3a + b` must be identified exactly as often as the trit pair (a, b).
    pub fn trit_operations(
        &mut self,
        circuits: &[Circuit],
        alice_trits: &[u8],
        bob_trits: &[u8],
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("4b");
        let operators = fixtures::trit_operators()?;

        let mut all_identified = true;
        let mut identified = Vec::new();
        for (j, qc) in circuits.iter().enumerate() {
            let unitary = Operator::from_circuit(&qc.remove_final_measurements())?.matrix;
            let hits: Vec<usize> = operators
                .iter()
                .enumerate()
                .filter(|(_, op)| matches_up_to_phase(op, &unitary))
                .map(|(ind, _)| ind)
                .collect();
            if hits.is_empty() {
                all_identified = false;
                verdict.fail(format!("El circuito {} está incorrecto", j));
                break;
            }
            identified.extend(hits);
        }

        let op_count: Vec<usize> = (0..operators.len())
            .map(|ind| identified.iter().filter(|&&i| i == ind).count())
            .collect();
        let pairs: Vec<usize> = alice_trits
            .iter()
            .zip(bob_trits)
            .map(|(&a, &b)| trit_index(a, b))
            .collect();
        let ideal_count: Vec<usize> = (0..9)
            .map(|ind| pairs.iter().filter(|&&i| i == ind).count())
            .collect();
        let details = json!({ "operator_counts": op_count, "trit_counts": ideal_count });
        debug!(?op_count, ?ideal_count, "trit sampling");

        if op_count != ideal_count {
            verdict.fail("El muestreo sobre los trits elegidos no es correcto");
        } else if all_identified {
            verdict.say(MSG_CORRECT);
        }
        Ok(verdict.with_details(details).finish())
    }

    /// 4c: the key must keep the positions where the trit pair is (1, 0) or (2, 1),
    /// with both bit values reasonably represented.
    pub fn key_distribution(
        &mut self,
        key: &str,
        alice_trits: &[u8],
        bob_trits: &[u8],
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("4c");
        let expected_len = alice_trits
            .iter()
            .zip(bob_trits)
            .filter(|&(&a, &b)| (a == 1 && b == 0) || (a == 2 && b == 1))
            .count();
        let key_len = key.chars().count();
        let threshold = (key_len / 10).max(10);
        let zeros = key.chars().filter(|&c| c == '0').count();
        let ones = key.chars().filter(|&c| c == '1').count();
        debug!(key_len, expected_len, zeros, ones, threshold, "key statistics");

        if zeros < threshold || ones < threshold {
            verdict.fail("La clave no es correcta");
        } else if key_len == expected_len {
            verdict.say("Felicidades, tu clave es segura");
        } else {
            verdict.fail("La longitud de tu clave es incorrecta");
        }
        Ok(verdict
            .with_details(json!({ "key_length": key_len, "expected_length": expected_len }))
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_tolerant_match() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        let u = Operator::from_circuit(&qc).unwrap().matrix;
        let i = Complex64::new(0.0, 1.0);
        let phased = DMatrix::from_fn(4, 4, |r, c| u[(r, c)] * if c == 2 { -i } else { i });
        assert!(matches_up_to_phase(&u, &phased));
        assert!(!matches_up_to_phase(&u, &DMatrix::identity(4, 4)));
    }

    #[test]
    fn trit_pairs_index_base_three() {
        assert_eq!(trit_index(0, 0), 0);
        assert_eq!(trit_index(1, 0), 3);
        assert_eq!(trit_index(2, 1), 7);
    }
}
