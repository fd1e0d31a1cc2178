use crate::context::Grader;
use crate::error::GradeError;
use crate::verdict::Verdict;
use qsim::{
    Backend, Circuit, Counts, Device, Sampler, StateVector, Transpiler, cancel_redundant_gates, hellinger_distance,
};
use serde_json::json;
use tracing::debug;

const NUM_QUBITS: usize = 4;
const MSG_QUBITS: &str = "El circuito no tiene 4 qubits";
const MSG_STATE: &str = "El circuito no prepara un estado GHZ";
const MSG_SUCCESS: &str = "Felicidades, tu solución es correcta!";

/// `h(0)` followed by a chain of `cx(j, j + 1)`.
pub fn ghz_reference(num_qubits: usize) -> Circuit {
    let mut qc = Circuit::new(num_qubits, 0);
    qc.h(0);
    for j in 0..num_qubits.saturating_sub(1) {
        qc.cx(j, j + 1);
    }
    qc
}

/// GHZ preparation that routes through the swaps a linear mapping needs on Burlington.
fn device_reference() -> Circuit {
    let mut qc = Circuit::new(NUM_QUBITS, 0);
    qc.h(0);
    for j in 0..NUM_QUBITS - 2 {
        qc.cx(j, j + 1);
    }
    qc.cx(2, 1).cx(1, 2).cx(2, 1).cx(1, 3);
    qc
}

fn same_state(reference: &Circuit, candidate: &Circuit) -> Result<bool, GradeError> {
    let expected = StateVector::from_circuit(reference)?;
    let actual = StateVector::from_circuit(candidate)?;
    let distance = expected.distance(&actual);
    debug!(distance, "compared GHZ states");
    Ok(distance <= crate::tolerance::ATOL)
}

fn measured_on(device: &Device, circuit: &Circuit) -> Result<Circuit, GradeError> {
    let mut measured = circuit.clone();
    measured.measure_all();
    Ok(Transpiler::for_device(device).run(&measured)?)
}

impl Grader {
    /// 1a: four-qubit GHZ preparation of depth 3, measured after redundant gates
    /// are cancelled.
    pub fn ghz_state(&mut self, candidate: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("1a");
        if candidate.num_qubits != NUM_QUBITS {
            verdict.fail(MSG_QUBITS);
            return Ok(verdict.finish());
        }
        if !same_state(&ghz_reference(NUM_QUBITS), candidate)? {
            verdict.fail(MSG_STATE);
            return Ok(verdict.finish());
        }
        let depth = cancel_redundant_gates(candidate)?.depth();
        debug!(raw_depth = candidate.depth(), depth, "GHZ depth");
        if depth != 3 {
            verdict.fail("La profundidad del circuito es muy grande");
        } else {
            verdict.say(MSG_SUCCESS);
        }
        Ok(verdict.with_details(json!({ "depth": depth })).finish())
    }

    /// 1b: GHZ preparation on the noisy Burlington device, compared against a
    /// swap-heavy reference by summed Hellinger distance to the ideal counts.
    pub fn ghz_on_device(&mut self, candidate: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("1b");
        let device = Device::burlington()?;
        let reference = device_reference();

        if candidate.num_qubits != NUM_QUBITS {
            verdict.fail(MSG_QUBITS);
            return Ok(verdict.finish());
        }
        if !same_state(&reference, candidate)? {
            verdict.fail(MSG_STATE);
            return Ok(verdict.finish());
        }
        let candidate_mapped = measured_on(&device, candidate)?;
        debug!(depth = candidate_mapped.depth(), "candidate mapped onto device");
        if candidate_mapped.depth() != 5 {
            verdict.fail("La profundidad del circuito mapeado al circuito es muy grande");
            return Ok(verdict
                .with_details(json!({ "mapped_depth": candidate_mapped.depth() }))
                .finish());
        }
        let reference_mapped = measured_on(&device, &reference)?;

        let ideal: Counts = [("0000".to_string(), 500), ("1111".to_string(), 500)].into();
        let sampler = Sampler::noisy(device.noise_model());
        let shots = self.config.noisy_shots;
        let (mut reference_error, mut candidate_error) = (0.0, 0.0);
        for _ in 0..self.config.noisy_trials {
            let counts_candidate = sampler.run(&candidate_mapped, shots, &mut self.rng)?;
            let counts_reference = sampler.run(&reference_mapped, shots, &mut self.rng)?;
            reference_error += hellinger_distance(&ideal, &counts_reference);
            candidate_error += hellinger_distance(&ideal, &counts_candidate);
        }
        debug!(candidate_error, reference_error, "summed device errors");

        if candidate_error < reference_error {
            verdict.say(MSG_SUCCESS);
        } else {
            verdict.fail("El error de tu circuito es mayor!");
        }
        Ok(verdict
            .with_details(json!({
                "mapped_depth": candidate_mapped.depth(),
                "candidate_error": candidate_error,
                "reference_error": reference_error,
                "trials": self.config.noisy_trials,
            }))
            .finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_and_tree_prepare_the_same_state() {
        let mut tree = Circuit::new(4, 0);
        tree.h(0).cx(0, 1).cx(0, 2).cx(1, 3);
        assert!(same_state(&ghz_reference(4), &tree).unwrap());
        assert!(same_state(&device_reference(), &tree).unwrap());
        assert_eq!(tree.depth(), 3);
        assert_eq!(ghz_reference(4).depth(), 4);
    }
}
