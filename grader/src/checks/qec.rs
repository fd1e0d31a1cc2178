use crate::context::Grader;
use crate::error::GradeError;
use crate::tolerance::{ATOL, isclose_with};
use crate::verdict::Verdict;
use qsim::{Circuit, Device, Sampler, Transpiler};
use serde_json::json;
use std::f64::consts::PI;
use tracing::debug;

const MAX_SWAPS: usize = 40;
const SHOR_CX: usize = 32;

/// Prepares ry(theta) on qubit 0, runs the correction circuit on qubits 0..5 with
/// its syndrome written to clbits 0 and 1, then reads the three data qubits.
fn bit_flip_harness(theta: f64, candidate: &Circuit) -> Result<Circuit, GradeError> {
    let mut qc = Circuit::new(5, 3);
    qc.ry(theta, 0);
    let mut qc = qc.compose(candidate, Some(&[0, 1, 2, 3, 4][..]), Some(&[0, 1][..]))?;
    for q in 0..3 {
        qc.measure(q, q);
    }
    Ok(qc)
}

impl Grader {
    /// 9a: the three-qubit bit-flip code must return |000> and |111> with the
    /// populations ry(theta) put on qubit 0, for theta in {0, pi/2, pi}.
    pub fn bit_flip_code(&mut self, candidate: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("9a");
        let sampler = Sampler::ideal();
        let close = |p: f64, target: f64| isclose_with(p, target, 0.1, ATOL);

        let mut populations = Vec::new();
        let mut correct = true;
        for (theta, p0, p7) in [(0.0, Some(1.0), None), (PI / 2.0, Some(0.5), Some(0.5)), (PI, None, Some(1.0))] {
            let dist = self.outcome_probabilities(&sampler, &bit_flip_harness(theta, candidate)?)?;
            let got0 = dist.get(&0).copied().unwrap_or(0.0);
            let got7 = dist.get(&7).copied().unwrap_or(0.0);
            debug!(theta, got0, got7, "bit-flip populations");
            correct &= p0.is_none_or(|p| close(got0, p)) && p7.is_none_or(|p| close(got7, p));
            populations.push(json!({ "theta": theta, "p0": got0, "p7": got7 }));
        }

        if correct {
            verdict.say("Felicidades, tu código corrige amplitud");
        } else {
            verdict.fail("Tu código esta no corrige los errores");
        }
        Ok(verdict.with_details(json!(populations)).finish())
    }

    /// 9b: the Shor-code syndrome circuit must use exactly 32 `cx`.
    pub fn shor_code_cx(&mut self, candidate: &Circuit) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("9b");
        let cx = candidate.count_ops().get("cx").copied().unwrap_or(0);
        if cx == SHOR_CX {
            verdict.say("Felicidades, tu circuito tiene 32 cx");
        } else {
            verdict.fail("Tu circuito tiene muchas cx");
        }
        Ok(verdict.with_details(json!({ "cx": cx })).finish())
    }

    /// 9c: mapped onto Rochester from the given initial layout, the Shor code must
    /// need fewer than 40 swaps.
    pub fn shor_code_layout(
        &mut self,
        shor_code: impl Fn() -> Result<Circuit, GradeError>,
        layout: &[usize],
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("9c");
        let device = Device::rochester()?;
        let circuit = shor_code()?.remove_barriers();
        let mapped = Transpiler::new()
            .with_coupling_map(device.coupling())
            .with_basis(&["h", "u", "cx", "swap"])
            .with_layout(layout.to_vec())
            .run(&circuit)?;
        let swaps = mapped.count_ops().get("swap").copied().unwrap_or(0);
        debug!(swaps, "mapped onto rochester");
        if swaps < MAX_SWAPS {
            verdict.say("Felicidades, tu mapeo emplea menos de 40 swaps");
        } else {
            verdict.fail("Tu mapeo emplea muchas swaps");
        }
        Ok(verdict.with_details(json!({ "swaps": swaps })).finish())
    }
}
