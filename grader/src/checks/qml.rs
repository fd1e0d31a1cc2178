use crate::context::Grader;
use crate::error::GradeError;
use crate::tolerance::isclose;
use crate::verdict::Verdict;
use ml::{Svc, classification_report, confusion_matrix};
use nalgebra::DMatrix;
use qsim::Circuit;
use serde_json::json;
use tracing::{debug, warn};

const ALLOWED_GATES: [&str; 4] = ["h", "rz", "cx", "ry"];

/// Data-point pairs and the kernel values a correct swap test reports for them.
const KERNEL_CASES: [([f64; 4], [f64; 4], f64); 5] = [
    ([0.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 0.0], 1.0),
    ([1.0, 1.0, 0.0, 1.0], [1.0, 0.0, 1.0, 0.0], 0.12517680639492335),
    ([1.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 0.0], 0.1441833466772665),
    ([1.0, 1.0, 1.0, 1.0], [1.0, 0.5, 0.0, 0.0], 0.157364964492334),
    ([1.0, 1.0, 1.0, 1.0], [1.0, 1.0, 1.0, 0.9], 0.9846606141390186),
];

impl Grader {
    /// 7a: a 4-qubit variational ansatz with one to four parameters. Depth and gate
    /// set are reported but do not fail the check.
    pub fn ansatz(&mut self, ansatz: impl Fn() -> Result<Circuit, GradeError>) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("7a");
        let qc = ansatz()?;
        if qc.num_qubits != 4 {
            verdict.fail("Tu circuito no tiene 4 qubits.");
        }
        match qc.num_parameters() {
            0 => {
                verdict.fail("Tu circuito no tiene parametros.");
            }
            n if n > 4 => {
                verdict.fail("Tu circuito tiene muchos parametros");
            }
            _ => {}
        }
        let depth = qc.depth();
        if depth >= 20 {
            warn!(depth, "ansatz is deep");
            verdict.say(format!("Tu circuito debe tener una profundidad menor a 20. Tiene {}", depth));
        }
        for op in qc.count_ops().keys() {
            if !ALLOWED_GATES.contains(&op.as_str()) {
                warn!(gate = %op, "gate outside the allowed set");
                verdict.say(format!("Estas usando una puerta no permitida, {}.", op));
            }
        }
        if verdict.passed() {
            verdict.say("Tu circuito es correcto");
        }
        Ok(verdict
            .with_details(json!({
                "num_qubits": qc.num_qubits,
                "num_parameters": qc.num_parameters(),
                "depth": depth,
            }))
            .finish())
    }

    /// 7b: the swap-test kernel estimate on five tabulated data-point pairs.
    pub fn kernel_element(
        &mut self,
        kernel_element: impl Fn(&[f64], &[f64]) -> Result<(Circuit, f64), GradeError>,
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("7b");
        let mut values = Vec::with_capacity(KERNEL_CASES.len());
        for (a, b, expected) in &KERNEL_CASES {
            let (_, value) = kernel_element(a.as_slice(), b.as_slice())?;
            debug!(value, expected, "kernel element");
            values.push(value);
        }
        let all_close = values
            .iter()
            .zip(&KERNEL_CASES)
            .all(|(value, (_, _, expected))| isclose(*value, *expected));
        if all_close {
            verdict.say("El swap-test esta correcto");
        } else {
            verdict.fail("EL swap test no estima la fidelidad");
        }
        Ok(verdict.with_details(json!({ "values": values })).finish())
    }

    /// 7c: an SVM on the precomputed quantum kernel must score above 90% on the test set.
    pub fn classifier(
        &mut self,
        train_kernel: &DMatrix<f64>,
        train_labels: &[i64],
        test_kernel: &DMatrix<f64>,
        test_labels: &[i64],
    ) -> Result<Verdict, GradeError> {
        let mut verdict = Verdict::new("7c");
        let mut svm = Svc::new(1.0);
        svm.fit(train_kernel, train_labels)?;
        let predicted = svm.predict(test_kernel)?;
        let (labels, confusion) = confusion_matrix(test_labels, &predicted);
        let report = classification_report(test_labels, &predicted);
        verdict.say(report.to_string());

        let score = svm.score(test_kernel, test_labels)?;
        debug!(score, "classifier score");
        if score > 0.90 {
            verdict.say("Felicidades! Tu discrimindor alcanza una calidad superior al 90%.");
        } else {
            verdict.fail(
                "La fidelidad es inferior al 90%. Vuelve a los desafios anteriores para intentar mejorar tu discriminador.",
            );
        }
        Ok(verdict
            .with_details(json!({
                "score": score,
                "labels": labels,
                "confusion_matrix": confusion,
                "report": report,
            }))
            .finish())
    }
}
