use serde::Serialize;
use std::fmt;

/// Fraction of positions where the prediction equals the label.
pub fn accuracy(truth: &[i64], predicted: &[i64]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let hits = truth.iter().zip(predicted).filter(|(a, b)| a == b).count();
    hits as f64 / truth.len() as f64
}

fn labels_of(truth: &[i64], predicted: &[i64]) -> Vec<i64> {
    let mut labels: Vec<i64> = truth.iter().chain(predicted).copied().collect();
    labels.sort_unstable();
    labels.dedup();
    labels
}

/// Rows are true classes, columns predicted classes, both in ascending label order.
pub fn confusion_matrix(truth: &[i64], predicted: &[i64]) -> (Vec<i64>, Vec<Vec<usize>>) {
    let labels = labels_of(truth, predicted);
    let mut matrix = vec![vec![0usize; labels.len()]; labels.len()];
    for (t, p) in truth.iter().zip(predicted) {
        if let (Ok(r), Ok(c)) = (labels.binary_search(t), labels.binary_search(p)) {
            matrix[r][c] += 1;
        }
    }
    (labels, matrix)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Per-class precision, recall, f1 and support; zero divisions count as 0.
pub fn classification_report(truth: &[i64], predicted: &[i64]) -> ClassificationReport {
    let (labels, matrix) = confusion_matrix(truth, predicted);
    let total = truth.len();
    let classes: Vec<ClassMetrics> = labels
        .iter()
        .enumerate()
        .map(|(k, label)| {
            let tp = matrix[k][k];
            let support: usize = matrix[k].iter().sum();
            let predicted_k: usize = matrix.iter().map(|row| row[k]).sum();
            let precision = ratio(tp, predicted_k);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                label: label.to_string(),
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let n = classes.len().max(1) as f64;
    let average = |label: &str, weight: &dyn Fn(&ClassMetrics) -> f64, norm: f64| ClassMetrics {
        label: label.to_string(),
        precision: classes.iter().map(|c| weight(c) * c.precision).sum::<f64>() / norm,
        recall: classes.iter().map(|c| weight(c) * c.recall).sum::<f64>() / norm,
        f1: classes.iter().map(|c| weight(c) * c.f1).sum::<f64>() / norm,
        support: total,
    };
    let macro_avg = average("macro avg", &|_| 1.0, n);
    let weighted_avg = average("weighted avg", &|c| c.support as f64, total.max(1) as f64);

    ClassificationReport {
        accuracy: accuracy(truth, predicted),
        classes,
        macro_avg,
        weighted_avg,
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                m.label, m.precision, m.recall, m.f1, m.support
            )
        };
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            row(f, class)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, &self.macro_avg)?;
        row(f, &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_accuracy_and_confusion() {
        let truth = [0, 0, 1, 1, 1, 2];
        let predicted = [0, 1, 1, 1, 0, 2];
        assert!((accuracy(&truth, &predicted) - 4.0 / 6.0).abs() < EPSILON);
        let (labels, matrix) = confusion_matrix(&truth, &predicted);
        assert_eq!(labels, vec![0, 1, 2]);
        assert_eq!(matrix, vec![vec![1, 1, 0], vec![1, 2, 0], vec![0, 0, 1]]);
    }

    #[test]
    fn test_report_values() {
        let truth = [0, 0, 1, 1, 1, 2];
        let predicted = [0, 1, 1, 1, 0, 2];
        let report = classification_report(&truth, &predicted);
        let one = &report.classes[1];
        assert!((one.precision - 2.0 / 3.0).abs() < EPSILON);
        assert!((one.recall - 2.0 / 3.0).abs() < EPSILON);
        assert_eq!(one.support, 3);
        assert!((report.classes[2].f1 - 1.0).abs() < EPSILON);
        // macro precision: (0.5 + 2/3 + 1) / 3
        assert!((report.macro_avg.precision - (0.5 + 2.0 / 3.0 + 1.0) / 3.0).abs() < EPSILON);

        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("0.67"));
    }

    #[test]
    fn test_empty_class_prediction_counts_zero() {
        let report = classification_report(&[0, 1], &[0, 0]);
        assert_eq!(report.classes[1].precision, 0.0);
        assert_eq!(report.classes[1].f1, 0.0);
    }
}
