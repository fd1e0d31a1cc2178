use crate::ModelError;
use nalgebra::DMatrix;
use std::collections::BTreeMap;
use tracing::debug;

/// Two-class sub-problem of the one-vs-one scheme.
#[derive(Debug, Clone)]
struct BinaryModel {
    positive: i64,
    negative: i64,
    /// Training indices with non-zero multipliers.
    support: Vec<usize>,
    /// alpha_k * y_k for each support index.
    coefficients: Vec<f64>,
    bias: f64,
}

impl BinaryModel {
    fn decision(&self, kernel: &DMatrix<f64>, row: usize) -> f64 {
        self.support
            .iter()
            .zip(&self.coefficients)
            .map(|(&k, c)| c * kernel[(row, k)])
            .sum::<f64>()
            + self.bias
    }
}

/// C-support vector classifier over a precomputed kernel.
#[derive(Debug, Clone)]
pub struct Svc {
    pub c: f64,
    pub tolerance: f64,
    pub max_iter: usize,
    classes: Vec<i64>,
    num_train: usize,
    models: Vec<BinaryModel>,
}

impl Default for Svc {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Svc {
    pub fn new(c: f64) -> Self {
        Svc {
            c,
            tolerance: 1e-3,
            max_iter: 1_000_000,
            classes: Vec::new(),
            num_train: 0,
            models: Vec::new(),
        }
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Fits on the square training kernel.
    pub fn fit(&mut self, kernel: &DMatrix<f64>, labels: &[i64]) -> Result<(), ModelError> {
        let n = labels.len();
        if kernel.shape() != (n, n) {
            return Err(ModelError::KernelShape {
                rows: kernel.nrows(),
                cols: kernel.ncols(),
                expected_rows: n,
                expected_cols: n,
            });
        }
        let mut classes: Vec<i64> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(ModelError::TooFewClasses(classes.len()));
        }

        let mut models = Vec::new();
        for (a, &positive) in classes.iter().enumerate() {
            for &negative in &classes[a + 1..] {
                let indices: Vec<usize> = (0..n)
                    .filter(|&i| labels[i] == positive || labels[i] == negative)
                    .collect();
                let y: Vec<f64> = indices
                    .iter()
                    .map(|&i| if labels[i] == positive { 1.0 } else { -1.0 })
                    .collect();
                let sub = DMatrix::from_fn(indices.len(), indices.len(), |r, c| {
                    kernel[(indices[r], indices[c])]
                });
                let (alpha, bias) = self.solve(&sub, &y);
                let (support, coefficients): (Vec<usize>, Vec<f64>) = alpha
                    .iter()
                    .enumerate()
                    .filter(|&(_, &a)| a > 0.0)
                    .map(|(k, &a)| (indices[k], a * y[k]))
                    .unzip();
                debug!(positive, negative, support = support.len(), bias, "Fitted binary classifier");
                models.push(BinaryModel {
                    positive,
                    negative,
                    support,
                    coefficients,
                    bias,
                });
            }
        }
        self.classes = classes;
        self.num_train = n;
        self.models = models;
        Ok(())
    }

    /// SMO with maximal-violating-pair selection on the dual
    /// `min 1/2 a^T Q a - e^T a`, `Q_ij = y_i y_j K_ij`, `0 <= a <= C`, `y^T a = 0`.
    fn solve(&self, kernel: &DMatrix<f64>, y: &[f64]) -> (Vec<f64>, f64) {
        let n = y.len();
        let c = self.c;
        let mut alpha = vec![0.0; n];
        let mut grad = vec![-1.0; n];
        let in_up = |a: f64, y: f64| (y > 0.0 && a < c) || (y < 0.0 && a > 0.0);
        let in_low = |a: f64, y: f64| (y > 0.0 && a > 0.0) || (y < 0.0 && a < c);

        for iteration in 0..self.max_iter {
            let mut i = None;
            let mut j = None;
            let mut max_up = f64::NEG_INFINITY;
            let mut min_low = f64::INFINITY;
            for k in 0..n {
                let f = -y[k] * grad[k];
                if in_up(alpha[k], y[k]) && f > max_up {
                    max_up = f;
                    i = Some(k);
                }
                if in_low(alpha[k], y[k]) && f < min_low {
                    min_low = f;
                    j = Some(k);
                }
            }
            let (Some(i), Some(j)) = (i, j) else { break };
            if max_up - min_low < self.tolerance {
                debug!(iteration, "SMO converged");
                break;
            }

            let eta = (kernel[(i, i)] + kernel[(j, j)] - 2.0 * kernel[(i, j)]).max(1e-12);
            let mut step = (max_up - min_low) / eta;
            step = step.min(if y[i] > 0.0 { c - alpha[i] } else { alpha[i] });
            step = step.min(if y[j] > 0.0 { alpha[j] } else { c - alpha[j] });

            alpha[i] += y[i] * step;
            alpha[j] -= y[j] * step;
            for k in 0..n {
                grad[k] += y[k] * step * (kernel[(k, i)] - kernel[(k, j)]);
            }
        }

        let free: Vec<f64> = (0..n)
            .filter(|&k| alpha[k] > 0.0 && alpha[k] < c)
            .map(|k| -y[k] * grad[k])
            .collect();
        let bias = if free.is_empty() {
            let up = (0..n)
                .filter(|&k| in_up(alpha[k], y[k]))
                .map(|k| -y[k] * grad[k])
                .fold(f64::NEG_INFINITY, f64::max);
            let low = (0..n)
                .filter(|&k| in_low(alpha[k], y[k]))
                .map(|k| -y[k] * grad[k])
                .fold(f64::INFINITY, f64::min);
            match (up.is_finite(), low.is_finite()) {
                (true, true) => (up + low) / 2.0,
                (true, false) => up,
                (false, true) => low,
                (false, false) => 0.0,
            }
        } else {
            free.iter().sum::<f64>() / free.len() as f64
        };
        (alpha, bias)
    }

    /// Predicts from the `n_test x n_train` kernel against the training points.
    pub fn predict(&self, kernel: &DMatrix<f64>) -> Result<Vec<i64>, ModelError> {
        if self.models.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if kernel.ncols() != self.num_train {
            return Err(ModelError::KernelShape {
                rows: kernel.nrows(),
                cols: kernel.ncols(),
                expected_rows: kernel.nrows(),
                expected_cols: self.num_train,
            });
        }
        Ok((0..kernel.nrows())
            .map(|row| {
                let mut votes: BTreeMap<i64, usize> = BTreeMap::new();
                for model in &self.models {
                    let winner = if model.decision(kernel, row) > 0.0 {
                        model.positive
                    } else {
                        model.negative
                    };
                    *votes.entry(winner).or_insert(0) += 1;
                }
                // ties go to the smallest label
                votes
                    .iter()
                    .fold((self.classes[0], 0), |best, (&label, &count)| {
                        if count > best.1 { (label, count) } else { best }
                    })
                    .0
            })
            .collect())
    }

    /// Mean accuracy on the given test kernel and labels.
    pub fn score(&self, kernel: &DMatrix<f64>, labels: &[i64]) -> Result<f64, ModelError> {
        let predicted = self.predict(kernel)?;
        if predicted.len() != labels.len() {
            return Err(ModelError::LabelLength(predicted.len(), labels.len()));
        }
        Ok(crate::metrics::accuracy(labels, &predicted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_kernel(rows: &[[f64; 2]], cols: &[[f64; 2]]) -> DMatrix<f64> {
        DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
            rows[i][0] * cols[j][0] + rows[i][1] * cols[j][1]
        })
    }

    #[test]
    fn test_separable_two_class_problem() {
        let train = [[2.0, 2.0], [3.0, 1.5], [2.5, 3.0], [-2.0, -1.0], [-3.0, -2.5], [-1.5, -2.0]];
        let labels = [1, 1, 1, 0, 0, 0];
        let mut svc = Svc::default();
        svc.fit(&linear_kernel(&train, &train), &labels).unwrap();
        assert_eq!(svc.classes(), &[0, 1]);

        let test = [[1.0, 1.0], [-1.0, -1.5], [4.0, 0.5]];
        let predicted = svc.predict(&linear_kernel(&test, &train)).unwrap();
        assert_eq!(predicted, vec![1, 0, 1]);
        let score = svc.score(&linear_kernel(&train, &train), &labels).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_multiclass_one_vs_one() {
        let train = [
            [5.0, 0.0], [6.0, 0.5], [5.5, -0.5],
            [0.0, 5.0], [0.5, 6.0], [-0.5, 5.5],
            [-5.0, -5.0], [-6.0, -5.5], [-5.5, -6.0],
        ];
        let labels = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        // rbf keeps three clusters separable
        let rbf = |a: &[f64; 2], b: &[f64; 2]| (-((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)) / 8.0).exp();
        let gram = DMatrix::from_fn(9, 9, |i, j| rbf(&train[i], &train[j]));
        let mut svc = Svc::new(10.0);
        svc.fit(&gram, &labels).unwrap();

        let test = [[5.2, 0.1], [0.2, 5.3], [-5.1, -5.4]];
        let k = DMatrix::from_fn(3, 9, |i, j| rbf(&test[i], &train[j]));
        assert_eq!(svc.predict(&k).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_shape_errors() {
        let mut svc = Svc::default();
        assert!(matches!(svc.predict(&DMatrix::zeros(1, 1)), Err(ModelError::NotFitted)));
        assert!(matches!(
            svc.fit(&DMatrix::zeros(2, 3), &[0, 1]),
            Err(ModelError::KernelShape { .. })
        ));
        assert!(matches!(
            svc.fit(&DMatrix::identity(2, 2), &[1, 1]),
            Err(ModelError::TooFewClasses(1))
        ));
    }
}
