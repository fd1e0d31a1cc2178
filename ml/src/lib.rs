pub mod kernel;
pub mod metrics;
pub mod svm;

pub use kernel::{fidelity_kernel, kernel_matrix, zz_feature_map};
pub use metrics::{ClassMetrics, ClassificationReport, accuracy, classification_report, confusion_matrix};
pub use svm::Svc;

#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    #[error("Kernel matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    KernelShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("Label vectors differ in length: {0} vs {1}")]
    LabelLength(usize, usize),
    #[error("Need at least two classes to fit, found {0}")]
    TooFewClasses(usize),
    #[error("Model has not been fitted")]
    NotFitted,
    #[error("Data points have dimensions {0} and {1}")]
    Dimension(usize, usize),
    #[error(transparent)]
    Simulation(#[from] qsim::SimError),
}
