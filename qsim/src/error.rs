/// A lightweight error enum so callers don't rely on simulator internals.
#[derive(thiserror::Error, Debug)]
pub enum SimError {
    #[error("QASM parse error on line {line}: {message}")]
    Qasm { line: usize, message: String },
    #[error("Invalid qubit index: {0}")]
    Qubit(usize),
    #[error("Invalid classical bit index: {0}")]
    Clbit(usize),
    #[error("Circuit of {qubits} bits exceeds the limit of {max}")]
    Width { qubits: usize, max: usize },
    #[error("Parameter '{0}' has no bound value")]
    UnboundParameter(String),
    #[error("Operation '{0}' is not unitary")]
    NonUnitary(String),
    #[error("Circuit has no measurements")]
    NoMeasurements,
    #[error("Cannot compose: {0}")]
    Compose(String),
    #[error("Invalid layout: {0}")]
    Layout(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Device fixture error: {0}")]
    Device(#[from] serde_json::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}
