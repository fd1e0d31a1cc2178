use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum GradeError {
    #[error("Simulation failed: {0}")]
    Simulation(#[from] qsim::SimError),
    #[error("Invalid operator: {0}")]
    Pauli(#[from] hamiltonian::PauliError),
    #[error("Classifier failed: {0}")]
    Model(#[from] ml::ModelError),
    #[error("Cannot read {path}: {source}")]
    Fixture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed fixture {name}: {source}")]
    FixtureFormat {
        name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Malformed .npy data: {0}")]
    Npy(String),
    #[error("Expected shape {expected:?}, found {found:?}")]
    Shape { expected: Vec<usize>, found: Vec<usize> },
    #[error("Unknown check '{0}'")]
    UnknownCheck(String),
    #[error("Check '{0}' does not grade a single circuit")]
    NotCircuitInput(String),
}
