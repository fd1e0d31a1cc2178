pub mod circuit;
pub mod density;
pub mod device;
pub mod error;
pub mod gate;
pub mod noise;
pub mod operator;
pub mod parser;
pub mod random;
pub mod sampler;
pub mod state;
pub mod stats;
pub mod transpile;

// Re-export key components for easier access from the other workspace crates.
pub use circuit::Circuit;
pub use density::DensityMatrix;
pub use device::{CouplingMap, Device};
pub use error::SimError;
pub use gate::{Angle, Condition, Gate, GateMatrix, Pauli};
pub use noise::{NoiseModel, QuantumError, ReadoutError, depolarizing_error};
pub use operator::{Operator, process_fidelity};
pub use parser::parse_qasm;
pub use random::random_circuit;
pub use sampler::{Backend, Counts, Distribution, Estimator, Sampler};
pub use state::StateVector;
pub use stats::hellinger_distance;
pub use transpile::{Transpiler, cancel_redundant_gates};
