pub mod checks;
pub mod config;
pub mod context;
pub mod error;
pub mod fixtures;
pub mod npy;
pub mod solutions;
pub mod tolerance;
pub mod verdict;

pub use checks::{CHECKS, CheckInfo};
pub use config::GraderConfig;
pub use context::Grader;
pub use error::GradeError;
pub use verdict::{Outcome, Verdict};
