use crate::error::GradeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Seed for every stochastic check.
    pub seed: u64,
    /// Shots for ideal sampling.
    pub shots: u32,
    /// Shots per noisy device run.
    pub noisy_shots: u32,
    /// Noisy device runs compared in the GHZ-on-device check.
    pub noisy_trials: usize,
    /// Directory holding the `.npy` data files.
    pub data_dir: PathBuf,
}

impl Default for GraderConfig {
    fn default() -> Self {
        GraderConfig {
            seed: 0,
            shots: 8192,
            noisy_shots: 1024,
            noisy_trials: 100,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl GraderConfig {
    /// Reads a JSON config; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, GradeError> {
        let text = std::fs::read_to_string(path).map_err(|source| GradeError::Fixture {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| GradeError::FixtureFormat {
            name: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "seed": 7, "noisy_trials": 5 }"#).unwrap();
        let config = GraderConfig::from_file(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.noisy_trials, 5);
        assert_eq!(config.shots, 8192);
    }

    #[test]
    fn missing_file_is_a_fixture_error() {
        let err = GraderConfig::from_file(Path::new("/nonexistent/grader.json")).unwrap_err();
        assert!(matches!(err, GradeError::Fixture { .. }));
    }
}
