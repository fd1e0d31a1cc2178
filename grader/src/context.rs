use crate::config::GraderConfig;
use crate::error::GradeError;
use qsim::{Backend, Circuit, SimError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::debug;

/// Owns the configuration and the seeded RNG every stochastic check draws from.
#[derive(Debug, Clone)]
pub struct Grader {
    pub config: GraderConfig,
    pub(crate) rng: StdRng,
}

impl Default for Grader {
    fn default() -> Self {
        Self::new(GraderConfig::default())
    }
}

impl Grader {
    pub fn new(config: GraderConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Grader { config, rng }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Outcome probabilities keyed by classical-register value: exact when every
    /// measurement is final, otherwise estimated from `config.shots` trajectories.
    pub(crate) fn outcome_probabilities(
        &mut self,
        sampler: &qsim::Sampler,
        circuit: &Circuit,
    ) -> Result<BTreeMap<u64, f64>, GradeError> {
        match sampler.quasi_dist(circuit) {
            Ok(dist) => Ok(dist),
            Err(SimError::Unsupported(reason)) => {
                debug!(%reason, shots = self.config.shots, "falling back to sampling");
                let shots = self.config.shots;
                let counts = sampler.run(circuit, shots, &mut self.rng)?;
                let mut dist = BTreeMap::new();
                for (key, count) in counts {
                    let value = u64::from_str_radix(&key, 2)
                        .map_err(|e| SimError::Internal(e.to_string()))?;
                    dist.insert(value, f64::from(count) / f64::from(shots));
                }
                Ok(dist)
            }
            Err(e) => Err(e.into()),
        }
    }
}
