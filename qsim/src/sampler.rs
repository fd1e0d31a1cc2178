use crate::circuit::{Circuit, MAX_STATE_QUBITS};
use crate::density::DensityMatrix;
use crate::error::SimError;
use crate::gate::Gate;
use crate::noise::NoiseModel;
use crate::state::StateVector;
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use rand::distributions::{Distribution as _, WeightedIndex};
use std::collections::BTreeMap;
use tracing::debug;

/// Measurement counts keyed by bitstring, classical bit 0 rightmost.
pub type Counts = BTreeMap<String, u32>;

pub fn bitstring(value: u64, width: usize) -> String {
    format!("{:0width$b}", value, width = width)
}

/// Exact outcome probabilities over the classical register.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    pub num_clbits: usize,
    pub probabilities: BTreeMap<u64, f64>,
}

impl Distribution {
    pub fn sample(&self, shots: u32, rng: &mut impl Rng) -> Result<Counts, SimError> {
        let outcomes: Vec<(&u64, &f64)> = self.probabilities.iter().collect();
        let weights: Vec<f64> = outcomes.iter().map(|(_, p)| p.max(0.0)).collect();
        let dist = WeightedIndex::new(&weights).map_err(|e| SimError::Internal(e.to_string()))?;
        let mut counts = Counts::new();
        for _ in 0..shots {
            let (value, _) = outcomes[dist.sample(rng)];
            *counts.entry(bitstring(*value, self.num_clbits)).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Most probable outcome; ties go to the smallest value.
    pub fn most_likely(&self) -> Option<u64> {
        self.probabilities
            .iter()
            .fold(None, |best: Option<(u64, f64)>, (&v, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((v, p)),
            })
            .map(|(v, _)| v)
    }

    fn with_readout(self, flips: impl Fn(bool) -> f64, clbits: &[usize]) -> Distribution {
        let mut probabilities = self.probabilities;
        for &c in clbits {
            let mut next = BTreeMap::new();
            for (value, p) in probabilities {
                let bit = (value >> c) & 1 == 1;
                let flip = flips(bit);
                *next.entry(value).or_insert(0.0) += p * (1.0 - flip);
                if flip > 0.0 {
                    *next.entry(value ^ (1 << c)).or_insert(0.0) += p * flip;
                }
            }
            probabilities = next;
        }
        Distribution {
            num_clbits: self.num_clbits,
            probabilities,
        }
    }
}

/// Anything that can execute a circuit and return counts.
pub trait Backend {
    fn run(&self, circuit: &Circuit, shots: u32, rng: &mut impl Rng) -> Result<Counts, SimError>;
}

/// Shot sampler, ideal or with a noise model.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    noise: Option<NoiseModel>,
}

impl Sampler {
    pub fn ideal() -> Self {
        Self { noise: None }
    }

    pub fn noisy(noise: NoiseModel) -> Self {
        Self { noise: Some(noise) }
    }

    pub fn noise(&self) -> Option<&NoiseModel> {
        self.noise.as_ref()
    }

    /// Exact outcome distribution for circuits whose measurements are all final.
    pub fn distribution(&self, circuit: &Circuit) -> Result<Distribution, SimError> {
        circuit.validate_width(MAX_STATE_QUBITS)?;
        let (body, measurements) =
            split_final_measurements(circuit).ok_or_else(|| {
                SimError::Unsupported("mid-circuit measurement in exact sampling".into())
            })?;
        if measurements.is_empty() {
            return Err(SimError::NoMeasurements);
        }
        let probabilities = match &self.noise {
            None => StateVector::from_circuit(&body)?.probabilities(),
            Some(noise) => DensityMatrix::from_circuit(&body, Some(noise))?.probabilities(),
        };
        let mut outcomes = BTreeMap::new();
        for (index, p) in probabilities.into_iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            let value = measurements.iter().fold(0u64, |acc, &(q, c)| {
                if (index >> q) & 1 == 1 { acc | (1 << c) } else { acc }
            });
            *outcomes.entry(value).or_insert(0.0) += p;
        }
        let dist = Distribution {
            num_clbits: circuit.num_clbits,
            probabilities: outcomes,
        };
        Ok(match self.noise.as_ref().and_then(|n| n.readout()) {
            Some(readout) => {
                let mut clbits: Vec<usize> = measurements.iter().map(|&(_, c)| c).collect();
                clbits.sort_unstable();
                clbits.dedup();
                dist.with_readout(|bit| readout.flip_probability(bit), &clbits)
            }
            None => dist,
        })
    }

    /// Integer-keyed outcome probabilities.
    pub fn quasi_dist(&self, circuit: &Circuit) -> Result<BTreeMap<u64, f64>, SimError> {
        Ok(self.distribution(circuit)?.probabilities)
    }

    /// One shot of a circuit with mid-circuit measurements, resets or conditions.
    /// Gate errors are unravelled by sampling one Pauli term per noisy instruction.
    fn trajectory(&self, circuit: &Circuit, rng: &mut impl Rng) -> Result<u64, SimError> {
        let mut state = StateVector::new(circuit.num_qubits);
        let mut register = vec![false; circuit.num_clbits];
        for gate in &circuit.gates {
            self.step(&mut state, &mut register, gate, rng)?;
        }
        Ok(register
            .iter()
            .enumerate()
            .fold(0u64, |acc, (c, &bit)| if bit { acc | (1 << c) } else { acc }))
    }

    fn step(
        &self,
        state: &mut StateVector,
        register: &mut [bool],
        gate: &Gate,
        rng: &mut impl Rng,
    ) -> Result<(), SimError> {
        match gate {
            Gate::Measure(q, c) => {
                let mut bit = state.measure_qubit(*q, rng);
                if let Some(readout) = self.noise.as_ref().and_then(|n| n.readout()) {
                    if rng.r#gen::<f64>() < readout.flip_probability(bit) {
                        bit = !bit;
                    }
                }
                register[*c] = bit;
            }
            Gate::Reset(q) => state.reset_qubit(*q, rng),
            Gate::IfValue(condition, inner) => {
                if condition.holds(register) {
                    self.step(state, register, inner, rng)?;
                }
            }
            _ => {
                state.apply_gate(gate)?;
                if let Some(error) = self.noise.as_ref().and_then(|n| n.error_for(gate)) {
                    let weights: Vec<f64> = error.terms.iter().map(|(p, _)| *p).collect();
                    let pick = WeightedIndex::new(&weights)
                        .map_err(|e| SimError::Internal(e.to_string()))?
                        .sample(rng);
                    for (pauli, q) in error.terms[pick].1.iter().zip(gate.qubits()) {
                        state.apply_single_qubit_gate(&pauli.matrix(), q);
                    }
                }
            }
        }
        Ok(())
    }
}

impl Backend for Sampler {
    fn run(&self, circuit: &Circuit, shots: u32, rng: &mut impl Rng) -> Result<Counts, SimError> {
        circuit.validate_width(MAX_STATE_QUBITS)?;
        if !circuit.gates.iter().any(|g| matches!(g, Gate::Measure(..))) {
            return Err(SimError::NoMeasurements);
        }
        if split_final_measurements(circuit).is_some() {
            debug!(shots, "sampling from exact distribution");
            return self.distribution(circuit)?.sample(shots, rng);
        }
        debug!(shots, "sampling per-shot trajectories");
        let mut counts = Counts::new();
        for _ in 0..shots {
            let value = self.trajectory(circuit, rng)?;
            *counts.entry(bitstring(value, circuit.num_clbits)).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

/// Splits off final measurements: returns the measurement-free body and the
/// (qubit, clbit) pairs, or `None` if anything non-unitary stays in the body.
fn split_final_measurements(circuit: &Circuit) -> Option<(Circuit, Vec<(usize, usize)>)> {
    let body = circuit.remove_final_measurements();
    if body.has_non_unitary() {
        return None;
    }
    let measurements = circuit
        .gates
        .iter()
        .filter_map(|g| match g {
            Gate::Measure(q, c) => Some((*q, *c)),
            _ => None,
        })
        .collect();
    Some((body, measurements))
}

/// Expectation values of observables, exact or under a noise model.
#[derive(Debug, Clone, Default)]
pub struct Estimator {
    noise: Option<NoiseModel>,
}

impl Estimator {
    pub fn ideal() -> Self {
        Self { noise: None }
    }

    pub fn noisy(noise: NoiseModel) -> Self {
        Self { noise: Some(noise) }
    }

    pub fn run(&self, circuit: &Circuit, observable: &DMatrix<Complex64>) -> Result<f64, SimError> {
        let value = match &self.noise {
            None => StateVector::from_circuit(circuit)?.expectation(observable)?,
            Some(noise) => DensityMatrix::from_circuit(circuit, Some(noise))?.expectation(observable)?,
        };
        Ok(value.re)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{ReadoutError, depolarizing_error};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const EPSILON: f64 = 1e-9;

    fn bell_measured() -> Circuit {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1).measure_all();
        qc
    }

    #[test]
    fn test_exact_bell_distribution() {
        let dist = Sampler::ideal().distribution(&bell_measured()).unwrap();
        assert_eq!(dist.probabilities.len(), 2);
        assert!((dist.probabilities[&0] - 0.5).abs() < EPSILON);
        assert!((dist.probabilities[&3] - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_counts_keys_put_clbit_zero_rightmost() {
        let mut qc = Circuit::new(2, 2);
        qc.x(0).measure(0, 0).measure(1, 1);
        let mut rng = StdRng::seed_from_u64(0);
        let counts = Sampler::ideal().run(&qc, 10, &mut rng).unwrap();
        assert_eq!(counts.get("01"), Some(&10));
    }

    #[test]
    fn test_conditional_correction_runs_per_shot() {
        // measure |1>, then undo it with a classically controlled X
        let mut qc = Circuit::new(1, 2);
        qc.x(0)
            .measure(0, 0)
            .if_value(&[0], 1, Gate::X(0))
            .measure(0, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let counts = Sampler::ideal().run(&qc, 50, &mut rng).unwrap();
        assert_eq!(counts.get("01"), Some(&50));
    }

    #[test]
    fn test_readout_error_spreads_distribution() {
        let mut noise = NoiseModel::new();
        noise.add_readout_error(ReadoutError::symmetric(0.1));
        let mut qc = Circuit::new(1, 1);
        qc.measure(0, 0);
        let dist = Sampler::noisy(noise).distribution(&qc).unwrap();
        assert!((dist.probabilities[&0] - 0.9).abs() < EPSILON);
        assert!((dist.probabilities[&1] - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_no_measurements_is_an_error() {
        let mut qc = Circuit::new(1, 0);
        qc.h(0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Sampler::ideal().run(&qc, 1, &mut rng),
            Err(SimError::NoMeasurements)
        ));
    }

    #[test]
    fn test_noisy_estimator_shrinks_expectation() {
        let z = DMatrix::from_row_slice(
            2,
            2,
            &[
                Complex64::new(1.0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(0.0, 0.0),
                Complex64::new(-1.0, 0.0),
            ],
        );
        let mut qc = Circuit::new(1, 0);
        qc.x(0);
        assert!((Estimator::ideal().run(&qc, &z).unwrap() + 1.0).abs() < EPSILON);
        let mut noise = NoiseModel::new();
        noise.add_quantum_error(depolarizing_error(0.1, 1), &["x"], &[0]);
        let noisy = Estimator::noisy(noise).run(&qc, &z).unwrap();
        assert!((noisy + 0.9).abs() < EPSILON);
    }

    #[test]
    fn test_most_likely_outcome() {
        let dist = Distribution {
            num_clbits: 2,
            probabilities: BTreeMap::from([(0, 0.2), (2, 0.5), (3, 0.3)]),
        };
        assert_eq!(dist.most_likely(), Some(2));
    }
}
