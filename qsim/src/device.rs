use crate::circuit::Circuit;
use crate::error::SimError;
use crate::noise::{NoiseModel, ReadoutError, depolarizing_error};
use crate::sampler::{Backend, Counts, Sampler};
use crate::transpile::Transpiler;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Uniform noise description of a device fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceNoise {
    pub single_qubit_depolarizing: f64,
    pub single_qubit_gates: Vec<String>,
    pub two_qubit_depolarizing: f64,
    pub two_qubit_gates: Vec<String>,
    pub readout: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub num_qubits: usize,
    pub coupling_map: Vec<[usize; 2]>,
    pub basis_gates: Vec<String>,
    pub noise: Option<DeviceNoise>,
}

impl Device {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let device: Device = serde_json::from_str(json)?;
        if let Some(&[a, b]) = device
            .coupling_map
            .iter()
            .find(|[a, b]| *a >= device.num_qubits || *b >= device.num_qubits)
        {
            return Err(SimError::Layout(format!(
                "edge ({}, {}) outside a {}-qubit device",
                a, b, device.num_qubits
            )));
        }
        Ok(device)
    }

    /// Five-qubit T-shaped device with uniform depolarizing and readout noise.
    pub fn burlington() -> Result<Self, SimError> {
        Self::from_json(include_str!("../devices/burlington.json"))
    }

    /// 53-qubit heavy-hex coupling map, noiseless.
    pub fn rochester() -> Result<Self, SimError> {
        Self::from_json(include_str!("../devices/rochester.json"))
    }

    pub fn coupling(&self) -> CouplingMap {
        CouplingMap::new(self.num_qubits, &self.coupling_map)
    }

    pub fn noise_model(&self) -> NoiseModel {
        let mut model = NoiseModel::new();
        if let Some(noise) = &self.noise {
            let names: Vec<&str> = noise.single_qubit_gates.iter().map(String::as_str).collect();
            model.add_all_qubit_quantum_error(depolarizing_error(noise.single_qubit_depolarizing, 1), &names);
            let names: Vec<&str> = noise.two_qubit_gates.iter().map(String::as_str).collect();
            model.add_all_qubit_quantum_error(depolarizing_error(noise.two_qubit_depolarizing, 2), &names);
            if noise.readout > 0.0 {
                model.add_readout_error(ReadoutError::symmetric(noise.readout));
            }
        }
        model
    }
}

impl Backend for Device {
    /// Transpiles onto the device and samples with its noise model.
    fn run(&self, circuit: &Circuit, shots: u32, rng: &mut impl Rng) -> Result<Counts, SimError> {
        let mapped = Transpiler::for_device(self).run(circuit)?;
        Sampler::noisy(self.noise_model()).run(&mapped, shots, rng)
    }
}

/// Undirected connectivity graph between physical qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingMap {
    neighbours: Vec<BTreeSet<usize>>,
}

impl CouplingMap {
    pub fn new(num_qubits: usize, edges: &[[usize; 2]]) -> Self {
        let mut neighbours = vec![BTreeSet::new(); num_qubits];
        for &[a, b] in edges {
            if a < num_qubits && b < num_qubits && a != b {
                neighbours[a].insert(b);
                neighbours[b].insert(a);
            }
        }
        Self { neighbours }
    }

    pub fn num_qubits(&self) -> usize {
        self.neighbours.len()
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        self.neighbours.get(a).is_some_and(|n| n.contains(&b))
    }

    /// Breadth-first shortest path, visiting neighbours in ascending order.
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let n = self.num_qubits();
        if from >= n || to >= n {
            return None;
        }
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut seen = vec![false; n];
        let mut queue = VecDeque::from([from]);
        seen[from] = true;
        while let Some(u) = queue.pop_front() {
            if u == to {
                break;
            }
            for &v in &self.neighbours[u] {
                if !seen[v] {
                    seen[v] = true;
                    parent[v] = Some(u);
                    queue.push_back(v);
                }
            }
        }
        if !seen[to] {
            return None;
        }
        let mut path = vec![to];
        while let Some(p) = parent[*path.last()?] {
            path.push(p);
        }
        path.reverse();
        Some(path)
    }

    pub fn is_connected(&self) -> bool {
        (1..self.num_qubits()).all(|q| self.shortest_path(0, q).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_load() {
        let burlington = Device::burlington().unwrap();
        assert_eq!(burlington.num_qubits, 5);
        assert!(burlington.coupling().are_adjacent(3, 1));
        assert!(!burlington.coupling().are_adjacent(0, 2));
        assert!(!burlington.noise_model().is_ideal());

        let rochester = Device::rochester().unwrap();
        assert_eq!(rochester.num_qubits, 53);
        assert_eq!(rochester.coupling_map.len(), 58);
        assert!(rochester.coupling().is_connected());
        assert!(rochester.noise_model().is_ideal());
    }

    #[test]
    fn test_shortest_path_on_line() {
        let map = CouplingMap::new(4, &[[0, 1], [1, 2], [2, 3]]);
        assert_eq!(map.shortest_path(0, 3), Some(vec![0, 1, 2, 3]));
        assert_eq!(map.shortest_path(2, 2), Some(vec![2]));
    }

    #[test]
    fn test_disconnected_path_is_none() {
        let map = CouplingMap::new(4, &[[0, 1], [2, 3]]);
        assert_eq!(map.shortest_path(0, 3), None);
        assert!(!map.is_connected());
    }

    #[test]
    fn test_bad_edge_is_rejected() {
        let json = r#"{"name":"x","num_qubits":2,"coupling_map":[[0,2]],"basis_gates":[],"noise":null}"#;
        assert!(matches!(Device::from_json(json), Err(SimError::Layout(_))));
    }
}
