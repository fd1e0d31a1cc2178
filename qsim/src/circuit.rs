use crate::error::SimError;
use crate::gate::{Angle, Condition, Gate};
use nalgebra::DMatrix;
use num_complex::Complex64;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Widest register a circuit may declare; outcomes are keyed by `u64`.
pub const MAX_QUBITS: usize = 64;
/// Widest circuit simulated as a state vector.
pub const MAX_STATE_QUBITS: usize = 24;
/// Widest circuit simulated as a density matrix or a full unitary.
pub const MAX_MATRIX_QUBITS: usize = 12;

/// An ordered list of operations over `num_qubits` qubits and `num_clbits` classical bits.
#[derive(Debug, Clone, PartialEq)]
pub struct Circuit {
    pub num_qubits: usize,
    pub num_clbits: usize,
    pub gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            gates: Vec::new(),
        }
    }

    pub fn add_gate(&mut self, gate: Gate) -> &mut Self {
        self.gates.push(gate);
        self
    }

    // --- Builders ---

    pub fn id(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::I(q))
    }

    pub fn h(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::H(q))
    }

    pub fn x(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::X(q))
    }

    pub fn y(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::Y(q))
    }

    pub fn z(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::Z(q))
    }

    pub fn s(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::S(q))
    }

    pub fn sdg(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::Sdg(q))
    }

    pub fn t(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::T(q))
    }

    pub fn tdg(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::Tdg(q))
    }

    pub fn sx(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::SX(q))
    }

    pub fn rx(&mut self, theta: impl Into<Angle>, q: usize) -> &mut Self {
        self.add_gate(Gate::RX(q, theta.into()))
    }

    pub fn ry(&mut self, theta: impl Into<Angle>, q: usize) -> &mut Self {
        self.add_gate(Gate::RY(q, theta.into()))
    }

    pub fn rz(&mut self, theta: impl Into<Angle>, q: usize) -> &mut Self {
        self.add_gate(Gate::RZ(q, theta.into()))
    }

    pub fn p(&mut self, lambda: impl Into<Angle>, q: usize) -> &mut Self {
        self.add_gate(Gate::P(q, lambda.into()))
    }

    pub fn u(
        &mut self,
        theta: impl Into<Angle>,
        phi: impl Into<Angle>,
        lambda: impl Into<Angle>,
        q: usize,
    ) -> &mut Self {
        self.add_gate(Gate::U(q, theta.into(), phi.into(), lambda.into()))
    }

    pub fn cx(&mut self, control: usize, target: usize) -> &mut Self {
        self.add_gate(Gate::CX(control, target))
    }

    pub fn cy(&mut self, control: usize, target: usize) -> &mut Self {
        self.add_gate(Gate::CY(control, target))
    }

    pub fn cz(&mut self, control: usize, target: usize) -> &mut Self {
        self.add_gate(Gate::CZ(control, target))
    }

    pub fn cp(&mut self, lambda: impl Into<Angle>, control: usize, target: usize) -> &mut Self {
        self.add_gate(Gate::CP(control, target, lambda.into()))
    }

    pub fn swap(&mut self, a: usize, b: usize) -> &mut Self {
        self.add_gate(Gate::Swap(a, b))
    }

    pub fn rxx(&mut self, theta: impl Into<Angle>, a: usize, b: usize) -> &mut Self {
        self.add_gate(Gate::RXX(a, b, theta.into()))
    }

    pub fn ryy(&mut self, theta: impl Into<Angle>, a: usize, b: usize) -> &mut Self {
        self.add_gate(Gate::RYY(a, b, theta.into()))
    }

    pub fn rzz(&mut self, theta: impl Into<Angle>, a: usize, b: usize) -> &mut Self {
        self.add_gate(Gate::RZZ(a, b, theta.into()))
    }

    pub fn ccx(&mut self, c1: usize, c2: usize, target: usize) -> &mut Self {
        self.add_gate(Gate::CCX(c1, c2, target))
    }

    pub fn mcp(&mut self, lambda: impl Into<Angle>, controls: &[usize], target: usize) -> &mut Self {
        self.add_gate(Gate::MCP(controls.to_vec(), target, lambda.into()))
    }

    pub fn unitary(&mut self, matrix: DMatrix<Complex64>, qubits: &[usize]) -> &mut Self {
        self.add_gate(Gate::Unitary(qubits.to_vec(), matrix))
    }

    pub fn measure(&mut self, q: usize, c: usize) -> &mut Self {
        self.add_gate(Gate::Measure(q, c))
    }

    pub fn reset(&mut self, q: usize) -> &mut Self {
        self.add_gate(Gate::Reset(q))
    }

    /// Barrier over the given qubits, or over every qubit when `qubits` is empty.
    pub fn barrier(&mut self, qubits: &[usize]) -> &mut Self {
        let qubits = if qubits.is_empty() {
            (0..self.num_qubits).collect()
        } else {
            qubits.to_vec()
        };
        self.add_gate(Gate::Barrier(qubits))
    }

    /// Applies `gate` only when the classical bits read `value`.
    pub fn if_value(&mut self, clbits: &[usize], value: u64, gate: Gate) -> &mut Self {
        self.add_gate(Gate::IfValue(
            Condition {
                clbits: clbits.to_vec(),
                value,
            },
            Box::new(gate),
        ))
    }

    /// Adds a barrier and a fresh classical bit per qubit, then measures qubit i into it.
    pub fn measure_all(&mut self) -> &mut Self {
        let offset = self.num_clbits;
        self.num_clbits += self.num_qubits;
        self.barrier(&[]);
        for q in 0..self.num_qubits {
            self.measure(q, offset + q);
        }
        self
    }

    // --- Inspection ---

    pub fn validate(&self) -> Result<(), SimError> {
        for width in [self.num_qubits, self.num_clbits] {
            if width > MAX_QUBITS {
                return Err(SimError::Width {
                    qubits: width,
                    max: MAX_QUBITS,
                });
            }
        }
        for gate in &self.gates {
            let qubits = gate.qubits();
            let mut seen = HashSet::new();
            for &q in &qubits {
                if q >= self.num_qubits || !seen.insert(q) {
                    return Err(SimError::Qubit(q));
                }
            }
            if let Some(&c) = gate.clbits().iter().find(|&&c| c >= self.num_clbits) {
                return Err(SimError::Clbit(c));
            }
        }
        Ok(())
    }

    /// `validate`, and at most `max` qubits for a simulator that allocates per basis state.
    pub fn validate_width(&self, max: usize) -> Result<(), SimError> {
        self.validate()?;
        if self.num_qubits > max {
            return Err(SimError::Width {
                qubits: self.num_qubits,
                max,
            });
        }
        Ok(())
    }

    /// Circuit depth: longest path through the wires, barriers excluded.
    /// Classical bits (measurement targets and conditions) count as wires.
    pub fn depth(&self) -> usize {
        let mut levels = vec![0usize; self.num_qubits + self.num_clbits];
        let mut depth = 0;
        for gate in self.gates.iter().filter(|g| !g.is_directive()) {
            let wires: Vec<usize> = gate
                .qubits()
                .into_iter()
                .chain(gate.clbits().into_iter().map(|c| self.num_qubits + c))
                .filter(|&w| w < levels.len())
                .collect();
            let level = wires.iter().map(|&w| levels[w]).max().unwrap_or(0) + 1;
            for w in wires {
                levels[w] = level;
            }
            depth = depth.max(level);
        }
        depth
    }

    /// Number of operations per name, barriers and measurements included.
    pub fn count_ops(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for gate in &self.gates {
            *counts.entry(gate.name().to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn size(&self) -> usize {
        self.gates.iter().filter(|g| !g.is_directive()).count()
    }

    pub fn parameters(&self) -> BTreeSet<String> {
        self.gates
            .iter()
            .flat_map(|g| g.angles())
            .filter_map(|a| a.name().map(str::to_string))
            .collect()
    }

    pub fn num_parameters(&self) -> usize {
        self.parameters().len()
    }

    pub fn bind(&self, values: &HashMap<String, f64>) -> Circuit {
        Circuit {
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            gates: self.gates.iter().map(|g| g.bind(values)).collect(),
        }
    }

    /// Binds parameters in sorted-name order.
    pub fn bind_ordered(&self, values: &[f64]) -> Result<Circuit, SimError> {
        let names = self.parameters();
        if names.len() != values.len() {
            return Err(SimError::Compose(format!(
                "expected {} parameter values, got {}",
                names.len(),
                values.len()
            )));
        }
        let map = names.into_iter().zip(values.iter().copied()).collect();
        Ok(self.bind(&map))
    }

    /// True when the circuit contains measurements, resets or conditioned gates.
    pub fn has_non_unitary(&self) -> bool {
        self.gates
            .iter()
            .any(|g| !g.is_unitary() && !g.is_directive())
    }

    // --- Transformations ---

    /// Appends `other` wired onto `qubits`/`clbits` of this circuit (identity wiring when `None`).
    pub fn compose(
        &self,
        other: &Circuit,
        qubits: Option<&[usize]>,
        clbits: Option<&[usize]>,
    ) -> Result<Circuit, SimError> {
        if other.num_qubits > self.num_qubits || other.num_clbits > self.num_clbits {
            return Err(SimError::Compose(format!(
                "circuit with {} qubits and {} clbits does not fit into {} qubits and {} clbits",
                other.num_qubits, other.num_clbits, self.num_qubits, self.num_clbits
            )));
        }
        let qmap = wire_map(qubits, other.num_qubits, self.num_qubits, "qubits")?;
        let cmap = wire_map(clbits, other.num_clbits, self.num_clbits, "clbits")?;
        let mut out = self.clone();
        out.gates.extend(
            other
                .gates
                .iter()
                .map(|g| g.remap(&|q| qmap[q], &|c| cmap[c])),
        );
        Ok(out)
    }

    pub fn append(&mut self, other: &Circuit) -> Result<&mut Self, SimError> {
        *self = self.compose(other, None, None)?;
        Ok(self)
    }

    pub fn inverse(&self) -> Result<Circuit, SimError> {
        let gates = self
            .gates
            .iter()
            .rev()
            .map(Gate::inverse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Circuit {
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            gates,
        })
    }

    /// Drops measurements (and barriers) with nothing but other final operations after them.
    pub fn remove_final_measurements(&self) -> Circuit {
        let mut busy: HashSet<usize> = HashSet::new();
        let mut kept = Vec::with_capacity(self.gates.len());
        for gate in self.gates.iter().rev() {
            let qubits = gate.qubits();
            let is_final = match gate {
                Gate::Measure(q, _) => !busy.contains(q),
                Gate::Barrier(qs) => qs.iter().all(|q| !busy.contains(q)),
                _ => false,
            };
            if !is_final {
                busy.extend(qubits);
                kept.push(gate.clone());
            }
        }
        kept.reverse();
        let num_clbits = if kept.iter().any(|g| !g.clbits().is_empty()) {
            self.num_clbits
        } else {
            0
        };
        Circuit {
            num_qubits: self.num_qubits,
            num_clbits,
            gates: kept,
        }
    }

    pub fn remove_barriers(&self) -> Circuit {
        Circuit {
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            gates: self
                .gates
                .iter()
                .filter(|g| !g.is_directive())
                .cloned()
                .collect(),
        }
    }
}

fn wire_map(
    wires: Option<&[usize]>,
    inner: usize,
    outer: usize,
    kind: &str,
) -> Result<Vec<usize>, SimError> {
    match wires {
        None => Ok((0..inner).collect()),
        Some(w) if w.len() != inner => Err(SimError::Compose(format!(
            "expected {} {}, got {}",
            inner,
            kind,
            w.len()
        ))),
        Some(w) => {
            let unique: HashSet<_> = w.iter().collect();
            if unique.len() != w.len() || w.iter().any(|&x| x >= outer) {
                return Err(SimError::Compose(format!("invalid {} wiring {:?}", kind, w)));
            }
            Ok(w.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn ghz_chain() -> Circuit {
        let mut qc = Circuit::new(4, 0);
        qc.h(0).cx(0, 1).cx(1, 2).cx(2, 3);
        qc
    }

    #[test]
    fn test_depth_ignores_barriers() {
        let mut qc = ghz_chain();
        assert_eq!(qc.depth(), 4);
        qc.barrier(&[]);
        assert_eq!(qc.depth(), 4);
    }

    #[test]
    fn test_depth_counts_classical_wires() {
        let mut qc = Circuit::new(2, 1);
        qc.h(0).measure(0, 0).if_value(&[0], 1, Gate::X(1));
        // the conditional waits on the clbit written by the measurement
        assert_eq!(qc.depth(), 3);
    }

    #[test]
    fn test_measure_all_adds_clbits() {
        let mut qc = ghz_chain();
        qc.measure_all();
        assert_eq!(qc.num_clbits, 4);
        assert_eq!(qc.count_ops()["measure"], 4);
        assert_eq!(qc.count_ops()["barrier"], 1);
        assert_eq!(qc.depth(), 5);
    }

    #[test]
    fn test_remove_final_measurements_keeps_mid_circuit_ones() {
        let mut qc = Circuit::new(2, 2);
        qc.h(0).measure(0, 0).x(0).measure(1, 1);
        let stripped = qc.remove_final_measurements();
        assert_eq!(
            stripped.gates,
            vec![Gate::H(0), Gate::Measure(0, 0), Gate::X(0)]
        );
        assert_eq!(stripped.num_clbits, 2);

        let mut final_only = ghz_chain();
        final_only.measure_all();
        let stripped = final_only.remove_final_measurements();
        assert_eq!(stripped, ghz_chain());
    }

    #[test]
    fn test_compose_with_wiring() {
        let mut inner = Circuit::new(2, 0);
        inner.cx(0, 1);
        let outer = Circuit::new(3, 0);
        let composed = outer.compose(&inner, Some(&[2, 0]), None).unwrap();
        assert_eq!(composed.gates, vec![Gate::CX(2, 0)]);
        assert!(outer.compose(&ghz_chain(), None, None).is_err());
    }

    #[test]
    fn test_inverse_reverses_and_inverts() {
        let mut qc = Circuit::new(1, 0);
        qc.s(0).rz(PI / 3.0, 0);
        let inv = qc.inverse().unwrap();
        assert_eq!(
            inv.gates,
            vec![Gate::RZ(0, Angle::Value(-PI / 3.0)), Gate::Sdg(0)]
        );
        let mut measured = Circuit::new(1, 1);
        measured.measure(0, 0);
        assert!(measured.inverse().is_err());
    }

    #[test]
    fn test_parameters_are_counted_once() {
        let mut qc = Circuit::new(2, 0);
        qc.ry(Angle::param("a"), 0)
            .ry(Angle::param("a").scaled(2.0), 1)
            .rz(Angle::param("b"), 1);
        assert_eq!(qc.num_parameters(), 2);
        let bound = qc.bind_ordered(&[0.5, 1.0]).unwrap();
        assert_eq!(bound.num_parameters(), 0);
        assert_eq!(bound.gates[1], Gate::RY(1, Angle::Value(1.0)));
    }

    #[test]
    fn test_validate_rejects_out_of_range_qubits() {
        let mut qc = Circuit::new(2, 0);
        qc.cx(0, 2);
        assert!(matches!(qc.validate(), Err(SimError::Qubit(2))));
        let mut dup = Circuit::new(2, 0);
        dup.cx(1, 1);
        assert!(dup.validate().is_err());
    }

    #[test]
    fn test_width_limits() {
        let wide = Circuit::new(MAX_QUBITS + 1, 0);
        assert!(matches!(wide.validate(), Err(SimError::Width { qubits: 65, .. })));
        let mut register = Circuit::new(MAX_QUBITS, 1);
        register.h(0).measure(MAX_QUBITS - 1, 0);
        assert!(register.validate().is_ok());
        assert!(matches!(
            crate::state::StateVector::from_circuit(&register.remove_final_measurements()),
            Err(SimError::Width { qubits: 64, max: MAX_STATE_QUBITS })
        ));
        assert!(matches!(
            crate::operator::Operator::from_circuit(&Circuit::new(MAX_MATRIX_QUBITS + 1, 0)),
            Err(SimError::Width { .. })
        ));
    }
}
