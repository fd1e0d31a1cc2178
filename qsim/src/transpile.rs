use crate::circuit::Circuit;
use crate::device::{CouplingMap, Device};
use crate::error::SimError;
use crate::gate::{Angle, Gate, u_angles};
use nalgebra::DMatrix;
use num_complex::Complex64;
use std::collections::{BTreeSet, HashSet};
use std::f64::consts::FRAC_PI_2;
use tracing::debug;

/// Optimisation-free transpiler: unroll, lay out, route with SWAPs, translate to a basis.
#[derive(Debug, Clone, Default)]
pub struct Transpiler {
    coupling: Option<CouplingMap>,
    basis_gates: Option<BTreeSet<String>>,
    initial_layout: Option<Vec<usize>>,
}

impl Transpiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_device(device: &Device) -> Self {
        Self {
            coupling: Some(device.coupling()),
            basis_gates: Some(device.basis_gates.iter().cloned().collect()),
            initial_layout: None,
        }
    }

    pub fn with_coupling_map(mut self, coupling: CouplingMap) -> Self {
        self.coupling = Some(coupling);
        self
    }

    pub fn with_basis(mut self, basis: &[&str]) -> Self {
        self.basis_gates = Some(basis.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Virtual qubit i starts on physical qubit `layout[i]`.
    pub fn with_layout(mut self, layout: Vec<usize>) -> Self {
        self.initial_layout = Some(layout);
        self
    }

    pub fn run(&self, circuit: &Circuit) -> Result<Circuit, SimError> {
        circuit.validate()?;
        let mut out = unroll_circuit(circuit)?;
        if let Some(coupling) = &self.coupling {
            let layout = self.layout(circuit.num_qubits, coupling.num_qubits())?;
            out = route(&out, coupling, &layout)?;
        } else if let Some(layout) = &self.initial_layout {
            let width = layout.iter().copied().max().map_or(0, |m| m + 1).max(circuit.num_qubits);
            let layout = self.layout(circuit.num_qubits, width)?;
            out = apply_layout(&out, &layout, width);
        }
        if let Some(basis) = &self.basis_gates {
            out = translate_circuit(&out, basis)?;
        }
        debug!(
            depth = out.depth(),
            swaps = out.count_ops().get("swap").copied().unwrap_or(0),
            "transpiled circuit"
        );
        Ok(out)
    }

    fn layout(&self, num_virtual: usize, width: usize) -> Result<Vec<usize>, SimError> {
        if num_virtual > width {
            return Err(SimError::Layout(format!(
                "{} qubits do not fit on a {}-qubit device",
                num_virtual, width
            )));
        }
        let layout = match &self.initial_layout {
            None => (0..num_virtual).collect(),
            Some(layout) => layout.clone(),
        };
        if layout.len() != num_virtual {
            return Err(SimError::Layout(format!(
                "layout has {} entries for {} qubits",
                layout.len(),
                num_virtual
            )));
        }
        let unique: HashSet<_> = layout.iter().collect();
        if unique.len() != layout.len() || layout.iter().any(|&p| p >= width) {
            return Err(SimError::Layout(format!("invalid layout {:?}", layout)));
        }
        // ancillas take the free physical qubits in ascending order
        let mut full = layout;
        let used: HashSet<usize> = full.iter().copied().collect();
        full.extend((0..width).filter(|p| !used.contains(p)));
        Ok(full)
    }
}

// --- Unrolling ---

fn unroll_circuit(circuit: &Circuit) -> Result<Circuit, SimError> {
    let mut out = Circuit::new(circuit.num_qubits, circuit.num_clbits);
    for gate in &circuit.gates {
        out.gates.extend(unroll(gate)?);
    }
    Ok(out)
}

/// Rewrites gates on three or more qubits into one- and two-qubit gates.
fn unroll(gate: &Gate) -> Result<Vec<Gate>, SimError> {
    let gates = match gate {
        Gate::CCX(a, b, t) => {
            let (a, b, t) = (*a, *b, *t);
            vec![
                Gate::H(t),
                Gate::CX(b, t),
                Gate::Tdg(t),
                Gate::CX(a, t),
                Gate::T(t),
                Gate::CX(b, t),
                Gate::Tdg(t),
                Gate::CX(a, t),
                Gate::T(b),
                Gate::T(t),
                Gate::H(t),
                Gate::CX(a, b),
                Gate::T(a),
                Gate::Tdg(b),
                Gate::CX(a, b),
            ]
        }
        Gate::MCP(controls, t, lambda) => match controls.as_slice() {
            [] => vec![Gate::P(*t, lambda.clone())],
            [c] => vec![Gate::CP(*c, *t, lambda.clone())],
            [c0, c1] => {
                let half = lambda.scaled(0.5);
                vec![
                    Gate::CP(*c1, *t, half.clone()),
                    Gate::CX(*c0, *c1),
                    Gate::CP(*c1, *t, half.negated()),
                    Gate::CX(*c0, *c1),
                    Gate::CP(*c0, *t, half),
                ]
            }
            _ => {
                return Err(SimError::Unsupported(format!(
                    "mcphase with {} controls",
                    controls.len()
                )));
            }
        },
        Gate::IfValue(condition, inner) => unroll(inner)?
            .into_iter()
            .map(|g| Gate::IfValue(condition.clone(), Box::new(g)))
            .collect(),
        other => vec![other.clone()],
    };
    Ok(gates)
}

// --- Layout and routing ---

fn apply_layout(circuit: &Circuit, layout: &[usize], width: usize) -> Circuit {
    let mut out = Circuit::new(width, circuit.num_clbits);
    out.gates = circuit
        .gates
        .iter()
        .map(|g| g.remap(&|q| layout[q], &|c| c))
        .collect();
    out
}

/// Inserts SWAPs along the shortest path so every two-qubit gate acts on
/// neighbouring physical qubits. The first qubit of the gate is moved.
fn route(circuit: &Circuit, coupling: &CouplingMap, layout: &[usize]) -> Result<Circuit, SimError> {
    let width = coupling.num_qubits();
    let mut l2p = layout.to_vec();
    let mut p2l = vec![0usize; width];
    for (logical, &physical) in l2p.iter().enumerate() {
        p2l[physical] = logical;
    }
    let mut out = Circuit::new(width, circuit.num_clbits);
    let mut swaps = 0usize;
    for gate in &circuit.gates {
        let qubits = gate.qubits();
        if !gate.is_directive() && qubits.len() > 2 {
            return Err(SimError::Unsupported(format!(
                "{} on {} qubits cannot be routed",
                gate.name(),
                qubits.len()
            )));
        }
        if !gate.is_directive() && qubits.len() == 2 {
            let (pa, pb) = (l2p[qubits[0]], l2p[qubits[1]]);
            if !coupling.are_adjacent(pa, pb) {
                let path = coupling.shortest_path(pa, pb).ok_or_else(|| {
                    SimError::Layout(format!("no path between physical qubits {} and {}", pa, pb))
                })?;
                for pair in path.windows(2).take(path.len().saturating_sub(2)) {
                    let (x, y) = (pair[0], pair[1]);
                    out.swap(x, y);
                    let (lx, ly) = (p2l[x], p2l[y]);
                    l2p[lx] = y;
                    l2p[ly] = x;
                    p2l.swap(x, y);
                    swaps += 1;
                }
            }
        }
        out.add_gate(gate.remap(&|q| l2p[q], &|c| c));
    }
    debug!(swaps, "routing finished");
    Ok(out)
}

// --- Basis translation ---

fn translate_circuit(circuit: &Circuit, basis: &BTreeSet<String>) -> Result<Circuit, SimError> {
    let mut out = Circuit::new(circuit.num_qubits, circuit.num_clbits);
    for gate in &circuit.gates {
        out.gates.extend(translate(gate, basis)?);
    }
    Ok(out)
}

fn translate(gate: &Gate, basis: &BTreeSet<String>) -> Result<Vec<Gate>, SimError> {
    if basis.contains(gate.name())
        || matches!(gate, Gate::Measure(..) | Gate::Reset(_) | Gate::Barrier(_))
    {
        return Ok(vec![gate.clone()]);
    }
    if let Gate::IfValue(condition, inner) = gate {
        return Ok(translate(inner, basis)?
            .into_iter()
            .map(|g| Gate::IfValue(condition.clone(), Box::new(g)))
            .collect());
    }
    if let Some(m) = gate.single_qubit_matrix()? {
        if !basis.contains("u") {
            return Err(SimError::Unsupported(format!(
                "cannot express {} without a u gate in the basis",
                gate.name()
            )));
        }
        let (theta, phi, lambda) = u_angles(&m);
        return Ok(vec![Gate::U(
            gate.qubits()[0],
            Angle::Value(theta),
            Angle::Value(phi),
            Angle::Value(lambda),
        )]);
    }
    if matches!(gate, Gate::CX(..)) || !basis.contains("cx") {
        return Err(SimError::Unsupported(format!(
            "cannot express {} in basis {:?}",
            gate.name(),
            basis
        )));
    }
    let mut out = Vec::new();
    for g in decompose_two_qubit(gate)? {
        out.extend(translate(&g, basis)?);
    }
    Ok(out)
}

/// Two-qubit gates in terms of CX and single-qubit gates.
fn decompose_two_qubit(gate: &Gate) -> Result<Vec<Gate>, SimError> {
    let gates = match gate {
        Gate::Swap(a, b) => vec![Gate::CX(*a, *b), Gate::CX(*b, *a), Gate::CX(*a, *b)],
        Gate::CZ(a, b) => vec![Gate::H(*b), Gate::CX(*a, *b), Gate::H(*b)],
        Gate::CY(a, b) => vec![Gate::Sdg(*b), Gate::CX(*a, *b), Gate::S(*b)],
        Gate::CP(a, b, lambda) => {
            let half = lambda.scaled(0.5);
            vec![
                Gate::P(*a, half.clone()),
                Gate::CX(*a, *b),
                Gate::P(*b, half.negated()),
                Gate::CX(*a, *b),
                Gate::P(*b, half),
            ]
        }
        Gate::RZZ(a, b, theta) => vec![
            Gate::CX(*a, *b),
            Gate::RZ(*b, theta.clone()),
            Gate::CX(*a, *b),
        ],
        Gate::RXX(a, b, theta) => vec![
            Gate::H(*a),
            Gate::H(*b),
            Gate::CX(*a, *b),
            Gate::RZ(*b, theta.clone()),
            Gate::CX(*a, *b),
            Gate::H(*a),
            Gate::H(*b),
        ],
        Gate::RYY(a, b, theta) => vec![
            Gate::RX(*a, Angle::Value(FRAC_PI_2)),
            Gate::RX(*b, Angle::Value(FRAC_PI_2)),
            Gate::CX(*a, *b),
            Gate::RZ(*b, theta.clone()),
            Gate::CX(*a, *b),
            Gate::RX(*a, Angle::Value(-FRAC_PI_2)),
            Gate::RX(*b, Angle::Value(-FRAC_PI_2)),
        ],
        Gate::CCX(..) | Gate::MCP(..) => unroll(gate)?,
        other => {
            return Err(SimError::Unsupported(format!(
                "no decomposition for {}",
                other.name()
            )));
        }
    };
    Ok(gates)
}

// --- Gate cancellation ---

const PHASE_ATOL: f64 = 1e-9;

/// Collapses redundant gates until nothing changes: runs of bound single-qubit
/// gates merge into one `unitary` (dropped when it is a global phase), and adjacent
/// identical `cx`/`cy`/`cz`/`swap` pairs cancel. Global phase is not tracked.
pub fn cancel_redundant_gates(circuit: &Circuit) -> Result<Circuit, SimError> {
    circuit.validate()?;
    let mut gates: Vec<Option<Gate>> = circuit.gates.iter().cloned().map(Some).collect();
    let mut passes = 0;
    while cancellation_pass(&mut gates, circuit.num_qubits) {
        passes += 1;
    }
    let out = Circuit {
        num_qubits: circuit.num_qubits,
        num_clbits: circuit.num_clbits,
        gates: gates.into_iter().flatten().collect(),
    };
    debug!(passes, removed = circuit.gates.len() - out.gates.len(), "cancelled redundant gates");
    Ok(out)
}

fn single_qubit_unitary(gate: &Gate) -> Option<DMatrix<Complex64>> {
    if gate.is_unitary() && gate.qubits().len() == 1 {
        gate.matrix().ok()
    } else {
        None
    }
}

fn is_global_phase(m: &DMatrix<Complex64>) -> bool {
    m[(0, 1)].norm() < PHASE_ATOL && m[(1, 0)].norm() < PHASE_ATOL && (m[(0, 0)] - m[(1, 1)]).norm() < PHASE_ATOL
}

/// One sweep; `last[q]` is the latest surviving gate on qubit `q`, or `None`
/// once that gate was removed in this sweep.
fn cancellation_pass(gates: &mut [Option<Gate>], num_qubits: usize) -> bool {
    let mut last: Vec<Option<usize>> = vec![None; num_qubits];
    let mut changed = false;
    for i in 0..gates.len() {
        let Some(gate) = gates[i].clone() else {
            continue;
        };
        let mut qubits = gate.qubits();
        if qubits.is_empty() && gate.is_directive() {
            qubits = (0..num_qubits).collect();
        }

        if let (Some(m), [q]) = (single_qubit_unitary(&gate), qubits.as_slice()) {
            let previous = last[*q].and_then(|j| gates[j].as_ref().and_then(single_qubit_unitary).map(|p| (j, p)));
            if let Some((j, p)) = previous {
                let merged = m * p;
                gates[i] = None;
                if is_global_phase(&merged) {
                    gates[j] = None;
                    last[*q] = None;
                } else {
                    gates[j] = Some(Gate::Unitary(vec![*q], merged));
                }
                changed = true;
                continue;
            }
        } else if matches!(gate, Gate::CX(..) | Gate::CY(..) | Gate::CZ(..) | Gate::Swap(..)) {
            let previous = last[qubits[0]];
            if let Some(j) = previous {
                if qubits.iter().all(|&q| last[q] == previous) && gates[j].as_ref() == Some(&gate) {
                    gates[i] = None;
                    gates[j] = None;
                    for &q in &qubits {
                        last[q] = None;
                    }
                    changed = true;
                    continue;
                }
            }
        }
        for &q in &qubits {
            last[q] = Some(i);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn line(n: usize) -> CouplingMap {
        let edges: Vec<[usize; 2]> = (0..n - 1).map(|i| [i, i + 1]).collect();
        CouplingMap::new(n, &edges)
    }

    #[test]
    fn test_basis_translation_preserves_unitary() {
        let mut qc = Circuit::new(3, 0);
        qc.h(0)
            .cp(PI / 3.0, 0, 1)
            .ccx(0, 1, 2)
            .rxx(0.4, 1, 2)
            .ryy(-0.9, 0, 2)
            .cy(2, 0)
            .swap(0, 1)
            .mcp(0.7, &[0, 1], 2);
        let out = Transpiler::new().with_basis(&["u", "cx"]).run(&qc).unwrap();
        assert!(out.gates.iter().all(|g| matches!(g, Gate::U(..) | Gate::CX(..))));
        let a = Operator::from_circuit(&qc).unwrap();
        let b = Operator::from_circuit(&out).unwrap();
        assert!(a.equiv(&b, 1e-8));
    }

    #[test]
    fn test_routing_inserts_swaps_on_a_line() {
        let mut qc = Circuit::new(3, 0);
        qc.cx(0, 2);
        let out = Transpiler::new()
            .with_coupling_map(line(3))
            .run(&qc)
            .unwrap();
        assert_eq!(out.gates, vec![Gate::Swap(0, 1), Gate::CX(1, 2)]);
    }

    #[test]
    fn test_measurements_follow_final_layout() {
        let mut qc = Circuit::new(3, 3);
        qc.x(0).cx(0, 2).measure(0, 0).measure(1, 1).measure(2, 2);
        let out = Transpiler::new()
            .with_coupling_map(line(3))
            .run(&qc)
            .unwrap();
        assert!(out.gates.contains(&Gate::Measure(1, 0)));
        assert!(out.gates.contains(&Gate::Measure(0, 1)));
    }

    #[test]
    fn test_initial_layout_and_ancillas() {
        let mut qc = Circuit::new(2, 0);
        qc.cx(0, 1);
        let out = Transpiler::new()
            .with_coupling_map(line(4))
            .with_layout(vec![3, 2])
            .run(&qc)
            .unwrap();
        assert_eq!(out.num_qubits, 4);
        assert_eq!(out.gates, vec![Gate::CX(3, 2)]);
        let bad = Transpiler::new()
            .with_coupling_map(line(4))
            .with_layout(vec![3, 3])
            .run(&qc);
        assert!(matches!(bad, Err(SimError::Layout(_))));
    }

    #[test]
    fn test_burlington_ghz_depth() {
        let device = Device::burlington().unwrap();
        let mut qc = Circuit::new(4, 0);
        qc.h(0).cx(0, 1).cx(1, 2).cx(1, 3).measure_all();
        let out = Transpiler::for_device(&device).run(&qc).unwrap();
        assert_eq!(out.num_qubits, 5);
        assert_eq!(out.depth(), 5);
        assert!(matches!(out.gates[0], Gate::U(0, ..)));
    }

    #[test]
    fn test_cancellation_merges_single_qubit_runs() {
        let mut qc = Circuit::new(4, 0);
        qc.h(0).h(0).h(0).cx(0, 1).cx(0, 2).cx(1, 3);
        let reduced = cancel_redundant_gates(&qc).unwrap();
        assert_eq!(reduced.depth(), 3);
        assert_eq!(reduced.size(), 4);
        let before = Operator::from_circuit(&qc).unwrap();
        let after = Operator::from_circuit(&reduced).unwrap();
        assert!((before.matrix - after.matrix).norm() < EPSILON);
    }

    #[test]
    fn test_cancellation_removes_cx_pairs_and_respects_barriers() {
        let mut qc = Circuit::new(2, 0);
        qc.cx(0, 1).x(1).x(1).cx(0, 1).s(0).sdg(0);
        assert!(cancel_redundant_gates(&qc).unwrap().gates.is_empty());

        let mut blocked = Circuit::new(2, 0);
        blocked.cx(0, 1).barrier(&[]).cx(0, 1).cx(1, 0);
        assert_eq!(cancel_redundant_gates(&blocked).unwrap().gates, blocked.gates);

        let mut parametric = Circuit::new(1, 0);
        parametric.ry(Angle::param("t"), 0).ry(Angle::param("t"), 0);
        assert_eq!(cancel_redundant_gates(&parametric).unwrap().size(), 2);
    }

    #[test]
    fn test_hadamard_becomes_u() {
        let mut qc = Circuit::new(1, 0);
        qc.h(0);
        let out = Transpiler::new().with_basis(&["u", "cx"]).run(&qc).unwrap();
        match &out.gates[0] {
            Gate::U(0, theta, phi, lambda) => {
                assert!((theta.value().unwrap() - PI / 2.0).abs() < EPSILON);
                assert!(phi.value().unwrap().abs() < EPSILON);
                assert!((lambda.value().unwrap().abs() - PI).abs() < EPSILON);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
