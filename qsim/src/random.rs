use crate::circuit::Circuit;
use crate::gate::{Angle, Gate};
use rand::Rng;
use rand::seq::SliceRandom;
use std::f64::consts::PI;

/// Random circuit with `depth` layers; every layer covers every qubit with
/// one-, two- or three-qubit gates, so `circuit.depth() == depth`.
pub fn random_circuit(num_qubits: usize, depth: usize, rng: &mut impl Rng) -> Circuit {
    let mut circuit = Circuit::new(num_qubits, 0);
    let mut qubits: Vec<usize> = (0..num_qubits).collect();
    for _ in 0..depth {
        qubits.shuffle(rng);
        let mut rest = qubits.as_slice();
        while !rest.is_empty() {
            let width = rng.gen_range(1..=rest.len().min(3));
            let (operands, tail) = rest.split_at(width);
            circuit.add_gate(random_gate(operands, rng));
            rest = tail;
        }
    }
    circuit
}

fn angle(rng: &mut impl Rng) -> Angle {
    Angle::Value(rng.gen_range(0.0..2.0 * PI))
}

fn random_gate(q: &[usize], rng: &mut impl Rng) -> Gate {
    match q {
        [a] => match rng.gen_range(0..14) {
            0 => Gate::I(*a),
            1 => Gate::H(*a),
            2 => Gate::X(*a),
            3 => Gate::Y(*a),
            4 => Gate::Z(*a),
            5 => Gate::S(*a),
            6 => Gate::Sdg(*a),
            7 => Gate::T(*a),
            8 => Gate::Tdg(*a),
            9 => Gate::SX(*a),
            10 => Gate::RX(*a, angle(rng)),
            11 => Gate::RY(*a, angle(rng)),
            12 => Gate::RZ(*a, angle(rng)),
            _ => Gate::U(*a, angle(rng), angle(rng), angle(rng)),
        },
        [a, b] => match rng.gen_range(0..8) {
            0 => Gate::CX(*a, *b),
            1 => Gate::CY(*a, *b),
            2 => Gate::CZ(*a, *b),
            3 => Gate::CP(*a, *b, angle(rng)),
            4 => Gate::Swap(*a, *b),
            5 => Gate::RXX(*a, *b, angle(rng)),
            6 => Gate::RYY(*a, *b, angle(rng)),
            _ => Gate::RZZ(*a, *b, angle(rng)),
        },
        [a, b, c, ..] => match rng.gen_range(0..2) {
            0 => Gate::CCX(*a, *b, *c),
            _ => Gate::MCP(vec![*a, *b], *c, angle(rng)),
        },
        [] => Gate::Barrier(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_random_circuit_has_requested_depth() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 1..=4 {
            for depth in [1, 4, 7] {
                let qc = random_circuit(n, depth, &mut rng);
                assert_eq!(qc.depth(), depth);
                assert_eq!(qc.num_qubits, n);
            }
        }
    }

    #[test]
    fn test_random_circuit_is_unitary() {
        let mut rng = StdRng::seed_from_u64(5);
        let qc = random_circuit(3, 4, &mut rng);
        let op = Operator::from_circuit(&qc).unwrap();
        let product = &op.matrix * op.matrix.adjoint();
        assert!((product - Operator::identity(3).matrix).norm() < 1e-9);
    }
}
