//! Reference solutions for every exercise whose answer can be constructed, and
//! the dispatch used by `ecc-grader demo` and `ecc-grader grade`.

use crate::checks::{self, CandidateKind, PHASE};
use crate::context::Grader;
use crate::error::GradeError;
use crate::verdict::Verdict;
use hamiltonian::{Observable, Pauli, PauliTerm, SparsePauliOp};
use ml::{kernel_matrix, zz_feature_map};
use nalgebra::DMatrix;
use qsim::{Angle, Backend, Circuit, Gate, Sampler};
use rand::Rng;
use std::f64::consts::PI;

// --- 1: GHZ ---

/// Depth-3 GHZ preparation: the second layer fans out from qubits 0 and 1.
pub fn ghz() -> Circuit {
    let mut qc = Circuit::new(4, 0);
    qc.h(0).cx(0, 1).cx(0, 2).cx(1, 3);
    qc
}

/// GHZ preparation that only uses Burlington's edges.
pub fn ghz_for_burlington() -> Circuit {
    let mut qc = Circuit::new(4, 0);
    qc.h(0).cx(0, 1).cx(1, 2).cx(1, 3);
    qc
}

// --- 2: error mitigation ---

/// U (U^dagger U)^n
pub fn fold(circuit: &Circuit, n: usize) -> Result<Circuit, GradeError> {
    let inverse = circuit.inverse()?;
    let mut folded = circuit.clone();
    for _ in 0..n {
        folded.append(&inverse)?;
        folded.append(circuit)?;
    }
    Ok(folded)
}

/// Least-squares line through `(2N + 1, value)`; returns `(slope, intercept)`.
pub fn linear_extrapolation(folds: &[usize], values: &[f64]) -> Result<(f64, f64), GradeError> {
    if folds.len() != values.len() || folds.len() < 2 {
        return Err(GradeError::Shape {
            expected: vec![folds.len()],
            found: vec![values.len()],
        });
    }
    let xs: Vec<f64> = folds.iter().map(|&n| (2 * n + 1) as f64).collect();
    let count = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / count;
    let mean_y = values.iter().sum::<f64>() / count;
    let cov: f64 = xs.iter().zip(values).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let var: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    let slope = cov / var;
    Ok((slope, mean_y - slope * mean_x))
}

/// XY + 2 YX + 3 ZX
pub fn mixed_observable() -> Result<SparsePauliOp, GradeError> {
    Ok(SparsePauliOp::from_list(&[("XY", 1.0), ("YX", 2.0), ("ZX", 3.0)])?)
}

// --- 3: Fourier transform and phase estimation ---

pub fn fourier(num_qubits: usize) -> Circuit {
    let mut qc = Circuit::new(num_qubits, 0);
    for j in (0..num_qubits).rev() {
        qc.h(j);
        for k in (0..j).rev() {
            qc.cp(PI / f64::from(1u32 << (j - k)), j, k);
        }
    }
    for i in 0..num_qubits / 2 {
        qc.swap(i, num_qubits - 1 - i);
    }
    qc
}

pub fn controlled_power(power: u32) -> Circuit {
    let mut qc = Circuit::new(2, 0);
    qc.cp(2.0 * PI * PHASE * f64::from(power), 0, 1);
    qc
}

/// Counting register on qubits `0..n`, eigenstate |11> on qubits `n` and `n + 1`.
pub fn phase_estimation(num_qubits: usize) -> Result<Circuit, GradeError> {
    let n = num_qubits;
    let mut qc = Circuit::new(n + 2, n);
    qc.x(n).x(n + 1);
    for j in 0..n {
        qc.h(j);
    }
    for j in 0..n {
        let angle = 2.0 * PI * PHASE * (1u64 << j) as f64;
        qc.mcp(angle, &[j, n], n + 1);
    }
    let counting: Vec<usize> = (0..n).collect();
    let mut qc = qc.compose(&fourier(n).inverse()?, Some(counting.as_slice()), None)?;
    for j in 0..n {
        qc.measure(j, j);
    }
    Ok(qc)
}

// --- 4: entanglement-based key distribution ---

const ALICE_ANGLES: [f64; 3] = [0.0, -PI / 4.0, -PI / 2.0];
const BOB_ANGLES: [f64; 3] = [-PI / 4.0, -PI / 2.0, -3.0 * PI / 4.0];

fn rotation(theta: f64) -> Circuit {
    let mut qc = Circuit::new(1, 0);
    if theta != 0.0 {
        qc.ry(theta, 0);
    }
    qc
}

pub fn alice_bases() -> Vec<Circuit> {
    ALICE_ANGLES.iter().map(|&t| rotation(t)).collect()
}

pub fn bob_bases() -> Vec<Circuit> {
    BOB_ANGLES.iter().map(|&t| rotation(t)).collect()
}

/// Singlet shared between qubits 0 (Alice) and 1 (Bob), rotated into the chosen
/// bases and measured.
pub fn trit_circuit(alice: u8, bob: u8) -> Circuit {
    let mut qc = Circuit::new(2, 2);
    qc.x(0).x(1).h(0).cx(0, 1);
    qc.ry(ALICE_ANGLES[usize::from(alice % 3)], 0);
    qc.ry(BOB_ANGLES[usize::from(bob % 3)], 1);
    qc.measure(0, 0).measure(1, 1);
    qc
}

/// One run of the protocol: random trits, their circuits, and the sifted key
/// (Alice's outcome wherever both chose the same basis).
#[derive(Debug, Clone)]
pub struct KeyExchange {
    pub alice_trits: Vec<u8>,
    pub bob_trits: Vec<u8>,
    pub circuits: Vec<Circuit>,
    pub key: String,
}

pub fn key_exchange(num_trits: usize, rng: &mut impl Rng) -> Result<KeyExchange, GradeError> {
    let sampler = Sampler::ideal();
    let mut exchange = KeyExchange {
        alice_trits: Vec::with_capacity(num_trits),
        bob_trits: Vec::with_capacity(num_trits),
        circuits: Vec::with_capacity(num_trits),
        key: String::new(),
    };
    for _ in 0..num_trits {
        let (a, b) = (rng.gen_range(0..3u8), rng.gen_range(0..3u8));
        let qc = trit_circuit(a, b);
        if (a, b) == (1, 0) || (a, b) == (2, 1) {
            let counts = sampler.run(&qc, 1, rng)?;
            if let Some(bit) = counts.keys().next().and_then(|k| k.chars().last()) {
                exchange.key.push(bit);
            }
        }
        exchange.alice_trits.push(a);
        exchange.bob_trits.push(b);
        exchange.circuits.push(qc);
    }
    Ok(exchange)
}

// --- 5: Trotterisation ---

fn bond_step(qc: &mut Circuit, k: usize, tau: f64) {
    qc.rxx(2.0 * tau, k, k + 1)
        .ryy(2.0 * tau, k, k + 1)
        .rzz(2.0 * tau, k, k + 1);
}

/// Second-order (symmetric) product formula for the 5-qubit Heisenberg chain.
pub fn trotter(dt: f64, steps: usize) -> Circuit {
    let num_qubits = 5;
    let last = num_qubits - 2;
    let mut qc = Circuit::new(num_qubits, 0);
    for _ in 0..steps {
        for k in 0..last {
            bond_step(&mut qc, k, dt / 2.0);
        }
        bond_step(&mut qc, last, dt);
        for k in (0..last).rev() {
            bond_step(&mut qc, k, dt / 2.0);
        }
    }
    qc
}

// --- 6: portfolio optimisation ---

pub const COST_LINEAR: [f64; 4] = [
    -1.40136924e-02,
    9.10195502e-04,
    -1.22168206e-04,
    -7.71059545e-04,
];

pub const COST_QUADRATIC: [((usize, usize), f64); 6] = [
    ((0, 1), 7.3402298e-05),
    ((0, 2), 1.28600606e-04),
    ((0, 3), -9.9861155e-05),
    ((1, 2), 5.3042759e-05),
    ((1, 3), 4.4481621e-05),
    ((2, 3), -1.23887379e-04),
];

/// (I - Z_qubit) / 2 on `num_assets` qubits.
pub fn asset_operator(qubit: usize, num_assets: usize) -> SparsePauliOp {
    SparsePauliOp::new(num_assets)
        .with_term(PauliTerm::new().with_coefficient(0.5))
        .with_term(PauliTerm::new().with_pauli(qubit, Pauli::Z).with_coefficient(-0.5))
}

pub fn cost_hamiltonian() -> SparsePauliOp {
    SparsePauliOp::from_qubo(4, &COST_LINEAR, &COST_QUADRATIC, 0.0)
}

/// (sum_i x_i - 2)^2: pick exactly two of four assets.
pub fn constraint_hamiltonian() -> SparsePauliOp {
    let pairs: Vec<((usize, usize), f64)> = (0..4)
        .flat_map(|i| (i + 1..4).map(move |j| ((i, j), 2.0)))
        .collect();
    SparsePauliOp::from_qubo(4, &[-3.0; 4], &pairs, 4.0)
}

/// Uniform superposition over the even-parity 4-bit strings.
pub fn initial_state() -> Circuit {
    let mut qc = Circuit::new(4, 0);
    qc.h(0).h(1).h(2).cx(0, 3).cx(1, 3).cx(2, 3);
    qc
}

// --- 7: quantum machine learning ---

pub fn ansatz() -> Circuit {
    let mut qc = Circuit::new(4, 0);
    for q in 0..4 {
        qc.add_gate(Gate::RY(q, Angle::param(format!("θ[{}]", q))));
    }
    for q in 0..3 {
        qc.cx(q, q + 1);
    }
    qc
}

/// Train and test kernels of two well separated one-feature clusters.
pub struct KernelDataset {
    pub train_kernel: DMatrix<f64>,
    pub train_labels: Vec<i64>,
    pub test_kernel: DMatrix<f64>,
    pub test_labels: Vec<i64>,
}

pub fn kernel_dataset() -> Result<KernelDataset, GradeError> {
    let cluster = |offset: f64, xs: &[f64]| xs.iter().map(|x| vec![offset + x]).collect::<Vec<_>>();
    let train_steps = [0.0, 0.05, 0.1, 0.15, 0.2, 0.25];
    let test_steps = [0.02, 0.12, 0.22];
    let train: Vec<Vec<f64>> = [cluster(0.0, &train_steps), cluster(1.0, &train_steps)].concat();
    let test: Vec<Vec<f64>> = [cluster(0.0, &test_steps), cluster(1.0, &test_steps)].concat();
    let labels = |per_class: usize| [vec![0i64; per_class], vec![1i64; per_class]].concat();
    Ok(KernelDataset {
        train_kernel: kernel_matrix(&zz_feature_map, &train, &train)?,
        train_labels: labels(train_steps.len()),
        test_kernel: kernel_matrix(&zz_feature_map, &test, &train)?,
        test_labels: labels(test_steps.len()),
    })
}

// --- 8: data encoding ---

/// sqrt(5/6) |0> + sqrt(1/6) |519> on ten qubits.
pub fn data_encoding() -> Circuit {
    let mut qc = Circuit::new(10, 0);
    qc.ry(2.0 * (5.0f64 / 6.0).sqrt().acos(), 9);
    for target in 0..3 {
        qc.cx(9, target);
    }
    qc
}

// --- 9: error correction ---

/// Three-qubit bit-flip code: syndrome on qubits 3 and 4, corrected through
/// gates conditioned on the two syndrome bits.
pub fn bit_flip_code() -> Circuit {
    let mut qc = Circuit::new(5, 2);
    qc.cx(0, 1).cx(0, 2);
    qc.cx(0, 3).cx(1, 3).cx(1, 4).cx(2, 4);
    qc.measure(3, 0).measure(4, 1);
    qc.if_value(&[0, 1], 1, Gate::X(0))
        .if_value(&[0, 1], 3, Gate::X(1))
        .if_value(&[0, 1], 2, Gate::X(2));
    qc
}

/// Nine-qubit Shor code with bit-flip syndromes on 9..15 and phase-flip
/// syndromes on 15 and 16.
pub fn shor_code() -> Circuit {
    let mut qc = Circuit::new(17, 8);
    qc.cx(0, 3).cx(0, 6);
    qc.h(0).h(3).h(6);
    for block in [0, 3, 6] {
        qc.cx(block, block + 1).cx(block, block + 2);
    }
    for k in 0..3 {
        let (a, b) = (9 + 2 * k, 10 + 2 * k);
        qc.cx(3 * k, a).cx(3 * k + 1, a).cx(3 * k + 1, b).cx(3 * k + 2, b);
    }
    qc.h(15);
    for d in 0..6 {
        qc.cx(15, d);
    }
    qc.h(15).h(16);
    for d in 3..9 {
        qc.cx(16, d);
    }
    qc.h(16);
    qc.barrier(&[]);
    for (c, q) in (9..17).enumerate() {
        qc.measure(q, c);
    }
    qc
}

/// Initial layout placing the Shor code on Rochester with few swaps.
pub const SHOR_LAYOUT: [usize; 17] = [11, 23, 24, 10, 8, 5, 12, 6, 14, 22, 25, 9, 0, 13, 15, 21, 7];

// --- Dispatch ---

/// Grades the reference solution of a check; `None` where no answer can be
/// constructed (the tabulated swap-test kernel and the data-file Hamiltonians).
pub fn demo(grader: &mut Grader, key: &str) -> Result<Option<Verdict>, GradeError> {
    let info = checks::find(key).ok_or_else(|| GradeError::UnknownCheck(key.to_string()))?;
    let verdict = match info.id {
        "1a" => grader.ghz_state(&ghz())?,
        "1b" => grader.ghz_on_device(&ghz_for_burlington())?,
        "2a" => grader.folding(fold)?,
        "2b" => grader.pauli_observable(&mixed_observable()?.into())?,
        "2c" => {
            let observable: Observable = mixed_observable()?.into();
            grader.zero_noise_extrapolation(linear_extrapolation, &observable, &[0, 1, 2], fold)?
        }
        "3a" => grader.fourier_transform(|n| Ok(fourier(n)))?,
        "3b" => grader.controlled_power(|p| Ok(controlled_power(p)))?,
        "3c" => grader.phase_estimation(phase_estimation)?,
        "4a" => grader.measurement_bases(&alice_bases(), &bob_bases())?,
        "4b" => {
            let exchange = key_exchange(90, grader.rng())?;
            grader.trit_operations(&exchange.circuits, &exchange.alice_trits, &exchange.bob_trits)?
        }
        "4c" => {
            let exchange = key_exchange(400, grader.rng())?;
            grader.key_distribution(&exchange.key, &exchange.alice_trits, &exchange.bob_trits)?
        }
        "5" => grader.trotterization(|dt, steps| Ok(trotter(dt, steps)))?,
        "6a" => grader.asset_operator(|q, n| Ok(asset_operator(q, n).into()))?,
        "6b" => grader.cost_hamiltonian(&cost_hamiltonian().into())?,
        "6c" => grader.constraint_hamiltonian(&constraint_hamiltonian().into())?,
        "6d" => grader.initial_state(&initial_state())?,
        "7a" => grader.ansatz(|| Ok(ansatz()))?,
        "7c" => {
            let data = kernel_dataset()?;
            grader.classifier(
                &data.train_kernel,
                &data.train_labels,
                &data.test_kernel,
                &data.test_labels,
            )?
        }
        "8a" => grader.data_encoding(&data_encoding())?,
        "9a" => grader.bit_flip_code(&bit_flip_code())?,
        "9b" => grader.shor_code_cx(&shor_code())?,
        "9c" => grader.shor_code_layout(|| Ok(shor_code()), &SHOR_LAYOUT)?,
        _ => return Ok(None),
    };
    Ok(Some(verdict))
}

/// Grades a single circuit against a circuit-input check.
pub fn grade_circuit(grader: &mut Grader, key: &str, circuit: &Circuit) -> Result<Verdict, GradeError> {
    let info = checks::find(key).ok_or_else(|| GradeError::UnknownCheck(key.to_string()))?;
    if info.kind != CandidateKind::Circuit {
        return Err(GradeError::NotCircuitInput(info.id.to_string()));
    }
    match info.id {
        "1a" => grader.ghz_state(circuit),
        "1b" => grader.ghz_on_device(circuit),
        "6d" => grader.initial_state(circuit),
        "8a" => grader.data_encoding(circuit),
        "9a" => grader.bit_flip_code(circuit),
        "9b" => grader.shor_code_cx(circuit),
        other => Err(GradeError::NotCircuitInput(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn extrapolation_recovers_a_line() {
        let values: Vec<f64> = [0usize, 1, 2, 3].iter().map(|&n| -0.1 * (2 * n + 1) as f64 + 2.0).collect();
        let (a, b) = linear_extrapolation(&[0, 1, 2, 3], &values).unwrap();
        assert!((a + 0.1).abs() < 1e-12);
        assert!((b - 2.0).abs() < 1e-12);
        assert!(linear_extrapolation(&[0], &[1.0]).is_err());
    }

    #[test]
    fn folding_multiplies_depth() {
        let mut qc = Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        assert_eq!(fold(&qc, 2).unwrap().depth(), qc.depth() * 5);
    }

    #[test]
    fn shor_code_shape() {
        let qc = shor_code();
        assert_eq!(qc.count_ops().get("cx"), Some(&32));
        assert_eq!(qc.num_qubits, 17);
    }

    #[test]
    fn key_exchange_keeps_matching_bases() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let exchange = key_exchange(60, &mut rng).unwrap();
        let matching = exchange
            .alice_trits
            .iter()
            .zip(&exchange.bob_trits)
            .filter(|&(&a, &b)| (a, b) == (1, 0) || (a, b) == (2, 1))
            .count();
        assert_eq!(exchange.key.len(), matching);
        assert!(exchange.key.chars().all(|c| c == '0' || c == '1'));
    }
}
