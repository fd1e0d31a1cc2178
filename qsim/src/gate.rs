use crate::error::SimError;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

// custom type for single-qubit gate matrices
pub type GateMatrix = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

pub const IDENTITY: GateMatrix = [[ONE, ZERO], [ZERO, ONE]];

pub const HADAMARD: GateMatrix = [
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(FRAC_1_SQRT_2, 0.0),
    ],
    [
        Complex64::new(FRAC_1_SQRT_2, 0.0),
        Complex64::new(-FRAC_1_SQRT_2, 0.0),
    ],
];

pub const PAULI_X: GateMatrix = [[ZERO, ONE], [ONE, ZERO]];

pub const PAULI_Y: GateMatrix = [
    [ZERO, Complex64::new(0.0, -1.0)],
    [Complex64::new(0.0, 1.0), ZERO],
];

pub const PAULI_Z: GateMatrix = [[ONE, ZERO], [ZERO, Complex64::new(-1.0, 0.0)]];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    pub fn matrix(self) -> GateMatrix {
        match self {
            Pauli::I => IDENTITY,
            Pauli::X => PAULI_X,
            Pauli::Y => PAULI_Y,
            Pauli::Z => PAULI_Z,
        }
    }

    pub fn from_char(c: char) -> Option<Pauli> {
        match c {
            'I' | 'i' => Some(Pauli::I),
            'X' | 'x' => Some(Pauli::X),
            'Y' | 'y' => Some(Pauli::Y),
            'Z' | 'z' => Some(Pauli::Z),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }

    /// Action on a computational basis bit: (flips the bit, phase picked up).
    pub fn act_on_bit(self, bit: bool) -> (bool, Complex64) {
        match (self, bit) {
            (Pauli::I, _) => (false, ONE),
            (Pauli::X, _) => (true, ONE),
            (Pauli::Y, false) => (true, Complex64::new(0.0, 1.0)),
            (Pauli::Y, true) => (true, Complex64::new(0.0, -1.0)),
            (Pauli::Z, false) => (false, ONE),
            (Pauli::Z, true) => (false, Complex64::new(-1.0, 0.0)),
        }
    }
}

impl std::fmt::Display for Pauli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A rotation angle: either a number or a (scaled) named parameter bound later.
#[derive(Debug, Clone, PartialEq)]
pub enum Angle {
    Value(f64),
    Param { name: String, scale: f64 },
}

impl Angle {
    pub fn param(name: impl Into<String>) -> Self {
        Angle::Param {
            name: name.into(),
            scale: 1.0,
        }
    }

    pub fn value(&self) -> Result<f64, SimError> {
        match self {
            Angle::Value(v) => Ok(*v),
            Angle::Param { name, .. } => Err(SimError::UnboundParameter(name.clone())),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Angle::Value(_) => None,
            Angle::Param { name, .. } => Some(name),
        }
    }

    pub fn scaled(&self, factor: f64) -> Angle {
        match self {
            Angle::Value(v) => Angle::Value(v * factor),
            Angle::Param { name, scale } => Angle::Param {
                name: name.clone(),
                scale: scale * factor,
            },
        }
    }

    pub fn negated(&self) -> Angle {
        self.scaled(-1.0)
    }

    fn bind(&self, values: &HashMap<String, f64>) -> Angle {
        match self {
            Angle::Param { name, scale } => match values.get(name) {
                Some(v) => Angle::Value(v * scale),
                None => self.clone(),
            },
            Angle::Value(_) => self.clone(),
        }
    }
}

impl From<f64> for Angle {
    fn from(value: f64) -> Self {
        Angle::Value(value)
    }
}

/// Classical condition: the integer read from `clbits` (first bit least significant)
/// must equal `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub clbits: Vec<usize>,
    pub value: u64,
}

impl Condition {
    pub fn holds(&self, register: &[bool]) -> bool {
        let read = self
            .clbits
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &c)| {
                acc | (u64::from(register.get(c).copied().unwrap_or(false)) << i)
            });
        read == self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    I(usize),
    H(usize),
    X(usize),
    Y(usize),
    Z(usize),
    S(usize),
    Sdg(usize),
    T(usize),
    Tdg(usize),
    SX(usize),
    SXdg(usize),
    RX(usize, Angle),
    RY(usize, Angle),
    RZ(usize, Angle),
    P(usize, Angle),
    /// Generic single-qubit rotation U(theta, phi, lambda).
    U(usize, Angle, Angle, Angle),
    CX(usize, usize),
    CY(usize, usize),
    CZ(usize, usize),
    CP(usize, usize, Angle),
    Swap(usize, usize),
    RXX(usize, usize, Angle),
    RYY(usize, usize, Angle),
    RZZ(usize, usize, Angle),
    CCX(usize, usize, usize),
    /// Multi-controlled phase: controls, target, angle.
    MCP(Vec<usize>, usize, Angle),
    /// Arbitrary unitary on the listed qubits (first qubit is the least significant local bit).
    Unitary(Vec<usize>, DMatrix<Complex64>),
    Measure(usize, usize),
    Reset(usize),
    Barrier(Vec<usize>),
    IfValue(Condition, Box<Gate>),
}

impl Gate {
    /// Operation name, following the usual OpenQASM / Qiskit spelling.
    pub fn name(&self) -> &'static str {
        match self {
            Gate::I(_) => "id",
            Gate::H(_) => "h",
            Gate::X(_) => "x",
            Gate::Y(_) => "y",
            Gate::Z(_) => "z",
            Gate::S(_) => "s",
            Gate::Sdg(_) => "sdg",
            Gate::T(_) => "t",
            Gate::Tdg(_) => "tdg",
            Gate::SX(_) => "sx",
            Gate::SXdg(_) => "sxdg",
            Gate::RX(..) => "rx",
            Gate::RY(..) => "ry",
            Gate::RZ(..) => "rz",
            Gate::P(..) => "p",
            Gate::U(..) => "u",
            Gate::CX(..) => "cx",
            Gate::CY(..) => "cy",
            Gate::CZ(..) => "cz",
            Gate::CP(..) => "cp",
            Gate::Swap(..) => "swap",
            Gate::RXX(..) => "rxx",
            Gate::RYY(..) => "ryy",
            Gate::RZZ(..) => "rzz",
            Gate::CCX(..) => "ccx",
            Gate::MCP(..) => "mcphase",
            Gate::Unitary(..) => "unitary",
            Gate::Measure(..) => "measure",
            Gate::Reset(_) => "reset",
            Gate::Barrier(_) => "barrier",
            Gate::IfValue(_, gate) => gate.name(),
        }
    }

    pub fn qubits(&self) -> Vec<usize> {
        match self {
            Gate::I(q)
            | Gate::H(q)
            | Gate::X(q)
            | Gate::Y(q)
            | Gate::Z(q)
            | Gate::S(q)
            | Gate::Sdg(q)
            | Gate::T(q)
            | Gate::Tdg(q)
            | Gate::SX(q)
            | Gate::SXdg(q)
            | Gate::RX(q, _)
            | Gate::RY(q, _)
            | Gate::RZ(q, _)
            | Gate::P(q, _)
            | Gate::U(q, ..)
            | Gate::Measure(q, _)
            | Gate::Reset(q) => vec![*q],
            Gate::CX(a, b)
            | Gate::CY(a, b)
            | Gate::CZ(a, b)
            | Gate::CP(a, b, _)
            | Gate::Swap(a, b)
            | Gate::RXX(a, b, _)
            | Gate::RYY(a, b, _)
            | Gate::RZZ(a, b, _) => vec![*a, *b],
            Gate::CCX(a, b, t) => vec![*a, *b, *t],
            Gate::MCP(controls, target, _) => {
                let mut qubits = controls.clone();
                qubits.push(*target);
                qubits
            }
            Gate::Unitary(qubits, _) | Gate::Barrier(qubits) => qubits.clone(),
            Gate::IfValue(_, gate) => gate.qubits(),
        }
    }

    /// Classical bits read or written by the operation.
    pub fn clbits(&self) -> Vec<usize> {
        match self {
            Gate::Measure(_, c) => vec![*c],
            Gate::IfValue(condition, gate) => {
                let mut clbits = condition.clbits.clone();
                clbits.extend(gate.clbits());
                clbits
            }
            _ => Vec::new(),
        }
    }

    pub fn is_directive(&self) -> bool {
        matches!(self, Gate::Barrier(_))
    }

    /// True for operations with a unitary matrix (barriers excluded).
    pub fn is_unitary(&self) -> bool {
        !matches!(
            self,
            Gate::Measure(..) | Gate::Reset(_) | Gate::Barrier(_) | Gate::IfValue(..)
        )
    }

    pub fn angles(&self) -> Vec<&Angle> {
        match self {
            Gate::RX(_, a)
            | Gate::RY(_, a)
            | Gate::RZ(_, a)
            | Gate::P(_, a)
            | Gate::CP(_, _, a)
            | Gate::RXX(_, _, a)
            | Gate::RYY(_, _, a)
            | Gate::RZZ(_, _, a)
            | Gate::MCP(_, _, a) => vec![a],
            Gate::U(_, theta, phi, lambda) => vec![theta, phi, lambda],
            Gate::IfValue(_, gate) => gate.angles(),
            _ => Vec::new(),
        }
    }

    pub fn inverse(&self) -> Result<Gate, SimError> {
        let inverse = match self {
            Gate::S(q) => Gate::Sdg(*q),
            Gate::Sdg(q) => Gate::S(*q),
            Gate::T(q) => Gate::Tdg(*q),
            Gate::Tdg(q) => Gate::T(*q),
            Gate::SX(q) => Gate::SXdg(*q),
            Gate::SXdg(q) => Gate::SX(*q),
            Gate::RX(q, a) => Gate::RX(*q, a.negated()),
            Gate::RY(q, a) => Gate::RY(*q, a.negated()),
            Gate::RZ(q, a) => Gate::RZ(*q, a.negated()),
            Gate::P(q, a) => Gate::P(*q, a.negated()),
            Gate::U(q, theta, phi, lambda) => {
                Gate::U(*q, theta.negated(), lambda.negated(), phi.negated())
            }
            Gate::CP(c, t, a) => Gate::CP(*c, *t, a.negated()),
            Gate::RXX(a, b, theta) => Gate::RXX(*a, *b, theta.negated()),
            Gate::RYY(a, b, theta) => Gate::RYY(*a, *b, theta.negated()),
            Gate::RZZ(a, b, theta) => Gate::RZZ(*a, *b, theta.negated()),
            Gate::MCP(controls, target, a) => Gate::MCP(controls.clone(), *target, a.negated()),
            Gate::Unitary(qubits, m) => Gate::Unitary(qubits.clone(), m.adjoint()),
            Gate::Measure(..) | Gate::Reset(_) | Gate::IfValue(..) => {
                return Err(SimError::NonUnitary(self.name().to_string()));
            }
            // self-inverse: I, H, X, Y, Z, CX, CY, CZ, SWAP, CCX, barrier
            other => other.clone(),
        };
        Ok(inverse)
    }

    pub fn bind(&self, values: &HashMap<String, f64>) -> Gate {
        match self {
            Gate::RX(q, a) => Gate::RX(*q, a.bind(values)),
            Gate::RY(q, a) => Gate::RY(*q, a.bind(values)),
            Gate::RZ(q, a) => Gate::RZ(*q, a.bind(values)),
            Gate::P(q, a) => Gate::P(*q, a.bind(values)),
            Gate::U(q, t, p, l) => Gate::U(*q, t.bind(values), p.bind(values), l.bind(values)),
            Gate::CP(c, t, a) => Gate::CP(*c, *t, a.bind(values)),
            Gate::RXX(a, b, t) => Gate::RXX(*a, *b, t.bind(values)),
            Gate::RYY(a, b, t) => Gate::RYY(*a, *b, t.bind(values)),
            Gate::RZZ(a, b, t) => Gate::RZZ(*a, *b, t.bind(values)),
            Gate::MCP(controls, t, a) => Gate::MCP(controls.clone(), *t, a.bind(values)),
            Gate::IfValue(condition, gate) => {
                Gate::IfValue(condition.clone(), Box::new(gate.bind(values)))
            }
            other => other.clone(),
        }
    }

    /// Rewrites qubit and clbit indices through the given maps.
    pub fn remap(&self, q: &impl Fn(usize) -> usize, c: &impl Fn(usize) -> usize) -> Gate {
        match self {
            Gate::I(a) => Gate::I(q(*a)),
            Gate::H(a) => Gate::H(q(*a)),
            Gate::X(a) => Gate::X(q(*a)),
            Gate::Y(a) => Gate::Y(q(*a)),
            Gate::Z(a) => Gate::Z(q(*a)),
            Gate::S(a) => Gate::S(q(*a)),
            Gate::Sdg(a) => Gate::Sdg(q(*a)),
            Gate::T(a) => Gate::T(q(*a)),
            Gate::Tdg(a) => Gate::Tdg(q(*a)),
            Gate::SX(a) => Gate::SX(q(*a)),
            Gate::SXdg(a) => Gate::SXdg(q(*a)),
            Gate::RX(a, t) => Gate::RX(q(*a), t.clone()),
            Gate::RY(a, t) => Gate::RY(q(*a), t.clone()),
            Gate::RZ(a, t) => Gate::RZ(q(*a), t.clone()),
            Gate::P(a, t) => Gate::P(q(*a), t.clone()),
            Gate::U(a, t, p, l) => Gate::U(q(*a), t.clone(), p.clone(), l.clone()),
            Gate::CX(a, b) => Gate::CX(q(*a), q(*b)),
            Gate::CY(a, b) => Gate::CY(q(*a), q(*b)),
            Gate::CZ(a, b) => Gate::CZ(q(*a), q(*b)),
            Gate::CP(a, b, t) => Gate::CP(q(*a), q(*b), t.clone()),
            Gate::Swap(a, b) => Gate::Swap(q(*a), q(*b)),
            Gate::RXX(a, b, t) => Gate::RXX(q(*a), q(*b), t.clone()),
            Gate::RYY(a, b, t) => Gate::RYY(q(*a), q(*b), t.clone()),
            Gate::RZZ(a, b, t) => Gate::RZZ(q(*a), q(*b), t.clone()),
            Gate::CCX(a, b, t) => Gate::CCX(q(*a), q(*b), q(*t)),
            Gate::MCP(controls, t, a) => {
                Gate::MCP(controls.iter().map(|x| q(*x)).collect(), q(*t), a.clone())
            }
            Gate::Unitary(qubits, m) => Gate::Unitary(qubits.iter().map(|x| q(*x)).collect(), m.clone()),
            Gate::Measure(a, b) => Gate::Measure(q(*a), c(*b)),
            Gate::Reset(a) => Gate::Reset(q(*a)),
            Gate::Barrier(qubits) => Gate::Barrier(qubits.iter().map(|x| q(*x)).collect()),
            Gate::IfValue(condition, gate) => Gate::IfValue(
                Condition {
                    clbits: condition.clbits.iter().map(|x| c(*x)).collect(),
                    value: condition.value,
                },
                Box::new(gate.remap(q, c)),
            ),
        }
    }

    /// 2x2 matrix for single-qubit gates, `None` for anything wider.
    pub fn single_qubit_matrix(&self) -> Result<Option<GateMatrix>, SimError> {
        let i = Complex64::new(0.0, 1.0);
        let m = match self {
            Gate::I(_) => IDENTITY,
            Gate::H(_) => HADAMARD,
            Gate::X(_) => PAULI_X,
            Gate::Y(_) => PAULI_Y,
            Gate::Z(_) => PAULI_Z,
            Gate::S(_) => [[ONE, ZERO], [ZERO, i]],
            Gate::Sdg(_) => [[ONE, ZERO], [ZERO, -i]],
            Gate::T(_) => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, FRAC_PI_4)]],
            Gate::Tdg(_) => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, -FRAC_PI_4)]],
            Gate::SX(_) => {
                let (a, b) = (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5));
                [[a, b], [b, a]]
            }
            Gate::SXdg(_) => {
                let (a, b) = (Complex64::new(0.5, -0.5), Complex64::new(0.5, 0.5));
                [[a, b], [b, a]]
            }
            Gate::RX(_, theta) => {
                // Rx(θ) = cos(θ/2) I - i sin(θ/2) X
                let (c, s) = half_angle(theta.value()?);
                [
                    [Complex64::new(c, 0.0), Complex64::new(0.0, -s)],
                    [Complex64::new(0.0, -s), Complex64::new(c, 0.0)],
                ]
            }
            Gate::RY(_, theta) => {
                // Ry(θ) = cos(θ/2) I - i sin(θ/2) Y  -> matrix is real
                let (c, s) = half_angle(theta.value()?);
                [
                    [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
                    [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
                ]
            }
            Gate::RZ(_, theta) => {
                // Rz(θ) = diag(e^{-iθ/2}, e^{+iθ/2})
                let (c, s) = half_angle(theta.value()?);
                [
                    [Complex64::new(c, -s), ZERO],
                    [ZERO, Complex64::new(c, s)],
                ]
            }
            Gate::P(_, lambda) => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, lambda.value()?)]],
            Gate::U(_, theta, phi, lambda) => {
                u_matrix(theta.value()?, phi.value()?, lambda.value()?)
            }
            _ => return Ok(None),
        };
        Ok(Some(m))
    }

    /// Unitary matrix over `qubits()`, with the first listed qubit as the least significant bit.
    pub fn matrix(&self) -> Result<DMatrix<Complex64>, SimError> {
        if let Some(m) = self.single_qubit_matrix()? {
            return Ok(DMatrix::from_row_slice(2, 2, &[m[0][0], m[0][1], m[1][0], m[1][1]]));
        }
        let i = Complex64::new(0.0, 1.0);
        let m = match self {
            Gate::CX(..) => controlled(&PAULI_X),
            Gate::CY(..) => controlled(&PAULI_Y),
            Gate::CZ(..) => controlled(&PAULI_Z),
            Gate::CP(_, _, lambda) => controlled(&[
                [ONE, ZERO],
                [ZERO, Complex64::from_polar(1.0, lambda.value()?)],
            ]),
            Gate::Swap(..) => {
                let mut m = DMatrix::zeros(4, 4);
                m[(0, 0)] = ONE;
                m[(1, 2)] = ONE;
                m[(2, 1)] = ONE;
                m[(3, 3)] = ONE;
                m
            }
            Gate::RXX(_, _, theta) => {
                let (c, s) = half_angle(theta.value()?);
                let mut m = DMatrix::identity(4, 4) * Complex64::new(c, 0.0);
                for (r, col) in [(0, 3), (3, 0), (1, 2), (2, 1)] {
                    m[(r, col)] = -i * s;
                }
                m
            }
            Gate::RYY(_, _, theta) => {
                let (c, s) = half_angle(theta.value()?);
                let mut m = DMatrix::identity(4, 4) * Complex64::new(c, 0.0);
                m[(0, 3)] = i * s;
                m[(3, 0)] = i * s;
                m[(1, 2)] = -i * s;
                m[(2, 1)] = -i * s;
                m
            }
            Gate::RZZ(_, _, theta) => {
                let t = theta.value()? / 2.0;
                let (minus, plus) = (Complex64::from_polar(1.0, -t), Complex64::from_polar(1.0, t));
                DMatrix::from_diagonal(&nalgebra::DVector::from_vec(vec![minus, plus, plus, minus]))
            }
            Gate::CCX(..) => {
                let mut m = DMatrix::identity(8, 8);
                m[(3, 3)] = ZERO;
                m[(7, 7)] = ZERO;
                m[(3, 7)] = ONE;
                m[(7, 3)] = ONE;
                m
            }
            Gate::MCP(controls, _, lambda) => {
                let dim = 1 << (controls.len() + 1);
                let mut m = DMatrix::identity(dim, dim);
                m[(dim - 1, dim - 1)] = Complex64::from_polar(1.0, lambda.value()?);
                m
            }
            Gate::Unitary(qubits, m) => {
                let dim = 1 << qubits.len();
                if m.nrows() != dim || m.ncols() != dim {
                    return Err(SimError::Unsupported(format!(
                        "unitary of shape {}x{} on {} qubits",
                        m.nrows(),
                        m.ncols(),
                        qubits.len()
                    )));
                }
                m.clone()
            }
            other => return Err(SimError::NonUnitary(other.name().to_string())),
        };
        Ok(m)
    }
}

fn half_angle(theta: f64) -> (f64, f64) {
    let half = theta * 0.5;
    (half.cos(), half.sin())
}

pub fn u_matrix(theta: f64, phi: f64, lambda: f64) -> GateMatrix {
    let (c, s) = half_angle(theta);
    [
        [
            Complex64::new(c, 0.0),
            -Complex64::from_polar(s, lambda),
        ],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(c, phi + lambda),
        ],
    ]
}

/// Euler angles (theta, phi, lambda) with `m = e^{iα} U(theta, phi, lambda)`.
pub fn u_angles(m: &GateMatrix) -> (f64, f64, f64) {
    const EPS: f64 = 1e-12;
    let (a, b, c, d) = (m[0][0], m[0][1], m[1][0], m[1][1]);
    let theta = 2.0 * c.norm().atan2(a.norm());
    if a.norm() > EPS && c.norm() > EPS {
        let alpha = a.arg();
        (theta, c.arg() - alpha, (-b).arg() - alpha)
    } else if c.norm() <= EPS {
        // diagonal
        let alpha = a.arg();
        (theta, 0.0, d.arg() - alpha)
    } else {
        // anti-diagonal
        let alpha = (-b).arg();
        (theta, c.arg() - alpha, 0.0)
    }
}

/// Controlled version of a single-qubit matrix; local bit 0 is the control.
fn controlled(m: &GateMatrix) -> DMatrix<Complex64> {
    let mut out = DMatrix::zeros(4, 4);
    out[(0, 0)] = ONE;
    out[(2, 2)] = ONE;
    out[(1, 1)] = m[0][0];
    out[(1, 3)] = m[0][1];
    out[(3, 1)] = m[1][0];
    out[(3, 3)] = m[1][1];
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < EPSILON
    }

    #[test]
    fn test_u_angles_reconstruct_matrix_up_to_phase() {
        for gate in [
            Gate::H(0),
            Gate::Sdg(0),
            Gate::X(0),
            Gate::RY(0, Angle::Value(0.3)),
            Gate::U(0, 1.1.into(), (-0.4).into(), 2.5.into()),
        ] {
            let m = gate.single_qubit_matrix().unwrap().unwrap();
            let (theta, phi, lambda) = u_angles(&m);
            let u = u_matrix(theta, phi, lambda);
            // pick the global phase from the largest entry
            let (r, c) = if m[0][0].norm() > 0.5 { (0, 0) } else { (1, 0) };
            let phase = m[r][c] / u[r][c];
            for row in 0..2 {
                for col in 0..2 {
                    assert!(approx_eq(m[row][col], phase * u[row][col]), "{:?}", gate);
                }
            }
        }
    }

    #[test]
    fn test_inverse_of_u_gate() {
        let gate = Gate::U(0, 0.7.into(), 0.2.into(), (-1.3).into());
        let m = gate.matrix().unwrap();
        let inv = gate.inverse().unwrap().matrix().unwrap();
        let product = m * inv;
        assert!(approx_eq(product[(0, 0)], ONE));
        assert!(approx_eq(product[(0, 1)], ZERO));
        assert!(approx_eq(product[(1, 1)], ONE));
    }

    #[test]
    fn test_cx_matrix_uses_first_qubit_as_control() {
        let m = Gate::CX(0, 1).matrix().unwrap();
        // |control=1, target=0> is local index 1 and must map to index 3
        assert!(approx_eq(m[(3, 1)], ONE));
        assert!(approx_eq(m[(1, 3)], ONE));
        assert!(approx_eq(m[(2, 2)], ONE));
    }

    #[test]
    fn test_unbound_parameter_is_reported() {
        let gate = Gate::RZ(0, Angle::param("theta"));
        assert!(matches!(
            gate.matrix(),
            Err(SimError::UnboundParameter(name)) if name == "theta"
        ));
        let mut values = HashMap::new();
        values.insert("theta".to_string(), PI);
        assert!(gate.bind(&values).matrix().is_ok());
    }

    #[test]
    fn test_condition_reads_little_endian_register() {
        let condition = Condition {
            clbits: vec![0, 1],
            value: 2,
        };
        assert!(condition.holds(&[false, true, false]));
        assert!(!condition.holds(&[true, false, false]));
    }
}
