use nalgebra::DMatrix;
use num_complex::Complex64;
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

mod observable;

pub use observable::Observable;
pub use qsim::Pauli;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PauliError {
    #[error("Cannot parse Pauli term '{0}'")]
    Parse(String),
    #[error("Invalid Pauli label '{0}'")]
    Label(String),
    #[error("Label '{label}' has length {found}, expected {expected}")]
    LabelLength {
        label: String,
        expected: usize,
        found: usize,
    },
    #[error("Matrix of shape {rows}x{cols} is not a square power-of-two operator")]
    Dimension { rows: usize, cols: usize },
    #[error("Operators act on {left} and {right} qubits")]
    Mismatch { left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PauliTerm {
    pub coefficient: Complex64,
    pub operators: Vec<(Pauli, usize)>, // Vec of (Pauli type, qubit index)
}

impl PauliTerm {
    pub fn new() -> Self {
        PauliTerm {
            coefficient: Complex64::new(1.0, 0.0),
            operators: Vec::new(),
        }
    }

    pub fn with_pauli(mut self, qubit_index: usize, pauli: Pauli) -> Self {
        if pauli != Pauli::I {
            self.operators.retain(|&(_, q)| q != qubit_index);
            self.operators.push((pauli, qubit_index));
            self.operators.sort_by_key(|&(_, q_idx)| q_idx);
        }
        self
    }

    pub fn with_coefficient(mut self, coefficient: impl Into<Complex64>) -> Self {
        self.coefficient = coefficient.into();
        self
    }

    /// Highest qubit index touched plus one.
    pub fn min_qubits(&self) -> usize {
        self.operators.iter().map(|&(_, q)| q + 1).max().unwrap_or(0)
    }

    /// Big-endian label over `num_qubits` qubits, e.g. "XIZ" has Z on qubit 0.
    pub fn label(&self, num_qubits: usize) -> String {
        (0..num_qubits)
            .rev()
            .map(|q| {
                self.operators
                    .iter()
                    .find(|&&(_, idx)| idx == q)
                    .map_or('I', |&(p, _)| p.to_char())
            })
            .collect()
    }

    /// Bit flips of the string and the phase it applies to basis state `index`.
    fn action(&self, index: usize) -> (usize, Complex64) {
        self.operators.iter().fold(
            (0usize, Complex64::new(1.0, 0.0)),
            |(flips, phase), &(pauli, q)| {
                let (flip, factor) = pauli.act_on_bit((index >> q) & 1 == 1);
                (if flip { flips | (1 << q) } else { flips }, phase * factor)
            },
        )
    }
}

impl Default for PauliTerm {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for PauliTerm {
    type Err = PauliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PauliError::Parse(s.to_string());
        let parts: Vec<&str> = s.split('*').map(|p| p.trim()).collect();
        if parts.len() != 2 {
            return Err(err());
        }

        let coefficient = parts[0].parse::<f64>().map_err(|_| err())?;
        let mut term = PauliTerm::new().with_coefficient(coefficient);

        for op in parts[1].split_whitespace() {
            if op.len() < 2 {
                return Err(err());
            }
            let (pauli_char, qubit_idx_str) = op.split_at(1);
            let qubit_index = qubit_idx_str.parse::<usize>().map_err(|_| err())?;
            let pauli = pauli_char
                .chars()
                .next()
                .and_then(Pauli::from_char)
                .ok_or_else(err)?;
            term = term.with_pauli(qubit_index, pauli);
        }

        Ok(term)
    }
}

impl fmt::Display for PauliTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficient.im == 0.0 {
            write!(f, "{:.8}", self.coefficient.re)?;
        } else {
            write!(f, "({:.8}{:+.8}i)", self.coefficient.re, self.coefficient.im)?;
        }
        if !self.operators.is_empty() {
            write!(f, " *")?;
            for (pauli, qubit_index) in &self.operators {
                write!(f, " {}{}", pauli, qubit_index)?;
            }
        }
        Ok(())
    }
}

/// Weighted sum of Pauli strings on `num_qubits` qubits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparsePauliOp {
    pub num_qubits: usize,
    pub terms: Vec<PauliTerm>,
}

impl SparsePauliOp {
    pub fn new(num_qubits: usize) -> Self {
        SparsePauliOp {
            num_qubits,
            terms: Vec::new(),
        }
    }

    pub fn add_term(&mut self, term: PauliTerm) {
        self.num_qubits = self.num_qubits.max(term.min_qubits());
        self.terms.push(term);
    }

    pub fn with_term(mut self, term: PauliTerm) -> Self {
        self.add_term(term);
        self
    }

    /// Builds from big-endian labels: the last character acts on qubit 0.
    pub fn from_list<C: Into<Complex64> + Copy>(list: &[(&str, C)]) -> Result<Self, PauliError> {
        let num_qubits = list.first().map_or(0, |(label, _)| label.len());
        let mut op = SparsePauliOp::new(num_qubits);
        for &(label, coefficient) in list {
            if label.len() != num_qubits {
                return Err(PauliError::LabelLength {
                    label: label.to_string(),
                    expected: num_qubits,
                    found: label.len(),
                });
            }
            let mut term = PauliTerm::new().with_coefficient(coefficient);
            for (position, c) in label.chars().enumerate() {
                let pauli = Pauli::from_char(c).ok_or_else(|| PauliError::Label(label.to_string()))?;
                term = term.with_pauli(num_qubits - 1 - position, pauli);
            }
            op.terms.push(term);
        }
        Ok(op)
    }

    /// Pauli decomposition of a dense operator; coefficients below 1e-12 are dropped.
    pub fn from_operator(matrix: &DMatrix<Complex64>) -> Result<Self, PauliError> {
        let (rows, cols) = matrix.shape();
        if rows != cols || !rows.is_power_of_two() {
            return Err(PauliError::Dimension { rows, cols });
        }
        let num_qubits = rows.trailing_zeros() as usize;
        let paulis = [Pauli::I, Pauli::X, Pauli::Y, Pauli::Z];
        let mut op = SparsePauliOp::new(num_qubits);
        for code in 0..(1usize << (2 * num_qubits)) {
            let term = (0..num_qubits).fold(PauliTerm::new(), |t, q| {
                t.with_pauli(q, paulis[(code >> (2 * q)) & 3])
            });
            // Tr(P M) / d, using that P has one entry per column
            let trace: Complex64 = (0..rows)
                .map(|k| {
                    let (flips, phase) = term.action(k);
                    phase * matrix[(k, k ^ flips)]
                })
                .sum();
            let coefficient = trace / rows as f64;
            if coefficient.norm() > 1e-12 {
                op.terms.push(term.with_coefficient(coefficient));
            }
        }
        Ok(op)
    }

    /// Binary objective sum_i l_i x_i + sum_{i<j} q_ij x_i x_j + c with x_i = (I - Z_i) / 2.
    pub fn from_qubo(
        num_qubits: usize,
        linear: &[f64],
        quadratic: &[((usize, usize), f64)],
        constant: f64,
    ) -> SparsePauliOp {
        let z = |q: usize| PauliTerm::new().with_pauli(q, Pauli::Z);
        let mut op = SparsePauliOp::new(num_qubits);
        let mut offset = constant;
        for (i, &l) in linear.iter().enumerate() {
            offset += l / 2.0;
            op.add_term(z(i).with_coefficient(-l / 2.0));
        }
        for &((i, j), w) in quadratic {
            offset += w / 4.0;
            op.add_term(z(i).with_coefficient(-w / 4.0));
            op.add_term(z(j).with_coefficient(-w / 4.0));
            op.add_term(z(i).with_pauli(j, Pauli::Z).with_coefficient(w / 4.0));
        }
        op.add_term(PauliTerm::new().with_coefficient(offset));
        op.simplify(1e-12)
    }

    /// Merges repeated Pauli strings and drops coefficients with |c| <= atol.
    pub fn simplify(&self, atol: f64) -> SparsePauliOp {
        let mut merged: Vec<PauliTerm> = Vec::new();
        for term in &self.terms {
            match merged.iter_mut().find(|t| t.operators == term.operators) {
                Some(existing) => existing.coefficient += term.coefficient,
                None => merged.push(term.clone()),
            }
        }
        merged.retain(|t| t.coefficient.norm() > atol);
        SparsePauliOp {
            num_qubits: self.num_qubits,
            terms: merged,
        }
    }

    /// Dense little-endian matrix.
    pub fn to_matrix(&self) -> DMatrix<Complex64> {
        let dim = 1usize << self.num_qubits;
        let mut matrix = DMatrix::zeros(dim, dim);
        for term in &self.terms {
            for col in 0..dim {
                let (flips, phase) = term.action(col);
                matrix[(col ^ flips, col)] += term.coefficient * phase;
            }
        }
        matrix
    }

    pub fn labels(&self) -> Vec<(String, Complex64)> {
        self.terms
            .iter()
            .map(|t| (t.label(self.num_qubits), t.coefficient))
            .collect()
    }

    /// <psi|H|psi> on a state of the same width.
    pub fn expectation(&self, state: &qsim::StateVector) -> Result<f64, PauliError> {
        if state.num_qubits != self.num_qubits {
            return Err(PauliError::Mismatch {
                left: self.num_qubits,
                right: state.num_qubits,
            });
        }
        Ok(self
            .terms
            .iter()
            .map(|term| {
                state
                    .amplitudes
                    .iter()
                    .enumerate()
                    .map(|(k, amp)| {
                        let (flips, phase) = term.action(k);
                        state.amplitudes[k ^ flips].conj() * phase * amp
                    })
                    .sum::<Complex64>()
                    * term.coefficient
            })
            .sum::<Complex64>()
            .re)
    }
}

impl Add for SparsePauliOp {
    type Output = SparsePauliOp;

    fn add(mut self, rhs: SparsePauliOp) -> SparsePauliOp {
        self.num_qubits = self.num_qubits.max(rhs.num_qubits);
        self.terms.extend(rhs.terms);
        self
    }
}

impl Mul<f64> for SparsePauliOp {
    type Output = SparsePauliOp;

    fn mul(mut self, rhs: f64) -> SparsePauliOp {
        for term in &mut self.terms {
            term.coefficient *= rhs;
        }
        self
    }
}

/// Display trait for the entire operator.
impl fmt::Display for SparsePauliOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, "\n+ ")?;
            }
            write!(f, "{}", term)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_parse_pauli_term() {
        let term_str = "0.5 * X0 Z1";
        let term = PauliTerm::from_str(term_str).unwrap();
        assert_eq!(term.coefficient, c(0.5, 0.0));
        assert_eq!(term.operators, vec![(Pauli::X, 0), (Pauli::Z, 1)]);
        assert!(PauliTerm::from_str("0.5 * Q0").is_err());
    }

    #[test]
    fn test_operator_display() {
        let h2 = SparsePauliOp::new(2)
            .with_term(PauliTerm::from_str("-0.8126 * I0").unwrap())
            .with_term(PauliTerm::from_str("0.1712 * Z0").unwrap())
            .with_term(PauliTerm::from_str("-0.2228 * Z1").unwrap())
            .with_term(PauliTerm::from_str("0.1686 * Z0 Z1").unwrap())
            .with_term(PauliTerm::from_str("0.0453 * X0 X1").unwrap());

        let display_str = h2.to_string();
        assert!(display_str.contains("-0.8126"));
        assert!(display_str.contains("X0 X1"));
    }

    #[test]
    fn test_labels_are_big_endian() {
        let op = SparsePauliOp::from_list(&[("XY", 1.0)]).unwrap();
        assert_eq!(op.terms[0].operators, vec![(Pauli::Y, 0), (Pauli::X, 1)]);
        assert_eq!(op.labels()[0].0, "XY");
        // X on qubit 1, Y on qubit 0: XY |01> = -i |10>
        let m = op.to_matrix();
        assert!((m[(2, 1)] - c(0.0, -1.0)).norm() < EPSILON);
    }

    #[test]
    fn test_mixed_observable_matrix() {
        let op = SparsePauliOp::from_list(&[("XY", 1.0), ("YX", 2.0), ("ZX", 3.0)]).unwrap();
        let m = op.to_matrix();
        let expected = [
            [c(0., 0.), c(3., 0.), c(0., 0.), c(0., -3.)],
            [c(3., 0.), c(0., 0.), c(0., -1.), c(0., 0.)],
            [c(0., 0.), c(0., 1.), c(0., 0.), c(-3., 0.)],
            [c(0., 3.), c(0., 0.), c(-3., 0.), c(0., 0.)],
        ];
        for (r, row) in expected.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                assert!((m[(r, col)] - value).norm() < EPSILON, "({}, {})", r, col);
            }
        }
    }

    #[test]
    fn test_decomposition_round_trip() {
        let op = SparsePauliOp::from_list(&[("IZ", c(0.5, 0.0)), ("XY", c(0.0, 0.25))]).unwrap();
        let back = SparsePauliOp::from_operator(&op.to_matrix()).unwrap();
        assert!((back.to_matrix() - op.to_matrix()).norm() < EPSILON);
        assert_eq!(back.terms.len(), 2);
        let bad = DMatrix::<Complex64>::zeros(3, 3);
        assert!(SparsePauliOp::from_operator(&bad).is_err());
    }

    #[test]
    fn test_qubo_is_diagonal_objective() {
        // (x0 + x1 - 1)^2 = -x0 - x1 + 2 x0 x1 + 1
        let op = SparsePauliOp::from_qubo(2, &[-1.0, -1.0], &[((0, 1), 2.0)], 1.0);
        let m = op.to_matrix();
        let diagonal: Vec<f64> = (0..4).map(|i| m[(i, i)].re).collect();
        assert_eq!(diagonal.len(), 4);
        for (value, expected) in diagonal.iter().zip([1.0, 0.0, 0.0, 1.0]) {
            assert!((value - expected).abs() < EPSILON);
        }
    }

    #[test]
    fn test_expectation_on_state() {
        let mut qc = qsim::Circuit::new(2, 0);
        qc.h(0).cx(0, 1);
        let state = qsim::StateVector::from_circuit(&qc).unwrap();
        let zz = SparsePauliOp::from_list(&[("ZZ", 1.0), ("XX", 1.0)]).unwrap();
        assert!((zz.expectation(&state).unwrap() - 2.0).abs() < EPSILON);
    }
}
