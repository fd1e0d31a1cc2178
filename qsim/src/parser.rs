use crate::circuit::Circuit;
use crate::error::SimError;
use crate::gate::{Angle, Condition, Gate};
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, PI};

/// A small OpenQASM 2 reader: registers, the standard-library gates,
/// measure, reset, barrier and `if(creg==value)`.
pub fn parse_qasm(qasm_str: &str) -> Result<Circuit, SimError> {
    let mut parser = QasmParser::default();
    for (index, line) in qasm_str.lines().enumerate() {
        let code = line.split("//").next().unwrap_or("");
        for statement in code.split(';') {
            let statement = statement.trim();
            if !statement.is_empty() {
                parser.statement(statement).map_err(|message| SimError::Qasm {
                    line: index + 1,
                    message,
                })?;
            }
        }
    }
    let mut circuit = Circuit::new(parser.qubits.total, parser.clbits.total);
    circuit.gates = parser.gates;
    circuit.validate()?;
    Ok(circuit)
}

impl Circuit {
    pub fn from_qasm(qasm_str: &str) -> Result<Circuit, SimError> {
        parse_qasm(qasm_str)
    }
}

#[derive(Default)]
struct Registers {
    by_name: HashMap<String, (usize, usize)>,
    total: usize,
}

impl Registers {
    fn declare(&mut self, decl: &str) -> Result<(), String> {
        let (name, size) = indexed(decl)?;
        let size = size.ok_or_else(|| format!("register '{}' needs a size", name))?;
        if self.by_name.insert(name.to_string(), (self.total, size)).is_some() {
            return Err(format!("register '{}' declared twice", name));
        }
        self.total += size;
        Ok(())
    }

    /// `q[3]` -> one bit, `q` -> the whole register.
    fn resolve(&self, operand: &str) -> Result<Vec<usize>, String> {
        let (name, index) = indexed(operand)?;
        let &(offset, size) = self
            .by_name
            .get(name)
            .ok_or_else(|| format!("unknown register '{}'", name))?;
        match index {
            Some(i) if i < size => Ok(vec![offset + i]),
            Some(i) => Err(format!("index {} out of range for '{}'", i, name)),
            None => Ok((offset..offset + size).collect()),
        }
    }
}

fn indexed(operand: &str) -> Result<(&str, Option<usize>), String> {
    let operand = operand.trim();
    match (operand.find('['), operand.find(']')) {
        (Some(start), Some(end)) if start < end => {
            let index = operand[start + 1..end]
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("bad index in '{}'", operand))?;
            Ok((operand[..start].trim(), Some(index)))
        }
        (None, None) if !operand.is_empty() => Ok((operand, None)),
        _ => Err(format!("bad operand '{}'", operand)),
    }
}

#[derive(Default)]
struct QasmParser {
    qubits: Registers,
    clbits: Registers,
    gates: Vec<Gate>,
}

impl QasmParser {
    fn statement(&mut self, statement: &str) -> Result<(), String> {
        if statement.starts_with("OPENQASM") || statement.starts_with("include") {
            return Ok(());
        }
        if let Some(rest) = statement.strip_prefix("qreg") {
            return self.qubits.declare(rest);
        }
        if let Some(rest) = statement.strip_prefix("creg") {
            return self.clbits.declare(rest);
        }
        if statement.starts_with("if") {
            let open = statement.find('(').ok_or("missing '(' after if")?;
            let close = statement.find(')').ok_or("missing ')' in if")?;
            let (register, value) = statement[open + 1..close]
                .split_once("==")
                .ok_or("condition must be 'creg==value'")?;
            let clbits = self.clbits.resolve(register.trim())?;
            let value = value
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("bad condition value '{}'", value.trim()))?;
            let condition = Condition { clbits, value };
            for gate in self.operation(statement[close + 1..].trim())? {
                self.gates.push(Gate::IfValue(condition.clone(), Box::new(gate)));
            }
            return Ok(());
        }
        let gates = self.operation(statement)?;
        self.gates.extend(gates);
        Ok(())
    }

    fn operation(&self, statement: &str) -> Result<Vec<Gate>, String> {
        if let Some(rest) = statement.strip_prefix("measure") {
            let (q, c) = rest.split_once("->").ok_or("measure needs '->'")?;
            let (q, c) = (self.qubits.resolve(q)?, self.clbits.resolve(c)?);
            if q.len() != c.len() {
                return Err("measure register sizes differ".into());
            }
            return Ok(q.into_iter().zip(c).map(|(q, c)| Gate::Measure(q, c)).collect());
        }
        if let Some(rest) = statement.strip_prefix("barrier") {
            let mut qubits = Vec::new();
            for operand in rest.split(',') {
                qubits.extend(self.qubits.resolve(operand)?);
            }
            return Ok(vec![Gate::Barrier(qubits)]);
        }
        if let Some(rest) = statement.strip_prefix("reset") {
            return Ok(self.qubits.resolve(rest)?.into_iter().map(Gate::Reset).collect());
        }

        // name(params) operands
        let (head, operands) = match statement.find('(') {
            Some(open) => {
                let close = statement.rfind(')').ok_or("missing ')'")?;
                (&statement[..close + 1], &statement[close + 1..])
            }
            None => statement
                .split_once(char::is_whitespace)
                .ok_or_else(|| format!("no operands in '{}'", statement))?,
        };
        let (name, params) = match head.find('(') {
            Some(open) => {
                let inner = &head[open + 1..head.len() - 1];
                let params = inner
                    .split(',')
                    .map(evaluate)
                    .collect::<Result<Vec<f64>, String>>()?;
                (head[..open].trim(), params)
            }
            None => (head.trim(), Vec::new()),
        };
        let args = operands
            .split(',')
            .map(|o| self.qubits.resolve(o))
            .collect::<Result<Vec<_>, _>>()?;
        let width = args.iter().map(Vec::len).max().unwrap_or(0);
        if args.iter().any(|a| a.len() != 1 && a.len() != width) {
            return Err("register sizes differ".into());
        }
        (0..width)
            .map(|i| {
                let qubits: Vec<usize> = args
                    .iter()
                    .map(|a| if a.len() == 1 { a[0] } else { a[i] })
                    .collect();
                make_gate(name, &params, &qubits)
            })
            .collect()
    }
}

fn make_gate(name: &str, params: &[f64], q: &[usize]) -> Result<Gate, String> {
    let a = |i: usize| Angle::Value(params[i]);
    let gate = match (name, params.len(), q) {
        ("id", 0, [x]) => Gate::I(*x),
        ("h", 0, [x]) => Gate::H(*x),
        ("x", 0, [x]) => Gate::X(*x),
        ("y", 0, [x]) => Gate::Y(*x),
        ("z", 0, [x]) => Gate::Z(*x),
        ("s", 0, [x]) => Gate::S(*x),
        ("sdg", 0, [x]) => Gate::Sdg(*x),
        ("t", 0, [x]) => Gate::T(*x),
        ("tdg", 0, [x]) => Gate::Tdg(*x),
        ("sx", 0, [x]) => Gate::SX(*x),
        ("sxdg", 0, [x]) => Gate::SXdg(*x),
        ("rx", 1, [x]) => Gate::RX(*x, a(0)),
        ("ry", 1, [x]) => Gate::RY(*x, a(0)),
        ("rz", 1, [x]) => Gate::RZ(*x, a(0)),
        ("p" | "u1", 1, [x]) => Gate::P(*x, a(0)),
        ("u2", 2, [x]) => Gate::U(*x, Angle::Value(FRAC_PI_2), a(0), a(1)),
        ("u" | "u3", 3, [x]) => Gate::U(*x, a(0), a(1), a(2)),
        ("cx" | "CX", 0, [c, t]) => Gate::CX(*c, *t),
        ("cy", 0, [c, t]) => Gate::CY(*c, *t),
        ("cz", 0, [c, t]) => Gate::CZ(*c, *t),
        ("cp" | "cu1", 1, [c, t]) => Gate::CP(*c, *t, a(0)),
        ("swap", 0, [x, y]) => Gate::Swap(*x, *y),
        ("rxx", 1, [x, y]) => Gate::RXX(*x, *y, a(0)),
        ("ryy", 1, [x, y]) => Gate::RYY(*x, *y, a(0)),
        ("rzz", 1, [x, y]) => Gate::RZZ(*x, *y, a(0)),
        ("ccx", 0, [c0, c1, t]) => Gate::CCX(*c0, *c1, *t),
        _ => {
            return Err(format!(
                "unsupported gate '{}' with {} parameters on {} qubits",
                name,
                params.len(),
                q.len()
            ));
        }
    };
    Ok(gate)
}

// --- Parameter expressions ---

/// Evaluates arithmetic over numbers and `pi`: + - * / ^ and parentheses.
fn evaluate(expr: &str) -> Result<f64, String> {
    let mut cursor = Expr {
        chars: expr.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
    };
    let value = cursor.sum()?;
    if cursor.pos != cursor.chars.len() {
        return Err(format!("unexpected input in expression '{}'", expr.trim()));
    }
    Ok(value)
}

struct Expr {
    chars: Vec<char>,
    pos: usize,
}

impl Expr {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut value = self.product()?;
        while let Some(op @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn product(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ ('*' | '/')) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('-') => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some('+') => {
                self.pos += 1;
                self.unary()
            }
            _ => {
                let base = self.atom()?;
                if self.peek() == Some('^') {
                    self.pos += 1;
                    return Ok(base.powf(self.unary()?));
                }
                Ok(base)
            }
        }
    }

    fn atom(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.sum()?;
                if self.peek() != Some(')') {
                    return Err("missing ')' in expression".into());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
                    self.pos += 1;
                }
                let word: String = self.chars[start..self.pos].iter().collect();
                match word.as_str() {
                    "pi" => Ok(PI),
                    other => Err(format!("unknown symbol '{}'", other)),
                }
            }
            Some(c) if c.is_ascii_digit() || c == '.' => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    let exponent_sign = (c == '-' || c == '+')
                        && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'));
                    if c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                let text: String = self.chars[start..self.pos].iter().collect();
                text.parse::<f64>().map_err(|_| format!("bad number '{}'", text))
            }
            other => Err(format!("unexpected {:?} in expression", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qasm_parser_with_measure() {
        let qasm_input = r#"
            OPENQASM 2.0;
            include "qelib1.inc";
            qreg q[2];
            creg c[2];
            h q[0];
            cx q[0],q[1];
            measure q -> c;
        "#;
        let circuit = parse_qasm(qasm_input).unwrap();

        assert_eq!(circuit.num_qubits, 2);
        assert_eq!(circuit.num_clbits, 2);
        assert_eq!(
            circuit.gates,
            vec![
                Gate::H(0),
                Gate::CX(0, 1),
                Gate::Measure(0, 0),
                Gate::Measure(1, 1)
            ]
        );
    }

    #[test]
    fn test_parameter_expressions() {
        assert!((evaluate("pi/2").unwrap() - FRAC_PI_2).abs() < 1e-12);
        assert!((evaluate("-3*pi/4").unwrap() + 0.75 * PI).abs() < 1e-12);
        assert!((evaluate("2*(1.5e-1+0.1)").unwrap() - 0.5).abs() < 1e-12);
        assert!((evaluate("2^3").unwrap() - 8.0).abs() < 1e-12);
        assert!(evaluate("tau").is_err());
    }

    #[test]
    fn test_conditioned_gate_and_multiple_registers() {
        let qasm_input = "qreg a[1]; qreg b[2]; creg s[2];\n\
                          u(pi/2, 0, pi) b[1];\n\
                          if(s==3) x a[0];\n\
                          barrier a, b;";
        let circuit = parse_qasm(qasm_input).unwrap();
        assert_eq!(circuit.num_qubits, 3);
        assert_eq!(
            circuit.gates[1],
            Gate::IfValue(
                Condition {
                    clbits: vec![0, 1],
                    value: 3
                },
                Box::new(Gate::X(0))
            )
        );
        assert_eq!(circuit.gates[2], Gate::Barrier(vec![0, 1, 2]));
        assert!(matches!(circuit.gates[0], Gate::U(2, ..)));
    }

    #[test]
    fn test_broadcast_over_register() {
        let circuit = parse_qasm("qreg q[3]; h q;").unwrap();
        assert_eq!(circuit.gates, vec![Gate::H(0), Gate::H(1), Gate::H(2)]);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_qasm("qreg q[1];\nfoo q[0];").unwrap_err();
        assert!(matches!(err, SimError::Qasm { line: 2, .. }));
        let err = parse_qasm("qreg q[1];\nh q[4];").unwrap_err();
        assert!(matches!(err, SimError::Qasm { line: 2, .. }));
    }
}
