use crate::ModelError;
use nalgebra::DMatrix;
use qsim::{Circuit, StateVector};
use std::f64::consts::PI;

/// ZZ feature map with linear entanglement: one qubit per feature.
///
/// Every qubit gets `h` and `rz(x_i * pi)`; every neighbouring pair `(i, i + 1)` then
/// picks up `rz((pi - x_i)(pi - x_{i+1}))` between two `cx` gates.
pub fn zz_feature_map(data_point: &[f64]) -> Circuit {
    let num_qubits = data_point.len();
    let mut circuit = Circuit::new(num_qubits, 0);
    for (q, x) in data_point.iter().enumerate() {
        circuit.h(q).rz(x * PI, q);
    }
    for (q, pair) in data_point.windows(2).enumerate() {
        let angle_zz = (PI - pair[0]) * (PI - pair[1]);
        circuit.cx(q, q + 1).rz(angle_zz, q + 1).cx(q, q + 1);
    }
    circuit
}

fn encode(feature_map: &impl Fn(&[f64]) -> Circuit, point: &[f64]) -> Result<StateVector, ModelError> {
    let circuit = feature_map(point).remove_final_measurements();
    Ok(StateVector::from_circuit(&circuit)?)
}

/// |<phi(a)|phi(b)>|^2 for the states the feature map prepares.
pub fn fidelity_kernel(
    feature_map: &impl Fn(&[f64]) -> Circuit,
    a: &[f64],
    b: &[f64],
) -> Result<f64, ModelError> {
    if a.len() != b.len() {
        return Err(ModelError::Dimension(a.len(), b.len()));
    }
    let state_a = encode(feature_map, a)?;
    let state_b = encode(feature_map, b)?;
    if state_a.num_qubits != state_b.num_qubits {
        return Err(ModelError::Dimension(state_a.num_qubits, state_b.num_qubits));
    }
    Ok(state_a.fidelity(&state_b))
}

/// Kernel matrix `K[i][j] = k(rows[i], cols[j])`; each point is simulated once.
pub fn kernel_matrix(
    feature_map: &impl Fn(&[f64]) -> Circuit,
    rows: &[Vec<f64>],
    cols: &[Vec<f64>],
) -> Result<DMatrix<f64>, ModelError> {
    let row_states = rows
        .iter()
        .map(|p| encode(feature_map, p))
        .collect::<Result<Vec<_>, _>>()?;
    let col_states = cols
        .iter()
        .map(|p| encode(feature_map, p))
        .collect::<Result<Vec<_>, _>>()?;
    if let (Some(r), Some(c)) = (row_states.first(), col_states.first()) {
        if r.num_qubits != c.num_qubits {
            return Err(ModelError::Dimension(r.num_qubits, c.num_qubits));
        }
    }
    Ok(DMatrix::from_fn(rows.len(), cols.len(), |i, j| {
        row_states[i].fidelity(&col_states[j])
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_kernel_of_point_with_itself_is_one() {
        let k = fidelity_kernel(&zz_feature_map, &[0.5, 0.8], &[0.5, 0.8]).unwrap();
        assert!((k - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_kernel_is_symmetric_and_bounded() {
        let a = [0.1, 1.3, 0.4];
        let b = [2.0, 0.2, 0.9];
        let kab = fidelity_kernel(&zz_feature_map, &a, &b).unwrap();
        let kba = fidelity_kernel(&zz_feature_map, &b, &a).unwrap();
        assert!((kab - kba).abs() < EPSILON);
        assert!((0.0..=1.0 + EPSILON).contains(&kab));
    }

    #[test]
    fn test_single_feature_kernel_closed_form() {
        // h then rz(x pi): overlap is cos^2((a - b) pi / 2)
        let k = fidelity_kernel(&zz_feature_map, &[0.3], &[0.8]).unwrap();
        let expected = ((0.8f64 - 0.3) * PI / 2.0).cos().powi(2);
        assert!((k - expected).abs() < EPSILON);
    }

    #[test]
    fn test_kernel_matrix_matches_pairwise() {
        let points = vec![vec![0.0, 0.5], vec![1.0, 0.2], vec![0.7, 0.7]];
        let gram = kernel_matrix(&zz_feature_map, &points, &points).unwrap();
        assert_eq!(gram.shape(), (3, 3));
        for i in 0..3 {
            assert!((gram[(i, i)] - 1.0).abs() < EPSILON);
            for j in 0..3 {
                let k = fidelity_kernel(&zz_feature_map, &points[i], &points[j]).unwrap();
                assert!((gram[(i, j)] - k).abs() < EPSILON);
            }
        }
    }

    #[test]
    fn test_mismatched_dimensions() {
        assert!(matches!(
            fidelity_kernel(&zz_feature_map, &[0.1], &[0.1, 0.2]),
            Err(ModelError::Dimension(1, 2))
        ));
    }
}
