//! Elementwise closeness with NumPy's default tolerances.

use nalgebra::DMatrix;
use num_complex::Complex64;

pub const RTOL: f64 = 1e-5;
pub const ATOL: f64 = 1e-8;

/// `|a - b| <= atol + rtol * |b|`
pub fn isclose_with(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}

pub fn isclose(a: f64, b: f64) -> bool {
    isclose_with(a, b, RTOL, ATOL)
}

pub fn isclose_complex(a: Complex64, b: Complex64) -> bool {
    (a - b).norm() <= ATOL + RTOL * b.norm()
}

/// False on shape mismatch.
pub fn allclose(a: &DMatrix<Complex64>, b: &DMatrix<Complex64>) -> bool {
    a.shape() == b.shape() && a.iter().zip(b.iter()).all(|(x, y)| isclose_complex(*x, *y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_term_scales_with_reference() {
        assert!(isclose(1e6 + 5.0, 1e6));
        assert!(!isclose(1e-3, 0.0));
        assert!(isclose_with(0.46, 0.5, 0.1, 0.0));
        assert!(!isclose_with(0.44, 0.5, 0.1, 0.0));
    }

    #[test]
    fn allclose_rejects_shape_mismatch() {
        let a = DMatrix::<Complex64>::identity(2, 2);
        let b = DMatrix::<Complex64>::identity(4, 4);
        assert!(!allclose(&a, &b));
        assert!(allclose(&b, &b));
    }
}
