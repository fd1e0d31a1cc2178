//! NumPy `.npy` matrices through `ndarray-npy`, converted to and from `DMatrix`.

use crate::error::GradeError;
use nalgebra::DMatrix;
use ndarray::Array2;
use ndarray_npy::{ReadNpyError, WriteNpyError};
use num_complex::Complex64;
use std::path::Path;

fn read_error(path: &Path, err: ReadNpyError) -> GradeError {
    match err {
        ReadNpyError::Io(source) => GradeError::Fixture {
            path: path.to_path_buf(),
            source,
        },
        other => GradeError::Npy(format!("{}: {}", path.display(), other)),
    }
}

fn to_matrix<T>(array: &Array2<T>, convert: impl Fn(&T) -> Complex64) -> DMatrix<Complex64> {
    let (rows, cols) = array.dim();
    DMatrix::from_fn(rows, cols, |r, c| convert(&array[(r, c)]))
}

/// Reads a two-dimensional `<c16` or `<f8` array, in C or Fortran order.
pub fn read_npy(path: &Path) -> Result<DMatrix<Complex64>, GradeError> {
    match ndarray_npy::read_npy::<_, Array2<Complex64>>(path) {
        Ok(array) => Ok(to_matrix(&array, |z| *z)),
        Err(ReadNpyError::Io(source)) => Err(read_error(path, ReadNpyError::Io(source))),
        Err(complex_err) => match ndarray_npy::read_npy::<_, Array2<f64>>(path) {
            Ok(array) => Ok(to_matrix(&array, |x| Complex64::new(*x, 0.0))),
            Err(_) => Err(read_error(path, complex_err)),
        },
    }
}

/// Writes a complex matrix as a C-ordered `<c16` array.
pub fn write_npy(path: &Path, matrix: &DMatrix<Complex64>) -> Result<(), GradeError> {
    let array = Array2::from_shape_fn(matrix.shape(), |(r, c)| matrix[(r, c)]);
    ndarray_npy::write_npy(path, &array).map_err(|err| match err {
        WriteNpyError::Io(source) => GradeError::Fixture {
            path: path.to_path_buf(),
            source,
        },
        other => GradeError::Npy(format!("{}: {}", path.display(), other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Version 1.0 file with the header padded to a 64-byte boundary.
    fn raw(header: &str, body: &[u8]) -> Vec<u8> {
        let mut header = header.to_string();
        while (10 + header.len() + 1) % 64 != 0 {
            header.push(' ');
        }
        header.push('\n');
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    fn write_raw(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.npy");
        let m = DMatrix::from_fn(3, 2, |r, c| Complex64::new(r as f64, c as f64 - 0.5));
        write_npy(&path, &m).unwrap();
        assert_eq!(read_npy(&path).unwrap(), m);
    }

    #[test]
    fn reads_float_fortran_matrix() {
        // column-major [[1, 2], [3, 4]]
        let body: Vec<u8> = [1.0f64, 3.0, 2.0, 4.0]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(
            &dir,
            "f.npy",
            &raw("{'descr': '<f8', 'fortran_order': True, 'shape': (2, 2), }", &body),
        );
        let m = read_npy(&path).unwrap();
        assert_eq!(m[(0, 1)], Complex64::new(2.0, 0.0));
        assert_eq!(m[(1, 0)], Complex64::new(3.0, 0.0));
    }

    #[test]
    fn oversized_shape_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(
            &dir,
            "huge.npy",
            &raw(
                "{'descr': '<c16', 'fortran_order': False, 'shape': (18446744073709551615, 4294967296), }",
                &[0; 16],
            ),
        );
        assert!(matches!(read_npy(&path), Err(GradeError::Npy(_))));
    }

    #[test]
    fn rejects_unknown_dtype_and_short_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_raw(
            &dir,
            "i.npy",
            &raw("{'descr': '<i4', 'fortran_order': False, 'shape': (1, 1), }", &[0; 4]),
        );
        assert!(matches!(read_npy(&path), Err(GradeError::Npy(_))));
        let path = write_raw(
            &dir,
            "short.npy",
            &raw("{'descr': '<f8', 'fortran_order': False, 'shape': (2, 1), }", &[0; 8]),
        );
        assert!(read_npy(&path).is_err());
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = read_npy(Path::new("/nonexistent/test8_H_global_matrix.npy")).unwrap_err();
        assert!(matches!(err, GradeError::Fixture { .. }));
        assert!(err.to_string().contains("test8_H_global_matrix.npy"));
    }
}
