// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use ndarray::{ArrayD, IxDyn, ShapeBuilder};

use crate::core::TimeField;
use crate::error::{Result, SweepError};

/// MAT variable name used when saving onset times.
pub const ONSET_TIME_VAR: &str = "onset_time";

/// Supported file formats for field I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(SweepError::UnsupportedFileFormat(ext.to_string())),
        None => Err(SweepError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// A stored field may be the `[rows, cols]` matrix or a flat vector of
/// `rows * cols` values in row-major order.
fn accepts_shape(got: &[usize], expected: [usize; 2]) -> bool {
    let numel = expected[0] * expected[1];
    got == expected || got == [numel] || got == [1, numel]
}

/// Load a per-patch field from a .npy file (f64, or f32 promoted to f64).
pub fn load_npy_field(path: &Path, expected_shape: [usize; 2]) -> Result<Vec<f64>> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| SweepError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };

    if !accepts_shape(arr.shape(), expected_shape) {
        return Err(SweepError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: arr.shape().to_vec(),
        });
    }

    // Fortran-order files must be re-laid out before taking the raw buffer
    Ok(arr.as_standard_layout().into_owned().into_raw_vec())
}

/// Save onset times to a .npy file as a `rows x cols` array.
pub fn save_npy(field: &TimeField, path: &Path) -> Result<()> {
    let arr = field.clone().into_array()?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| SweepError::Other(format!("npy write error: {}", e)))
}

/// Load a per-patch field stored under `variable_name` in a .mat file.
///
/// MAT data is column-major. A matrix stored as `[rows, cols]` or as its
/// transpose `[cols, rows]` is re-laid out to row-major `[rows, cols]`.
pub fn load_mat_field(
    path: &Path,
    variable_name: &str,
    expected_shape: [usize; 2],
) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| SweepError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| SweepError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, .. } => real.clone(),
        matfile::NumericData::Single { real, .. } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(SweepError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    let mat_shape: Vec<usize> = array.size().to_vec();
    let [rows, cols] = expected_shape;
    let mismatch = || SweepError::ShapeMismatch {
        expected: expected_shape.to_vec(),
        got: mat_shape.clone(),
    };

    if data.len() != rows * cols {
        return Err(mismatch());
    }

    // Row and column vectors hold the values in storage order already
    let is_vector = mat_shape.iter().filter(|&&d| d != 1).count() <= 1;
    if is_vector && mat_shape != [rows, cols] && mat_shape != [cols, rows] {
        return Ok(data);
    }

    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| SweepError::Other(format!("shape error: {}", e)))?;

    let arr = if mat_shape == [rows, cols] {
        arr
    } else if mat_shape == [cols, rows] {
        arr.reversed_axes()
    } else {
        return Err(mismatch());
    };

    Ok(arr.as_standard_layout().into_owned().into_raw_vec())
}

/// Save onset times to a .mat file (Level 5, uncompressed, one double matrix).
pub fn save_mat(field: &TimeField, path: &Path, var_name: &str) -> Result<()> {
    let arr = field.clone().into_array()?;
    // Column-major values are the row-major values of the transpose
    let col_major: Vec<f64> = arr.t().as_standard_layout().into_owned().into_raw_vec();
    write_mat_level5(path, var_name, &field.shape(), &col_major)
}

// MAT-File Level 5 data types and array classes.
// Reference: https://www.mathworks.com/help/pdf_doc/matlab/matfile_format.pdf
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

fn padded_len(len: usize) -> usize {
    len.div_ceil(8) * 8
}

/// Encode one sub-element: 8-byte tag, payload, zero padding to 8 bytes.
fn tagged_element(data_type: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + padded_len(payload.len()));
    out.extend_from_slice(&data_type.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out.resize(8 + padded_len(payload.len()), 0);
    out
}

/// Minimal MAT Level 5 writer for a single real double array.
///
/// The `matfile` crate only reads, so files are written here: a 128-byte
/// header followed by one miMATRIX element holding array flags, dimensions,
/// name and the column-major real part.
fn write_mat_level5(path: &Path, var_name: &str, dims: &[usize], data: &[f64]) -> Result<()> {
    let mut header = [b' '; 128];
    let text = b"MATLAB 5.0 MAT-file, created by fast-sweep";
    header[..text.len()].copy_from_slice(text);
    // Bytes 116..124 are the unused subsystem offset
    header[116..124].fill(0);
    header[124..126].copy_from_slice(&0x0100u16.to_le_bytes());
    header[126..128].copy_from_slice(b"IM");

    let flags: Vec<u8> = [MX_DOUBLE_CLASS, 0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let dim_bytes: Vec<u8> = dims
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    let real: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();

    let mut body = tagged_element(MI_UINT32, &flags);
    body.extend(tagged_element(MI_INT32, &dim_bytes));
    body.extend(tagged_element(MI_INT8, var_name.as_bytes()));
    body.extend(tagged_element(MI_DOUBLE, &real));

    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);
    w.write_all(&header)?;
    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&(body.len() as u32).to_le_bytes())?;
    w.write_all(&body)?;
    w.flush()?;
    Ok(())
}

/// Convert velocity field to slowness (element-wise 1/v).
pub fn velocity_to_slowness(velocity: &[f64]) -> Result<Vec<f64>> {
    velocity
        .iter()
        .enumerate()
        .map(|(index, &v)| {
            if !v.is_finite() || v <= 0.0 {
                Err(SweepError::InvalidVelocity { index, value: v })
            } else {
                Ok(1.0 / v)
            }
        })
        .collect()
}

/// Save onset times to a file, inferring format from extension.
pub fn save_time_field(field: &TimeField, path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(field, path),
        FileFormat::Mat => save_mat(field, path, ONSET_TIME_VAR),
    }
}

/// Load a slowness field from a file, inferring format from extension.
pub fn load_slowness(path: &Path, expected_shape: [usize; 2]) -> Result<Vec<f64>> {
    match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, expected_shape),
        FileFormat::Mat => load_mat_field(path, "slowness", expected_shape),
    }
}

/// Load a rupture velocity field from a file and convert to slowness.
pub fn load_velocity_as_slowness(path: &Path, expected_shape: [usize; 2]) -> Result<Vec<f64>> {
    let velocity = match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, expected_shape)?,
        FileFormat::Mat => load_mat_field(path, "velocity", expected_shape)?,
    };
    velocity_to_slowness(&velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_field() -> TimeField {
        let values: Vec<f64> = (0..12).map(|v| v as f64).collect();
        TimeField::from_vec(3, 4, values).unwrap()
    }

    #[test]
    fn npy_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onset.npy");
        save_npy(&make_test_field(), &path).unwrap();

        let loaded = load_npy_field(&path, [3, 4]).unwrap();
        let expected: Vec<f64> = (0..12).map(|v| v as f64).collect();
        assert_eq!(loaded, expected);
    }

    #[test]
    fn npy_flat_vector_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat.npy");
        let flat = ndarray::Array1::from(vec![0.5f64; 6]);
        ndarray_npy::write_npy(&path, &flat).unwrap();

        let loaded = load_npy_field(&path, [2, 3]).unwrap();
        assert_eq!(loaded, vec![0.5; 6]);
    }

    #[test]
    fn npy_f32_promoted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.npy");
        let arr = ndarray::Array2::from_elem((2, 2), 0.25f32);
        ndarray_npy::write_npy(&path, &arr).unwrap();

        let loaded = load_npy_field(&path, [2, 2]).unwrap();
        assert_eq!(loaded, vec![0.25; 4]);
    }

    #[test]
    fn npy_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mismatch.npy");
        save_npy(&make_test_field(), &path).unwrap();

        let result = load_npy_field(&path, [4, 3]);
        assert!(matches!(result, Err(SweepError::ShapeMismatch { .. })));
    }

    #[test]
    fn mat_readable_by_matfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("onset.mat");
        save_mat(&make_test_field(), &path, ONSET_TIME_VAR).unwrap();

        let file = std::fs::File::open(&path).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name(ONSET_TIME_VAR).unwrap();
        assert_eq!(arr.size(), &vec![3, 4]);
        match arr.data() {
            matfile::NumericData::Double { real, .. } => {
                // Column-major: first column is rows 0..3 of column 0
                assert_eq!(&real[..3], &[0.0, 4.0, 8.0]);
            }
            _ => panic!("Expected double data"),
        }
    }

    #[test]
    fn mat_write_read_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("values.mat");
        save_mat(&make_test_field(), &path, "slowness").unwrap();

        let loaded = load_mat_field(&path, "slowness", [3, 4]).unwrap();
        let expected: Vec<f64> = (0..12).map(|v| v as f64).collect();
        assert_eq!(loaded, expected);

        // The transposed layout is accepted and re-laid out
        let transposed = load_mat_field(&path, "slowness", [4, 3]).unwrap();
        assert_eq!(&transposed[..4], &[0.0, 4.0, 8.0, 1.0]);
    }

    #[test]
    fn mat_missing_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.mat");
        save_mat(&make_test_field(), &path, ONSET_TIME_VAR).unwrap();

        let result = load_mat_field(&path, "velocity", [3, 4]);
        match result {
            Err(SweepError::MatVariableNotFound { available, .. }) => {
                assert_eq!(available, vec![ONSET_TIME_VAR.to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn tagged_element_is_padded() {
        let el = tagged_element(MI_INT8, b"abc");
        assert_eq!(el.len(), 16);
        assert_eq!(&el[4..8], &3u32.to_le_bytes());
        assert_eq!(&el[8..11], b"abc");
        assert!(el[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn velocity_to_slowness_valid() {
        let slow = velocity_to_slowness(&[1.0, 2.0, 4.0, 0.5]).unwrap();
        assert_eq!(slow, vec![1.0, 0.5, 0.25, 2.0]);
    }

    #[test]
    fn velocity_to_slowness_invalid() {
        let result = velocity_to_slowness(&[1.0, 0.0, 2.0]);
        assert!(matches!(
            result,
            Err(SweepError::InvalidVelocity { index: 1, .. })
        ));
        let result = velocity_to_slowness(&[1.0, 2.0, f64::INFINITY]);
        assert!(matches!(
            result,
            Err(SweepError::InvalidVelocity { index: 2, .. })
        ));
    }

    #[test]
    fn save_time_field_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let field = make_test_field();
        save_time_field(&field, &dir.path().join("a.npy")).unwrap();
        save_time_field(&field, &dir.path().join("a.mat")).unwrap();
        let loaded = load_slowness(&dir.path().join("a.mat"), [3, 4]);
        // Saved under the onset-time name, not "slowness"
        assert!(matches!(
            loaded,
            Err(SweepError::MatVariableNotFound { .. })
        ));
    }

    #[test]
    fn unsupported_format() {
        let result = infer_format(Path::new("test.xyz"));
        assert!(matches!(
            result,
            Err(SweepError::UnsupportedFileFormat(_))
        ));
        assert!(infer_format(Path::new("noext")).is_err());
    }
}
