use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::matrix::FeatureMatrix;

#[test]
fn test_new_checks_length() {
    let m = FeatureMatrix::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3, 2).unwrap();
    assert_eq!(m.shape(), (3, 2));
    assert_eq!(m.row(1), &[3.0, 4.0]);

    let err = FeatureMatrix::new(vec![1.0, 2.0, 3.0], 2, 2).unwrap_err();
    assert!(err.is_invalid_parameter());
}

#[test]
fn test_from_rows_rejects_ragged() {
    let rows = vec![vec![1.0, 2.0], vec![3.0]];
    let err = FeatureMatrix::from_rows(&rows).unwrap_err();
    assert!(err.to_string().contains("row 1"), "got: {err}");
}

#[test]
fn test_from_rows_empty() {
    let m = FeatureMatrix::from_rows(&[]).unwrap();
    assert!(m.is_empty());
    assert_eq!(m.shape(), (0, 0));
}

#[test]
fn test_row_norms() {
    let m = FeatureMatrix::from_rows(&[vec![3.0, 4.0], vec![0.0, 0.0]]).unwrap();
    assert_eq!(m.row_norms(), vec![5.0, 0.0]);
}

#[test]
fn test_select_rows() {
    let m = FeatureMatrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0]]).unwrap();
    let reordered = m.select_rows(&[2, 0, 1]).unwrap();
    assert_eq!(reordered.as_slice(), &[2.0, 0.0, 1.0]);
    assert!(m.select_rows(&[3]).is_err());
}

#[test]
fn test_dense_matrix_conversion() {
    let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
    let dense = DenseMatrix::from_2d_vec(&rows).unwrap();

    let m = FeatureMatrix::from(&dense);
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.row(0), &[1.0, 2.0, 3.0]);
    assert_eq!(m.row(1), &[4.0, 5.0, 6.0]);

    let back = m.to_dense_matrix().unwrap();
    assert_eq!(back.shape(), (2, 3));
    assert_eq!(*back.get((1, 2)), 6.0);
}
