use crate::error::ShapleyError;
use crate::matrix::FeatureMatrix;
use crate::preflight::*;

#[test]
fn test_preflight_clean_matrix() {
    crate::init();
    let features = FeatureMatrix::from_rows(&[
        vec![1.0, 2.0, 3.0],
        vec![4.0, 5.0, 6.0],
        vec![7.0, 8.0, 9.0],
    ])
    .unwrap();

    let report = PreflightStage::with_defaults().execute(&features).unwrap();
    assert!(report.is_clean(), "{}", report.summary());
    assert_eq!((report.nrows, report.ncols), (3, 3));
}

#[test]
fn test_preflight_rejects_empty_matrix() {
    crate::init();
    let features = FeatureMatrix::new(vec![], 0, 4).unwrap();
    let err = PreflightStage::with_defaults().execute(&features).unwrap_err();
    assert!(matches!(err, ShapleyError::UnderlyingIndex(_)));

    let zero_width = FeatureMatrix::new(vec![], 3, 0).unwrap();
    assert!(PreflightStage::with_defaults().execute(&zero_width).is_err());
}

#[test]
fn test_preflight_non_finite() {
    crate::init();
    let features =
        FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![f64::NAN, 0.0], vec![3.0, 1.0]]).unwrap();

    let err = PreflightStage::with_defaults().execute(&features).unwrap_err();
    assert!(err.to_string().contains("row 1"), "got: {err}");

    let lenient = PreflightStage::new(PreflightConfig {
        reject_non_finite: false,
        ..PreflightConfig::default()
    });
    let report = lenient.execute(&features).unwrap();
    assert_eq!(report.non_finite_rows, vec![1]);
}

#[test]
fn test_preflight_zero_norm_and_duplicates() {
    crate::init();
    let features = FeatureMatrix::from_rows(&[
        vec![0.0, 0.0],
        vec![1.0, 1.0],
        vec![2.0, 0.5],
        vec![1.0, 1.0],
        vec![-0.0, 0.0],
    ])
    .unwrap();

    let report = PreflightStage::with_defaults().execute(&features).unwrap();
    assert_eq!(report.zero_norm_rows, vec![0, 4]);
    assert_eq!(report.duplicate_groups, vec![vec![0, 4], vec![1, 3]]);
    assert!(!report.is_clean());

    let fast = PreflightStage::new(PreflightConfig::fast())
        .execute(&features)
        .unwrap();
    assert!(fast.duplicate_groups.is_empty());
    assert_eq!(fast.zero_norm_rows, vec![0, 4]);
}
