//! Scorer tests: the recurrence, its aggregation and input validation.

use approx::assert_relative_eq;

use crate::scorer::{
    Accumulation, NEUTRAL_SCORE, ScoreSummary, knn_shapley_score, lowest_scores,
    query_contributions,
};
use crate::tests::init;
use crate::{KnnGraph, ShapleyError};

/// All other points, nearest first, for the 1-D line 0..5 (k = 4)
fn line_graph() -> KnnGraph {
    let positions = [0.0f64, 1.0, 2.0, 3.0, 4.0];
    let rows = (0..5)
        .map(|i| {
            (0..5)
                .filter(|&j| j != i)
                .map(|j| (j, (positions[i] - positions[j]).abs()))
                .collect()
        })
        .collect();
    KnnGraph::from_rows(rows).unwrap()
}

#[test]
fn test_alternating_line_scores() {
    init();
    let graph = line_graph();
    let labels = [0, 1, 0, 1, 0];

    for accumulation in [Accumulation::Dense, Accumulation::Sparse] {
        let scores = knn_shapley_score(&graph, &labels, 4, accumulation).unwrap();
        let expected = [0.55, 0.525, 0.55, 0.525, 0.55];
        for (s, e) in scores.iter().zip(expected) {
            assert_relative_eq!(*s, e, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_query_contributions_walks_farthest_to_nearest() {
    // nearest first: 3 (match), 1 (no), 4 (match)
    let neighbours = [3, 1, 4];
    let labels = ["x", "y", "x", "x", "x"];
    let (idx, s) = query_contributions(&neighbours, &labels, &"x", 3).unwrap();

    assert_eq!(idx, vec![4, 1, 3]);
    // base at the nearest, then s[j] = s[j+1] + match[j] - match[j+1]
    assert_eq!(s, vec![1.0, 0.0, 1.0]);
}

#[test]
fn test_query_contributions_uses_nearest_k_only() {
    let neighbours = [2, 0, 1];
    let labels = [1, 0, 1, 1];
    let (idx, s) = query_contributions(&neighbours, &labels, &1, 2).unwrap();

    assert_eq!(idx, vec![0, 2]);
    assert_eq!(s, vec![0.0, 1.0]);
}

#[test]
fn test_query_contributions_rejects_bad_rows() {
    let labels = [0, 0];

    // k wider than the row
    let err = query_contributions(&[1usize], &labels, &0, 2).unwrap_err();
    assert!(err.is_invalid_parameter());
    assert!(err.to_string().contains("neighbours in the row (1)"), "got: {err}");

    // k = 0
    let err = query_contributions(&[1usize], &labels, &0, 0).unwrap_err();
    match err {
        ShapleyError::InvalidParameter { name, .. } => assert_eq!(name, "k"),
        other => panic!("unexpected error {other:?}"),
    }

    // neighbour index past the labels
    let err = query_contributions(&[1usize, 5], &labels, &0, 2).unwrap_err();
    match err {
        ShapleyError::InvalidParameter { name, value, .. } => {
            assert_eq!(name, "neighbours");
            assert_eq!(value, "5");
        }
        other => panic!("unexpected error {other:?}"),
    }

    // entries beyond k are not looked at
    assert!(query_contributions(&[1usize, 5], &labels, &0, 1).is_ok());
}

#[test]
fn test_consistent_labels_score_by_in_degree() {
    init();
    let graph = line_graph();
    let n = graph.n_nodes();
    let k = 2;
    let labels = vec![7u8; n];

    let scores = knn_shapley_score(&graph, &labels, k, Accumulation::Dense).unwrap();

    // first two entries of each row: 0:[1,2] 1:[0,2] 2:[1,3] 3:[2,4] 4:[3,2]
    let in_degree = [1.0, 2.0, 4.0, 2.0, 1.0];
    for (i, s) in scores.iter().enumerate() {
        let expected = NEUTRAL_SCORE * (1.0 + in_degree[i] / (k * n) as f64);
        assert_relative_eq!(*s, expected, epsilon = 1e-12);
        assert!(*s > NEUTRAL_SCORE);
    }
}

#[test]
fn test_no_agreement_is_neutral() {
    init();
    let graph = line_graph();
    // every point has a label of its own
    let labels = [0, 1, 2, 3, 4];

    let scores = knn_shapley_score(&graph, &labels, 4, Accumulation::Sparse).unwrap();
    assert!(scores.iter().all(|&s| s == NEUTRAL_SCORE), "{:?}", scores);
}

#[test]
fn test_scores_within_unit_interval() {
    let graph = line_graph();
    for labels in [[0, 0, 0, 0, 0], [0, 1, 1, 0, 1], [1, 0, 0, 0, 1]] {
        for k in 1..=4 {
            let scores = knn_shapley_score(&graph, &labels, k, Accumulation::Dense).unwrap();
            assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)), "{:?}", scores);
        }
    }
}

#[test]
fn test_k_larger_than_row_width_is_rejected() {
    let graph = KnnGraph::from_indices(vec![1, 0, 1], 3, 1).unwrap();
    let err = knn_shapley_score(&graph, &[0, 0, 1], 2, Accumulation::Dense).unwrap_err();
    match err {
        ShapleyError::InvalidParameter { name, value, .. } => {
            assert_eq!(name, "k");
            assert_eq!(value, "2");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_zero_k_is_rejected() {
    let graph = line_graph();
    let err = knn_shapley_score(&graph, &[0, 1, 0, 1, 0], 0, Accumulation::Dense).unwrap_err();
    assert!(err.is_invalid_parameter());
}

#[test]
fn test_label_length_mismatch() {
    let graph = line_graph();
    let err = knn_shapley_score(&graph, &[0, 1, 0], 2, Accumulation::Sparse).unwrap_err();
    assert!(err.to_string().contains("labels"), "got: {err}");
}

#[test]
fn test_malformed_deserialised_graph_is_rejected() {
    // row 1 lists itself
    let json = r#"{"indptr":[0,1,2],"indices":[1,1],"data":[1.0,1.0],"n_nodes":2,"k":1}"#;
    let graph: KnnGraph = serde_json::from_str(json).unwrap();
    let err = knn_shapley_score(&graph, &[0, 1], 1, Accumulation::Dense).unwrap_err();
    assert!(err.to_string().contains("self-loop"), "got: {err}");

    // layout does not match n_nodes × k
    let json = r#"{"indptr":[0,1],"indices":[1],"data":[1.0],"n_nodes":2,"k":1}"#;
    let graph: KnnGraph = serde_json::from_str(json).unwrap();
    assert!(knn_shapley_score(&graph, &[0, 1], 1, Accumulation::Dense).is_err());
}

#[test]
fn test_summary_and_lowest() {
    let scores = [0.55, 0.45, 0.5, 0.40, 0.45];
    let summary = ScoreSummary::from_scores(&scores);
    assert_eq!(summary.n, 5);
    assert_eq!(summary.n_harmful, 3);
    assert_relative_eq!(summary.min, 0.40);
    assert_relative_eq!(summary.max, 0.55);
    assert_relative_eq!(summary.mean, 0.47, epsilon = 1e-12);
    assert!(summary.to_string().contains("below neutral=3"));

    assert_eq!(lowest_scores(&scores, 3), vec![3, 1, 4]);
    assert_eq!(lowest_scores(&scores, 10).len(), 5);
}

#[test]
fn test_accumulation_from_str_and_serde() {
    assert_eq!("dense".parse::<Accumulation>().unwrap(), Accumulation::Dense);
    assert_eq!("sparse".parse::<Accumulation>().unwrap(), Accumulation::Sparse);
    assert!("csr".parse::<Accumulation>().is_err());

    assert_eq!(
        serde_json::to_string(&Accumulation::Sparse).unwrap(),
        "\"sparse\""
    );
}
