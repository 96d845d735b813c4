// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use approx::assert_abs_diff_eq;
use ndarray::{Array2, Axis, array, s, stack};

use loopte::LoopTeError;
use loopte::config::TeConfig;
use loopte::network::{
    ConnectionMatrix, GainMatrix, PairFailurePolicy, build_gain_matrix,
    build_partial_correlation_gain_matrix,
};

use crate::test_helpers::{chain_process, gaussian_series, init_tracing, names};

/// Instantaneous chain `a → b → c`: `b = a + ½e₁`, `c = b + ½e₂`.
fn instantaneous_chain(size: usize, seed: u64) -> Array2<f64> {
    let a = gaussian_series(size, seed);
    let b = &a + &(gaussian_series(size, seed + 1) * 0.5);
    let c = &b + &(gaussian_series(size, seed + 2) * 0.5);
    stack(Axis(0), &[a.view(), b.view(), c.view()]).unwrap()
}

#[test]
fn connection_matrix_validation() {
    let vars = names(&["a", "b"]);
    assert!(ConnectionMatrix::new(vars.clone(), Array2::from_elem((2, 3), false)).is_err());
    assert!(ConnectionMatrix::new(names(&["a", "a"]), Array2::from_elem((2, 2), false)).is_err());
    assert!(ConnectionMatrix::from_edges(vars.clone(), &[("a", "c")]).is_err());

    let m = ConnectionMatrix::from_edges(vars, &[("a", "b")]).unwrap();
    assert!(m.is_connected(0, 1));
    assert!(!m.is_connected(1, 0));
    assert_eq!(m.adjacency, array![[false, false], [true, false]]);
}

#[test]
fn edges_skip_self_loops() {
    let mut m = ConnectionMatrix::fully_connected(names(&["a", "b", "c"]));
    assert_eq!(m.edges().len(), 6);
    m.adjacency[[1, 1]] = true;
    assert_eq!(m.edges().len(), 6);
    // row-major over targets
    assert_eq!(m.edges()[0], (1, 0));
}

#[test]
fn pruning_zeros_weak_edges() {
    let gain = GainMatrix {
        variables: names(&["a", "b"]),
        values: array![[0.0, 0.05], [0.4, 0.0]],
    };
    let pruned = gain.pruned(0.1);
    assert_eq!(pruned.values, array![[0.0, 0.0], [0.4, 0.0]]);
    assert_eq!(pruned.gain(0, 1), 0.4);
}

#[test]
fn chain_gains_follow_the_flow() {
    let data = chain_process(180, 0.3, 31);
    let connections = ConnectionMatrix::fully_connected(names(&["a", "b", "c"]));
    let report = build_gain_matrix(
        data.view(),
        &connections,
        &TeConfig::new(1, 160, 12),
        PairFailurePolicy::Abort,
    )
    .unwrap();

    assert!(report.failures.is_empty());
    assert_eq!(report.diagnostics.len(), 6);
    let g = &report.gain;
    for i in 0..3 {
        assert_eq!(g.gain(i, i), 0.0);
    }
    // a → b and b → c dominate their reverse directions
    assert!(g.gain(0, 1) > g.gain(1, 0));
    assert!(g.gain(1, 2) > g.gain(2, 1));
}

#[test]
fn unconnected_pairs_stay_zero() {
    let data = chain_process(180, 0.3, 32);
    let connections =
        ConnectionMatrix::from_edges(names(&["a", "b", "c"]), &[("a", "b"), ("b", "c")]).unwrap();
    let report = build_gain_matrix(
        data.view(),
        &connections,
        &TeConfig::new(1, 160, 10),
        PairFailurePolicy::Abort,
    )
    .unwrap();

    assert_eq!(report.diagnostics.len(), 2);
    assert!(report.gain.gain(0, 1) > 0.0);
    assert_eq!(report.gain.gain(1, 0), 0.0);
    assert_eq!(report.gain.gain(0, 2), 0.0);
}

#[test]
fn failure_policy_abort_and_skip() {
    init_tracing();
    let mut data = chain_process(180, 0.3, 33);
    // c is flat: every pair involving it fails to fit
    data.row_mut(2).fill(1.0);
    let connections = ConnectionMatrix::fully_connected(names(&["a", "b", "c"]));
    let config = TeConfig::new(1, 160, 10);

    assert!(matches!(
        build_gain_matrix(data.view(), &connections, &config, PairFailurePolicy::Abort),
        Err(LoopTeError::DensityFit { .. })
    ));

    let report =
        build_gain_matrix(data.view(), &connections, &config, PairFailurePolicy::Skip).unwrap();
    assert_eq!(report.failures.len(), 4);
    assert!(report.failures.iter().all(|f| f.source == "c" || f.target == "c"));
    assert_eq!(report.gain.gain(2, 0), 0.0);
    assert!(report.gain.gain(0, 1) > 0.0);
}

#[test]
fn row_count_must_match_variables() {
    let data = chain_process(180, 0.3, 34);
    let connections = ConnectionMatrix::fully_connected(names(&["a", "b"]));
    assert!(matches!(
        build_gain_matrix(data.view(), &connections, &TeConfig::new(1, 160, 10), PairFailurePolicy::Skip),
        Err(LoopTeError::InvalidParameter { name: "data", .. })
    ));
}

#[test]
fn partial_correlation_separates_chain_links() {
    let data = instantaneous_chain(2000, 51);
    let connections = ConnectionMatrix::fully_connected(names(&["a", "b", "c"]));
    let gain = build_partial_correlation_gain_matrix(data.view(), &connections).unwrap();

    // population values: 0.632 for a-b given c, 0.707 for b-c given a, 0 for a-c
    assert!(gain.gain(0, 1) > 0.5, "a-b {}", gain.gain(0, 1));
    assert!(gain.gain(1, 2) > 0.5, "b-c {}", gain.gain(1, 2));
    assert!(gain.gain(0, 2).abs() < 0.1, "a-c {}", gain.gain(0, 2));
    for s in 0..3 {
        assert_eq!(gain.gain(s, s), 0.0);
        for t in 0..3 {
            assert_abs_diff_eq!(gain.gain(s, t), gain.gain(t, s), epsilon = 1e-12);
        }
    }
}

#[test]
fn partial_correlation_of_two_rows_is_pearson() {
    let data = instantaneous_chain(300, 52);
    let pair = data.slice(s![0..2, ..]);
    let connections =
        ConnectionMatrix::from_edges(names(&["a", "b"]), &[("a", "b")]).unwrap();
    let gain = build_partial_correlation_gain_matrix(pair, &connections).unwrap();

    let (a, b) = (pair.row(0), pair.row(1));
    let (ma, mb) = (a.mean().unwrap(), b.mean().unwrap());
    let cov: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - ma) * (y - mb)).sum();
    let va: f64 = a.iter().map(|x| (x - ma).powi(2)).sum();
    let vb: f64 = b.iter().map(|y| (y - mb).powi(2)).sum();
    let pearson = cov / (va * vb).sqrt();

    assert_abs_diff_eq!(gain.gain(0, 1), pearson, epsilon = 1e-10);
    // unconnected direction
    assert_eq!(gain.gain(1, 0), 0.0);
}

#[test]
fn partial_correlation_rejects_degenerate_data() {
    let connections = ConnectionMatrix::fully_connected(names(&["a", "b", "c"]));
    let mut data = instantaneous_chain(200, 53);
    data.row_mut(2).fill(1.0);
    assert!(matches!(
        build_partial_correlation_gain_matrix(data.view(), &connections),
        Err(LoopTeError::InvalidParameter { name: "data", .. })
    ));

    let short = instantaneous_chain(3, 54);
    assert_eq!(
        build_partial_correlation_gain_matrix(short.view(), &connections),
        Err(LoopTeError::InsufficientData { required: 4, available: 3 })
    );
}
