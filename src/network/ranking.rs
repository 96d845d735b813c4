// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Eigenvector ranking of variables by their transfer entropy gains.
//!
//! The gain matrix is turned into a column-stochastic transition matrix and
//! the dominant eigenvector is found by power iteration. The forward ranking
//! rewards variables that influence important variables, the backward ranking
//! rewards variables influenced by important ones. Both are blended into a
//! single importance per variable.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use tracing::{debug, warn};

use crate::config::{RankingConfig, TeConfig};
use crate::error::{LoopTeError, Result};
use crate::network::gain_matrix::{
    ConnectionMatrix, GainMatrix, GainMatrixReport, PairFailurePolicy, build_gain_matrix,
};
use crate::network::windows::split_windows;

/// Importance per variable, in the order of `variables`, summing to one.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub variables: Vec<String>,
    pub importances: Array1<f64>,
}

impl Ranking {
    pub fn importance(&self, name: &str) -> Option<f64> {
        self.variables
            .iter()
            .position(|v| v == name)
            .map(|i| self.importances[i])
    }

    /// `(variable, importance)` from most to least important.
    /// Ties keep the variable order.
    pub fn sorted(&self) -> Vec<(String, f64)> {
        let mut pairs: Vec<(String, f64)> = self
            .variables
            .iter()
            .cloned()
            .zip(self.importances.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }
}

fn weights(
    gain: &GainMatrix,
    connections: &ConnectionMatrix,
    dummy_weight: f64,
) -> Result<Array2<f64>> {
    let n = connections.len();
    if gain.values.dim() != (n, n) || gain.variables != connections.variables {
        return Err(LoopTeError::invalid(
            "gain",
            "gain matrix and connection matrix describe different variables",
        ));
    }
    // Dummy links between every pair of distinct variables keep the chain irreducible.
    Ok(Array2::from_shape_fn((n, n), |(t, s)| {
        if t == s {
            0.0
        } else if connections.is_connected(s, t) {
            gain.values[[t, s]].abs() + dummy_weight
        } else {
            dummy_weight
        }
    }))
}

/// Divides each column by its sum; all-zero columns become uniform.
fn column_stochastic(mut matrix: Array2<f64>) -> Array2<f64> {
    let n = matrix.nrows();
    for mut column in matrix.axis_iter_mut(Axis(1)) {
        let total = column.sum();
        if total > 0.0 {
            column /= total;
        } else {
            column.fill(1.0 / n as f64);
        }
    }
    matrix
}

/// Transition matrix whose entry `[[s, t]]` is the share of `t`'s importance
/// credited to its source `s`.
pub fn forward_transition(
    gain: &GainMatrix,
    connections: &ConnectionMatrix,
    dummy_weight: f64,
) -> Result<Array2<f64>> {
    let w = weights(gain, connections, dummy_weight)?;
    Ok(column_stochastic(w.reversed_axes()))
}

/// Transition matrix whose entry `[[t, s]]` is the share of `s`'s importance
/// passed on to its target `t`.
pub fn backward_transition(
    gain: &GainMatrix,
    connections: &ConnectionMatrix,
    dummy_weight: f64,
) -> Result<Array2<f64>> {
    Ok(column_stochastic(weights(gain, connections, dummy_weight)?))
}

/// Dominant eigenvector of a column-stochastic `matrix`, normalised to sum 1.
pub fn calculate_rank(
    matrix: ArrayView2<'_, f64>,
    variables: &[String],
    config: &RankingConfig,
) -> Result<Ranking> {
    config.validate()?;
    let n = variables.len();
    if n == 0 {
        return Err(LoopTeError::invalid("variables", "cannot rank zero variables"));
    }
    if matrix.dim() != (n, n) {
        return Err(LoopTeError::invalid(
            "matrix",
            format!("expected {n}x{n}, got {:?}", matrix.dim()),
        ));
    }

    let mut scores = Array1::from_elem(n, 1.0 / n as f64);
    let mut converged = false;
    let mut iteration = 0;
    while iteration < config.max_iterations && !converged {
        // Lazy step: same fixed point, no oscillation on periodic chains.
        let mut next = (&scores + &matrix.dot(&scores)) * 0.5;
        let total = next.sum();
        if total > 0.0 {
            next /= total;
        }
        let change: f64 = (&next - &scores).mapv(f64::abs).sum();
        scores = next;
        iteration += 1;
        converged = change < config.tolerance;
    }

    if converged {
        debug!(iterations = iteration, "ranking converged");
    } else {
        warn!(iterations = iteration, "ranking did not converge");
    }

    Ok(Ranking {
        variables: variables.to_vec(),
        importances: scores,
    })
}

/// `alpha · forward + (1 − alpha) · backward`.
pub fn blended_ranking(forward: &Ranking, backward: &Ranking, alpha: f64) -> Result<Ranking> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(LoopTeError::invalid("alpha", format!("{alpha} is outside [0, 1]")));
    }
    if forward.variables != backward.variables {
        return Err(LoopTeError::invalid(
            "rankings",
            "forward and backward rankings cover different variables",
        ));
    }
    Ok(Ranking {
        variables: forward.variables.clone(),
        importances: &forward.importances * alpha + &backward.importances * (1.0 - alpha),
    })
}

/// Forward, backward and blended ranking of one gain matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GainRanking {
    pub forward: Ranking,
    pub backward: Ranking,
    pub blended: Ranking,
}

pub fn rank_gain_matrix(
    gain: &GainMatrix,
    connections: &ConnectionMatrix,
    config: &RankingConfig,
) -> Result<GainRanking> {
    config.validate()?;
    let forward = calculate_rank(
        forward_transition(gain, connections, config.dummy_weight)?.view(),
        &connections.variables,
        config,
    )?;
    let backward = calculate_rank(
        backward_transition(gain, connections, config.dummy_weight)?.view(),
        &connections.variables,
        config,
    )?;
    let blended = blended_ranking(&forward, &backward, config.alpha)?;
    Ok(GainRanking {
        forward,
        backward,
        blended,
    })
}

/// Importance of each variable in the first window and its change between
/// consecutive windows.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientImportance {
    pub variables: Vec<String>,
    pub base: Array1<f64>,
    /// `variables × (windows − 1)`; column `w` is window `w + 1` minus window `w`
    pub diffs: Array2<f64>,
}

pub fn transient_importance(rankings: &[Ranking]) -> Result<TransientImportance> {
    let first = rankings
        .first()
        .ok_or_else(|| LoopTeError::invalid("rankings", "need at least one ranking"))?;
    if rankings.iter().any(|r| r.variables != first.variables) {
        return Err(LoopTeError::invalid(
            "rankings",
            "rankings cover different variables",
        ));
    }
    let n = first.variables.len();
    let mut diffs = Array2::zeros((n, rankings.len() - 1));
    for (w, pair) in rankings.windows(2).enumerate() {
        diffs
            .column_mut(w)
            .assign(&(&pair[1].importances - &pair[0].importances));
    }
    Ok(TransientImportance {
        variables: first.variables.clone(),
        base: first.importances.clone(),
        diffs,
    })
}

/// Per-window gain matrices and rankings.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientRanking {
    pub gains: Vec<GainMatrixReport>,
    pub rankings: Vec<GainRanking>,
    pub transient: TransientImportance,
}

/// Gain matrix and blended ranking for each window of `data`
/// (`variables × samples`), followed by the transient importance changes.
pub fn rank_windows(
    data: ArrayView2<'_, f64>,
    connections: &ConnectionMatrix,
    te_config: &TeConfig,
    ranking_config: &RankingConfig,
    window_len: usize,
    window_count: usize,
    policy: PairFailurePolicy,
) -> Result<TransientRanking> {
    let windows = split_windows(data, window_len, window_count)?;
    let mut gains = Vec::with_capacity(windows.len());
    let mut rankings = Vec::with_capacity(windows.len());
    for (index, window) in windows.iter().enumerate() {
        debug!(window = index, "ranking window");
        let report = build_gain_matrix(window.view(), connections, te_config, policy)?;
        rankings.push(rank_gain_matrix(&report.gain, connections, ranking_config)?);
        gains.push(report);
    }
    let blended: Vec<Ranking> = rankings.iter().map(|r| r.blended.clone()).collect();
    let transient = transient_importance(&blended)?;
    Ok(TransientRanking {
        gains,
        rankings,
        transient,
    })
}
