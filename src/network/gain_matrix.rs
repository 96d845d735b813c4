// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection topology and the gain matrices built over it.
//!
//! Both matrices are indexed `[[target, source]]`: row `t`, column `s` holds
//! the influence of variable `s` on variable `t`. Gains come either from
//! pairwise transfer entropy or, as a cheaper linear substitute, from the
//! partial correlation of the rows.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView2};
use ndarray_linalg::Inverse;
use ndarray_stats::CorrelationExt;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::config::TeConfig;
use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::kernel::Diagnostics;
use crate::estimators::transfer_entropy::KernelTransferEntropy;

/// Directed loop topology over named variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionMatrix {
    pub variables: Vec<String>,
    /// `adjacency[[target, source]]` is true when `source` can influence `target`
    pub adjacency: Array2<bool>,
}

impl ConnectionMatrix {
    pub fn new(variables: Vec<String>, adjacency: Array2<bool>) -> Result<Self> {
        let n = variables.len();
        if adjacency.dim() != (n, n) {
            return Err(LoopTeError::invalid(
                "adjacency",
                format!("expected {n}x{n} for {n} variables, got {:?}", adjacency.dim()),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = variables.iter().find(|v| !seen.insert(v.as_str())) {
            return Err(LoopTeError::invalid("variables", format!("duplicate variable `{dup}`")));
        }
        Ok(Self { variables, adjacency })
    }

    /// Every ordered pair of distinct variables connected.
    pub fn fully_connected(variables: Vec<String>) -> Self {
        let n = variables.len();
        let adjacency = Array2::from_shape_fn((n, n), |(t, s)| t != s);
        Self { variables, adjacency }
    }

    /// Builds the matrix from `(source, target)` name pairs.
    pub fn from_edges(variables: Vec<String>, edges: &[(&str, &str)]) -> Result<Self> {
        let n = variables.len();
        let mut matrix = Self::new(variables, Array2::from_elem((n, n), false))?;
        for &(source, target) in edges {
            let s = matrix.index_of(source)?;
            let t = matrix.index_of(target)?;
            matrix.adjacency[[t, s]] = true;
        }
        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.variables
            .iter()
            .position(|v| v == name)
            .ok_or_else(|| LoopTeError::invalid("variable", format!("unknown variable `{name}`")))
    }

    pub fn is_connected(&self, source: usize, target: usize) -> bool {
        self.adjacency[[target, source]]
    }

    /// Connected `(source, target)` pairs in row-major order, self-loops excluded.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let n = self.len();
        (0..n)
            .flat_map(|t| (0..n).map(move |s| (s, t)))
            .filter(|&(s, t)| s != t && self.is_connected(s, t))
            .collect()
    }
}

/// Pairwise influence weights, `values[[target, source]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GainMatrix {
    pub variables: Vec<String>,
    pub values: Array2<f64>,
}

impl GainMatrix {
    pub fn gain(&self, source: usize, target: usize) -> f64 {
        self.values[[target, source]]
    }

    /// Copy with every weight below `threshold` set to zero.
    pub fn pruned(&self, threshold: f64) -> GainMatrix {
        GainMatrix {
            variables: self.variables.clone(),
            values: self.values.mapv(|v| if v >= threshold { v } else { 0.0 }),
        }
    }
}

/// What to do when the estimate for one pair fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairFailurePolicy {
    /// Return the first failure (in edge order).
    #[default]
    Abort,
    /// Leave the entry at zero and report the failure.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairFailure {
    pub source: String,
    pub target: String,
    pub error: LoopTeError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeDiagnostics {
    pub source: String,
    pub target: String,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GainMatrixReport {
    pub gain: GainMatrix,
    pub failures: Vec<PairFailure>,
    pub diagnostics: Vec<EdgeDiagnostics>,
}

/// Transfer entropy for every connected pair of rows in `data`
/// (`variables × samples`).
///
/// Entry `[[t, s]]` is the transfer entropy from `s` to `t`, i.e. `t` is the
/// predicted and `s` the predicting variable. Pairs are evaluated in parallel
/// and share no state.
pub fn build_gain_matrix(
    data: ArrayView2<'_, f64>,
    connections: &ConnectionMatrix,
    config: &TeConfig,
    policy: PairFailurePolicy,
) -> Result<GainMatrixReport> {
    let n = connections.len();
    if data.nrows() != n {
        return Err(LoopTeError::invalid(
            "data",
            format!("{} rows of data for {n} variables", data.nrows()),
        ));
    }
    config.validate()?;

    let edges = connections.edges();
    debug!(variables = n, edges = edges.len(), "building gain matrix");

    let results: Vec<_> = edges
        .par_iter()
        .map(|&(s, t)| {
            let estimate = KernelTransferEntropy::new(data.row(t), data.row(s), *config)
                .and_then(|te| te.estimate());
            (s, t, estimate)
        })
        .collect();

    let mut values = Array2::<f64>::zeros((n, n));
    let mut failures = Vec::new();
    let mut diagnostics = Vec::with_capacity(results.len());
    for (s, t, estimate) in results {
        let source = connections.variables[s].clone();
        let target = connections.variables[t].clone();
        match estimate {
            Ok(e) => {
                values[[t, s]] = e.value;
                diagnostics.push(EdgeDiagnostics {
                    source,
                    target,
                    diagnostics: e.diagnostics,
                });
            }
            Err(error) => match policy {
                PairFailurePolicy::Abort => return Err(error),
                PairFailurePolicy::Skip => {
                    warn!(%source, %target, %error, "skipping pair");
                    failures.push(PairFailure { source, target, error });
                }
            },
        }
    }

    Ok(GainMatrixReport {
        gain: GainMatrix {
            variables: connections.variables.clone(),
            values,
        },
        failures,
        diagnostics,
    })
}

/// Partial correlation of every connected pair of rows in `data`
/// (`variables × samples`), controlling for all remaining rows.
///
/// With `P` the inverse of the correlation matrix, entry `[[t, s]]` is
/// `-P[t, s] / √(P[t, t] · P[s, s])`. The result is signed and symmetric over
/// connected pairs; entries of unconnected pairs and the diagonal are zero.
pub fn build_partial_correlation_gain_matrix(
    data: ArrayView2<'_, f64>,
    connections: &ConnectionMatrix,
) -> Result<GainMatrix> {
    let n = connections.len();
    if data.nrows() != n {
        return Err(LoopTeError::invalid(
            "data",
            format!("{} rows of data for {n} variables", data.nrows()),
        ));
    }
    if data.ncols() <= n {
        return Err(LoopTeError::InsufficientData {
            required: n + 1,
            available: data.ncols(),
        });
    }

    let correlation = data
        .pearson_correlation()
        .map_err(|e| LoopTeError::invalid("data", e.to_string()))?;
    if correlation.iter().any(|v| !v.is_finite()) {
        return Err(LoopTeError::invalid("data", "correlation undefined for a constant row"));
    }
    let precision = correlation
        .inv()
        .map_err(|e| LoopTeError::invalid("data", format!("correlation matrix is singular: {e}")))?;
    let diag = precision.diag();
    if diag.iter().any(|&d| !d.is_finite() || d <= 0.0) {
        return Err(LoopTeError::invalid("data", "correlation matrix is singular"));
    }

    let mut values = Array2::<f64>::zeros((n, n));
    for (s, t) in connections.edges() {
        values[[t, s]] = -precision[[t, s]] / (diag[t] * diag[s]).sqrt();
    }
    debug!(variables = n, samples = data.ncols(), "built partial correlation gain matrix");

    Ok(GainMatrix {
        variables: connections.variables.clone(),
        values,
    })
}
