// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lag embedding of a predicted/predicting series pair.
//!
//! Given a two-row matrix `[x; y]` of `n` samples, `sub_samples = s` and
//! `timelag = τ`, the embedding uses only the most recent tail of the data:
//!
//! - `x_pred[i]    = x[n - s + i]`
//! - `x_hist[r][i] = x[n - s - 1 - r·τ + i]`
//! - `y_hist[r][i] = y[n - s - (r + 1)·τ + i]`
//!
//! Row 0 of the x history is the sample directly preceding the predicted one,
//! while row 0 of the y history lies a full `τ` behind it. The prediction
//! horizon therefore equals the time lag for the predicting variable only.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, s, stack};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{LoopTeError, Result};

/// Parameters of the lag embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingSpec {
    pub timelag: usize,
    pub sub_samples: usize,
    /// History depth `k` of the predicted variable.
    pub x_history: usize,
    /// History depth `l` of the predicting variable.
    pub y_history: usize,
}

impl EmbeddingSpec {
    /// Spec with `k = l = 1`.
    pub fn new(timelag: usize, sub_samples: usize) -> Self {
        Self {
            timelag,
            sub_samples,
            x_history: 1,
            y_history: 1,
        }
    }

    pub fn with_history(mut self, x_history: usize, y_history: usize) -> Self {
        self.x_history = x_history;
        self.y_history = y_history;
        self
    }

    /// Smallest series length this embedding can be built from.
    pub fn required_samples(&self) -> usize {
        let x_reach = 1 + (self.x_history - 1) * self.timelag;
        let y_reach = self.y_history * self.timelag;
        self.sub_samples + x_reach.max(y_reach)
    }

    fn validate(&self) -> Result<()> {
        if self.timelag == 0 {
            return Err(LoopTeError::invalid("timelag", "must be at least 1"));
        }
        if self.sub_samples == 0 {
            return Err(LoopTeError::invalid("sub_samples", "must be at least 1"));
        }
        if self.x_history == 0 || self.y_history == 0 {
            return Err(LoopTeError::invalid("history", "history depths must be at least 1"));
        }
        Ok(())
    }
}

/// Embedded vectors for one transfer entropy estimate.
///
/// `x_hist` has shape `(k, sub_samples)` and `y_hist` shape `(l, sub_samples)`.
/// Column `i` of both, together with `x_pred[i]`, stems from one reference time.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedVectors {
    pub x_pred: Array1<f64>,
    pub x_hist: Array2<f64>,
    pub y_hist: Array2<f64>,
}

impl EmbeddedVectors {
    pub fn len(&self) -> usize {
        self.x_pred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_pred.is_empty()
    }

    /// First history row of the predicted variable.
    pub fn x_hist_row(&self) -> ArrayView1<'_, f64> {
        self.x_hist.row(0)
    }

    /// First history row of the predicting variable.
    pub fn y_hist_row(&self) -> ArrayView1<'_, f64> {
        self.y_hist.row(0)
    }
}

/// Builds the embedding from a two-row matrix `[x; y]` (rows beyond the
/// second are ignored). A single row fails with `InsufficientData`.
pub fn embed(data: ArrayView2<'_, f64>, spec: &EmbeddingSpec) -> Result<EmbeddedVectors> {
    spec.validate()?;
    if data.nrows() < 2 {
        return Err(LoopTeError::InsufficientData {
            required: 2,
            available: data.nrows(),
        });
    }

    let n = data.ncols();
    let required = spec.required_samples();
    if n < required {
        return Err(LoopTeError::InsufficientData {
            required,
            available: n,
        });
    }

    let sub = spec.sub_samples;
    let tau = spec.timelag;
    let x = data.row(0);
    let y = data.row(1);

    let x_pred = x.slice(s![n - sub..]).to_owned();

    let mut x_hist = Array2::<f64>::zeros((spec.x_history, sub));
    for (r, mut row) in x_hist.axis_iter_mut(Axis(0)).enumerate() {
        let start = n - sub - 1 - r * tau;
        row.assign(&x.slice(s![start..start + sub]));
    }

    let mut y_hist = Array2::<f64>::zeros((spec.y_history, sub));
    for (r, mut row) in y_hist.axis_iter_mut(Axis(0)).enumerate() {
        let start = n - sub - (r + 1) * tau;
        row.assign(&y.slice(s![start..start + sub]));
    }

    Ok(EmbeddedVectors {
        x_pred,
        x_hist,
        y_hist,
    })
}

/// Embedding from two separate series of equal length.
pub fn te_observations(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    spec: &EmbeddingSpec,
) -> Result<EmbeddedVectors> {
    if x.len() != y.len() {
        return Err(LoopTeError::invalid(
            "series",
            format!("x has {} samples but y has {}", x.len(), y.len()),
        ));
    }
    let data = stack(Axis(0), &[x.view(), y.view()])
        .map_err(|e| LoopTeError::invalid("series", e.to_string()))?;
    embed(data.view(), spec)
}

/// Permutes the columns of `history` with a seeded generator.
///
/// Applied to the y history this keeps its marginal distribution but destroys
/// any temporal coupling to `x_pred`, giving a surrogate for significance tests.
pub fn shuffle_columns(history: &Array2<f64>, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..history.ncols()).collect();
    indices.shuffle(&mut rng);
    history.select(Axis(1), &indices)
}

/// Copy of `vectors` with a shuffled y history.
pub fn surrogate_observations(vectors: &EmbeddedVectors, seed: u64) -> EmbeddedVectors {
    EmbeddedVectors {
        x_pred: vectors.x_pred.clone(),
        x_hist: vectors.x_hist.clone(),
        y_hist: shuffle_columns(&vectors.y_hist, seed),
    }
}
