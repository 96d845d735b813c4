// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kernel transfer entropy facade: embed → fit densities → integrate.
//!
//! `TE(y → x)` measures how much the history of `y` (the predicting variable)
//! reduces uncertainty about the future of `x` (the predicted variable) beyond
//! what the history of `x` already explains. The estimator is biased; only the
//! relative ordering of its values across variable pairs is meaningful.

use ndarray::{Array2, ArrayView1, Axis, stack};
use rayon::prelude::*;

use crate::config::TeConfig;
use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::kernel::{Diagnostics, fit_densities, integrate};
use crate::estimators::traits::{GlobalValue, TransferEntropyEstimator};
use crate::estimators::utils::te_slicing::{
    EmbeddedVectors, EmbeddingSpec, embed, surrogate_observations,
};

/// Transfer entropy value with integration diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeEstimate {
    /// Non-negative transfer entropy (nats)
    pub value: f64,
    pub cell_volume: f64,
    pub diagnostics: Diagnostics,
}

/// Distribution of transfer entropy over shuffled-source surrogates.
#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateStats {
    pub values: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
}

impl SurrogateStats {
    fn from_values(values: Vec<f64>) -> Self {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = if values.len() < 2 {
            0.0
        } else {
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
        };
        Self {
            values,
            mean,
            std_dev: variance.sqrt(),
        }
    }

    /// `mean + sigmas · std_dev`; estimates below it are not significant.
    pub fn threshold(&self, sigmas: f64) -> f64 {
        self.mean + sigmas * self.std_dev
    }
}

fn embedding_spec(config: &TeConfig) -> EmbeddingSpec {
    EmbeddingSpec::new(config.timelag, config.sub_samples)
        .with_history(config.x_history, config.y_history)
}

/// Transfer entropy from already embedded vectors.
pub fn te_from_vectors(vectors: &EmbeddedVectors, config: &TeConfig) -> Result<TeEstimate> {
    let densities = fit_densities(vectors, &config.kde)?;
    let integral = integrate(&densities, vectors, config.amp_bins, config.parallel)?;
    Ok(TeEstimate {
        value: integral.value,
        cell_volume: integral.cell_volume,
        diagnostics: integral.diagnostics,
    })
}

/// Kernel-based transfer entropy estimator for one ordered variable pair.
///
/// `x` is the predicted variable, `y` the predicting one.
pub struct KernelTransferEntropy {
    /// Two-row matrix `[x; y]`
    pub data: Array2<f64>,
    pub config: TeConfig,
}

impl KernelTransferEntropy {
    /// Fails with `InvalidParameter` when the series differ in length.
    pub fn new(x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>, config: TeConfig) -> Result<Self> {
        if x.len() != y.len() {
            return Err(LoopTeError::invalid(
                "series",
                format!("x has {} samples but y has {}", x.len(), y.len()),
            ));
        }
        let data = stack(Axis(0), &[x.view(), y.view()])
            .map_err(|e| LoopTeError::invalid("series", e.to_string()))?;
        Ok(Self { data, config })
    }

    /// Lag-embedded vectors for the configured time lag and sample count.
    pub fn embedding(&self) -> Result<EmbeddedVectors> {
        self.config.validate()?;
        embed(self.data.view(), &embedding_spec(&self.config))
    }

    /// Transfer entropy with diagnostics.
    pub fn estimate(&self) -> Result<TeEstimate> {
        let vectors = self.embedding()?;
        te_from_vectors(&vectors, &self.config)
    }

    /// Transfer entropy over `n_surrogates` copies with a shuffled y history.
    ///
    /// Surrogate `i` is shuffled with seed `seed + i`, so the result only
    /// depends on the arguments.
    pub fn surrogates(&self, n_surrogates: usize, seed: u64) -> Result<SurrogateStats> {
        if n_surrogates == 0 {
            return Err(LoopTeError::invalid("n_surrogates", "must be at least 1"));
        }
        let vectors = self.embedding()?;
        let values = (0..n_surrogates as u64)
            .into_par_iter()
            .map(|i| {
                let shuffled = surrogate_observations(&vectors, seed.wrapping_add(i));
                te_from_vectors(&shuffled, &self.config).map(|e| e.value)
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(SurrogateStats::from_values(values))
    }
}

impl GlobalValue for KernelTransferEntropy {
    fn global_value(&self) -> Result<f64> {
        self.estimate().map(|e| e.value)
    }
}

impl TransferEntropyEstimator for KernelTransferEntropy {}

pub struct TransferEntropy;

impl TransferEntropy {
    /// Create a kernel transfer entropy estimator with default KDE settings.
    pub fn new_kernel(
        x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
        timelag: usize,
        sub_samples: usize,
        amp_bins: usize,
    ) -> Result<KernelTransferEntropy> {
        KernelTransferEntropy::new(x, y, TeConfig::new(timelag, sub_samples, amp_bins))
    }

    /// Create a kernel transfer entropy estimator with a full configuration.
    pub fn new_kernel_with_config(
        x: ArrayView1<'_, f64>,
        y: ArrayView1<'_, f64>,
        config: TeConfig,
    ) -> Result<KernelTransferEntropy> {
        KernelTransferEntropy::new(x, y, config)
    }
}

/// Transfer entropy from `y` to `x` with Silverman bandwidth and exact KDE evaluation.
pub fn transfer_entropy(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    timelag: usize,
    sub_samples: usize,
    amp_bins: usize,
) -> Result<f64> {
    TransferEntropy::new_kernel(x, y, timelag, sub_samples, amp_bins)?.global_value()
}

/// Surrogate statistics for the pair `(x, y)`; see [`KernelTransferEntropy::surrogates`].
pub fn surrogate_threshold(
    x: ArrayView1<'_, f64>,
    y: ArrayView1<'_, f64>,
    config: TeConfig,
    n_surrogates: usize,
    seed: u64,
) -> Result<SurrogateStats> {
    KernelTransferEntropy::new(x, y, config)?.surrogates(n_surrogates, seed)
}
