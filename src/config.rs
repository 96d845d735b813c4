// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parameter structs passed explicitly into every computation.
//!
//! All structs implement `Default` and serde (de)serialisation with
//! `#[serde(default)]`, so a driver can load a partial JSON document and have
//! the remaining fields filled in.

use serde::{Deserialize, Serialize};

use crate::error::{LoopTeError, Result};

/// Bandwidth selection rule for the Gaussian KDE.
///
/// The rule yields the factor `f` by which the sample covariance is scaled
/// (`Σ_kernel = Σ · f²`), as in `scipy.stats.gaussian_kde`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "rule", content = "factor")]
pub enum BandwidthRule {
    /// `(n (d + 2) / 4)^(-1 / (d + 4))`
    #[default]
    Silverman,
    /// `n^(-1 / (d + 4))`
    Scott,
    /// A fixed factor, independent of sample size and dimension.
    Fixed(f64),
}

impl BandwidthRule {
    /// Bandwidth factor for `n` points in `d` dimensions.
    pub fn factor(&self, n: usize, d: usize) -> f64 {
        let n = n as f64;
        let d = d as f64;
        match *self {
            BandwidthRule::Silverman => (n * (d + 2.0) / 4.0).powf(-1.0 / (d + 4.0)),
            BandwidthRule::Scott => n.powf(-1.0 / (d + 4.0)),
            BandwidthRule::Fixed(f) => f,
        }
    }
}

/// How fitted densities are evaluated at query points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DensityBackend {
    /// Sum the kernel over every sample.
    #[default]
    Exact,
    /// Only sum samples inside a KD-tree range query (8σ along the widest axis).
    KdTree,
    /// Batched evaluation on the GPU; requires the `gpu_support` feature and
    /// falls back to `Exact` otherwise.
    Gpu,
}

/// Kernel density estimation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KdeConfig {
    pub bandwidth: BandwidthRule,
    pub backend: DensityBackend,
}

impl KdeConfig {
    pub fn validate(&self) -> Result<()> {
        if let BandwidthRule::Fixed(f) = self.bandwidth {
            if !(f.is_finite() && f > 0.0) {
                return Err(LoopTeError::invalid(
                    "bandwidth",
                    format!("fixed bandwidth factor must be positive and finite, got {f}"),
                ));
            }
        }
        Ok(())
    }
}

/// Complete parameter set for one transfer entropy estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeConfig {
    /// Lag between embedding vectors, in samples. Also the prediction horizon.
    pub timelag: usize,
    /// Number of most recent samples used to build the embedding.
    pub sub_samples: usize,
    /// Amplitude grid points per axis.
    pub amp_bins: usize,
    /// History depth of the predicted variable.
    pub x_history: usize,
    /// History depth of the predicting variable.
    pub y_history: usize,
    pub kde: KdeConfig,
    /// Partition the grid integration across the rayon pool.
    pub parallel: bool,
}

impl Default for TeConfig {
    fn default() -> Self {
        Self {
            timelag: 1,
            sub_samples: 500,
            amp_bins: 20,
            x_history: 1,
            y_history: 1,
            kde: KdeConfig::default(),
            parallel: true,
        }
    }
}

impl TeConfig {
    pub fn new(timelag: usize, sub_samples: usize, amp_bins: usize) -> Self {
        Self {
            timelag,
            sub_samples,
            amp_bins,
            ..Self::default()
        }
    }

    pub fn with_kde(mut self, kde: KdeConfig) -> Self {
        self.kde = kde;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the scalar parameters. Grid size is checked separately by the
    /// grid itself so that it surfaces as `InvalidGrid`.
    pub fn validate(&self) -> Result<()> {
        if self.timelag == 0 {
            return Err(LoopTeError::invalid("timelag", "must be at least 1"));
        }
        if self.sub_samples == 0 {
            return Err(LoopTeError::invalid("sub_samples", "must be at least 1"));
        }
        if self.x_history == 0 || self.y_history == 0 {
            return Err(LoopTeError::invalid("history", "history depths must be at least 1"));
        }
        self.kde.validate()
    }
}

/// Settings for eigenvector importance ranking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Weight of the dummy link between every pair of distinct variables.
    pub dummy_weight: f64,
    /// Weight of the forward ranking in the blended ranking.
    pub alpha: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            dummy_weight: 0.01,
            alpha: 0.35,
            tolerance: 1e-10,
            max_iterations: 1000,
        }
    }
}

impl RankingConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(LoopTeError::invalid("alpha", format!("must lie in [0, 1], got {}", self.alpha)));
        }
        if self.dummy_weight.is_nan() || self.dummy_weight < 0.0 {
            return Err(LoopTeError::invalid("dummy_weight", "must be non-negative"));
        }
        if self.max_iterations == 0 {
            return Err(LoopTeError::invalid("max_iterations", "must be at least 1"));
        }
        Ok(())
    }
}
