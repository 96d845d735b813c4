// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Gaussian Kernel Density Estimation
//!
//! This module implements a multivariate Gaussian kernel density estimate whose
//! behaviour matches `scipy.stats.gaussian_kde`.
//!
//! ## Theoretical Background
//!
//! For samples `z_1 … z_n` in `d` dimensions the estimate is
//!
//! p̂(z) = 1 / (n √det(2π Σ_h)) ∑ exp(-½ (z - z_j)ᵀ Σ_h⁻¹ (z - z_j))
//!
//! where `Σ_h = Σ · f²` is the unbiased sample covariance scaled by the squared
//! bandwidth factor `f` (see [`BandwidthRule`]). Using the full covariance makes
//! the kernel adapt to both the scale and the correlation of the data.
//!
//! ## Implementation Details
//!
//! The Mahalanobis distance is computed with a forward substitution against the
//! lower Cholesky factor `L` of `Σ_h` (`L Lᵀ = Σ_h`), so the precision matrix is
//! never formed on the CPU. The normalisation uses `√det(Σ_h) = ∏ diag(L)`.
//!
//! Three evaluation backends are available (see [`DensityBackend`]):
//!
//! - **Exact**: every sample contributes to every query.
//! - **KdTree**: a KD-tree range query limited to a radius of 8 standard
//!   deviations along the widest axis. The trace of `Σ_h` bounds its largest
//!   eigenvalue, so the ellipsoid of interest is always inside the search ball.
//!   Contributions outside it are below `exp(-32)` of the kernel peak.
//! - **Gpu**: batched evaluation via wgpu when the `gpu_support` feature is
//!   enabled; single-point queries always run on the CPU.

use ndarray::{Array1, Array2};
use ndarray_linalg::{Cholesky, UPLO};
use ndarray_stats::CorrelationExt;
use tracing::debug;

use crate::config::{BandwidthRule, DensityBackend, KdeConfig};
use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::common_nd::dataset::NdDataset;
use crate::estimators::traits::DensityEstimate;

/// Squared search radius in units of the largest kernel variance (8σ)².
const SEARCH_RADIUS_SIGMAS_SQ: f64 = 64.0;

/// Relative pivot tolerance below which the covariance counts as singular.
const SINGULAR_PIVOT_TOLERANCE: f64 = 1e-12;

/// Multivariate Gaussian kernel density estimate over `K`-dimensional samples.
pub struct GaussianKde<const K: usize> {
    /// Samples with their KD-tree
    pub data: NdDataset<K>,
    /// Bandwidth factor `f` produced by the bandwidth rule
    pub bandwidth_factor: f64,
    /// Kernel covariance `Σ_h = Σ · f²`
    pub kernel_covariance: Array2<f64>,
    /// Lower triangular matrix L from Cholesky decomposition of `Σ_h`
    pub cholesky_factor: Array2<f64>,
    /// `n · (2π)^(K/2) · √det(Σ_h)`
    pub normalization: f64,
    /// Squared radius used by the KD-tree backend
    pub search_radius_sq: f64,
    pub backend: DensityBackend,
}

impl<const K: usize> GaussianKde<K> {
    /// Fits the estimate to `points` using the bandwidth rule and backend in `config`.
    ///
    /// Fails with `DensityFit` for fewer than two points, non-finite samples or a
    /// singular covariance (for instance a constant coordinate, or one
    /// coordinate an exact linear function of the others).
    pub fn fit(points: Vec<[f64; K]>, config: &KdeConfig) -> Result<Self> {
        config.validate()?;
        let n = points.len();
        if n < 2 {
            return Err(LoopTeError::density_fit(K, n, "at least two points are required"));
        }
        if !points.iter().all(|p| p.iter().all(|v| v.is_finite())) {
            return Err(LoopTeError::density_fit(K, n, "samples must be finite"));
        }

        let mut by_row = Array2::<f64>::zeros((K, n));
        for (i, point) in points.iter().enumerate() {
            for dim in 0..K {
                by_row[[dim, i]] = point[dim];
            }
        }
        let covariance = by_row
            .view()
            .cov(1.0)
            .map_err(|e| LoopTeError::density_fit(K, n, e.to_string()))?;

        let bandwidth_factor = config.bandwidth.factor(n, K);
        let kernel_covariance = covariance * (bandwidth_factor * bandwidth_factor);

        let cholesky_factor = cholesky_lower(&kernel_covariance).ok_or_else(|| {
            LoopTeError::density_fit(
                K,
                n,
                "covariance matrix is singular (zero variance or collinear coordinates)",
            )
        })?;

        let sqrt_det: f64 = cholesky_factor.diag().iter().product();
        let normalization =
            n as f64 * (2.0 * std::f64::consts::PI).powf(K as f64 / 2.0) * sqrt_det;
        let search_radius_sq = SEARCH_RADIUS_SIGMAS_SQ * kernel_covariance.diag().sum();

        debug!(
            dims = K,
            samples = n,
            bandwidth_factor,
            rule = ?config.bandwidth,
            "fitted gaussian kde"
        );

        Ok(Self {
            data: NdDataset::from_points(points),
            bandwidth_factor,
            kernel_covariance,
            cholesky_factor,
            normalization,
            search_radius_sq,
            backend: config.backend,
        })
    }

    /// Fits the estimate with Silverman's rule and exact evaluation.
    pub fn silverman(points: Vec<[f64; K]>) -> Result<Self> {
        Self::fit(
            points,
            &KdeConfig {
                bandwidth: BandwidthRule::Silverman,
                backend: DensityBackend::Exact,
            },
        )
    }

    /// Calculates the squared Mahalanobis distance between two points
    ///
    /// d_M^2 = (p1 - p2)^T Σ_h^-1 (p1 - p2) = ||L^-1 (p1 - p2)||^2
    /// where L is the lower triangular Cholesky factor.
    pub fn mahalanobis_sq(&self, p1: &[f64; K], p2: &[f64; K]) -> f64 {
        let l = &self.cholesky_factor;
        let mut z = [0.0; K];
        for i in 0..K {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * z[j];
            }
            z[i] = (p1[i] - p2[i] - sum) / l[[i, i]];
        }
        z.iter().map(|&val| val * val).sum()
    }

    /// Maps a point into the whitened frame `L⁻¹ p`, where the kernel is isotropic.
    pub fn whiten(&self, p: &[f64; K]) -> [f64; K] {
        let l = &self.cholesky_factor;
        let mut z = [0.0; K];
        for i in 0..K {
            let mut sum = 0.0;
            for j in 0..i {
                sum += l[[i, j]] * z[j];
            }
            z[i] = (p[i] - sum) / l[[i, i]];
        }
        z
    }

    /// Density at `query` summing the kernel over every sample.
    pub fn density_exact(&self, query: &[f64; K]) -> f64 {
        let sum_k: f64 = self
            .data
            .points
            .iter()
            .map(|p| (-0.5 * self.mahalanobis_sq(query, p)).exp())
            .sum();
        sum_k / self.normalization
    }

    /// Density at `query` summing only samples found by the KD-tree range query.
    pub fn density_kdtree(&self, query: &[f64; K]) -> f64 {
        let mut candidates = self.data.within(query, self.search_radius_sq);
        // Fixed summation order keeps repeated evaluations bit-identical.
        candidates.sort_unstable();
        let sum_k: f64 = candidates
            .iter()
            .map(|&idx| (-0.5 * self.mahalanobis_sq(query, &self.data.points[idx])).exp())
            .sum();
        sum_k / self.normalization
    }

    /// Densities at every sample point (resubstitution estimate).
    pub fn kde_probability_density(&self) -> Array1<f64> {
        self.data
            .points
            .iter()
            .map(|p| self.evaluate(p))
            .collect()
    }
}

impl<const K: usize> DensityEstimate<K> for GaussianKde<K> {
    fn evaluate(&self, point: &[f64; K]) -> f64 {
        match self.backend {
            DensityBackend::KdTree => self.density_kdtree(point),
            DensityBackend::Exact | DensityBackend::Gpu => self.density_exact(point),
        }
    }

    fn evaluate_many(&self, points: &[[f64; K]]) -> Vec<f64> {
        #[cfg(feature = "gpu_support")]
        {
            if self.backend == DensityBackend::Gpu {
                match self.evaluate_many_gpu(points) {
                    Ok(values) => return values,
                    Err(e) => {
                        tracing::warn!(error = %e, "gpu density evaluation failed, falling back to cpu");
                    }
                }
            }
        }
        points.iter().map(|p| self.evaluate(p)).collect()
    }

    fn n_samples(&self) -> usize {
        self.data.n
    }
}

/// Lower Cholesky factor of a symmetric matrix, or `None` if it is not
/// (numerically) positive definite.
///
/// LAPACK accepts any strictly positive pivot, so each squared diagonal entry
/// of the factor is also checked against the matching diagonal entry of `a`.
pub fn cholesky_lower(a: &Array2<f64>) -> Option<Array2<f64>> {
    let l = a.cholesky(UPLO::Lower).ok()?;
    let well_conditioned = l
        .diag()
        .iter()
        .zip(a.diag().iter())
        .all(|(&l_ii, &a_ii)| {
            let pivot = l_ii * l_ii;
            pivot.is_finite() && pivot > a_ii.abs() * SINGULAR_PIVOT_TOLERANCE
        });
    well_conditioned.then_some(l)
}
