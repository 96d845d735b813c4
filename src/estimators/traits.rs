// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::Result;

pub trait GlobalValue {
    /// Compute and return the global value of the measure.
    fn global_value(&self) -> Result<f64>;
}

/// A fitted probability density over `K`-dimensional points.
///
/// Implementations return values that are non-negative in exact arithmetic.
/// Floating point evaluation may yield zero or tiny negative values far out in
/// the tails; callers treat those as negligible density rather than errors.
pub trait DensityEstimate<const K: usize>: Send + Sync {
    /// Density at a single point.
    fn evaluate(&self, point: &[f64; K]) -> f64;

    /// Densities at many points. Backends that batch (GPU) override this.
    fn evaluate_many(&self, points: &[[f64; K]]) -> Vec<f64> {
        points.iter().map(|p| self.evaluate(p)).collect()
    }

    /// Number of samples the density was fitted to.
    fn n_samples(&self) -> usize;
}

/// Marker trait for Transfer Entropy estimator instances.
pub trait TransferEntropyEstimator: GlobalValue {}
