// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error type shared by every estimator and by the network layer.
//!
//! Hard failures (bad shapes, bad parameters, degenerate point clouds) are
//! reported through [`LoopTeError`]. Numeric degeneracies met while
//! integrating (floored densities, clamped integrand terms) are not errors;
//! they are counted in
//! [`Diagnostics`](crate::estimators::approaches::kernel::Diagnostics).

use thiserror::Error;

/// Errors raised by the transfer entropy pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoopTeError {
    /// The embedding window needs more samples than the series provides, or
    /// the input holds fewer than the two series `[x; y]` (counted in rows).
    #[error("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// A kernel density estimate could not be fitted to a point cloud.
    #[error("density fit failed for {dims}-D cloud of {points} points: {reason}")]
    DensityFit {
        dims: usize,
        points: usize,
        reason: String,
    },

    /// The amplitude grid cannot be built with the requested bin count.
    #[error("invalid amplitude grid: {amp_bins} bins requested, at least 2 required")]
    InvalidGrid { amp_bins: usize },

    /// A parameter is out of its valid range or inputs have mismatched shapes.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// GPU evaluation failed (only surfaced by the explicit GPU entry points).
    #[error("gpu evaluation failed: {0}")]
    Gpu(String),
}

impl LoopTeError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        LoopTeError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn density_fit(dims: usize, points: usize, reason: impl Into<String>) -> Self {
        LoopTeError::DensityFit {
            dims,
            points,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoopTeError>;
