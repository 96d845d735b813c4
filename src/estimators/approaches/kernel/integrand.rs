// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pointwise transfer entropy integrand.
//!
//! p(x⁺, x, y) · ln( [p(x⁺, x, y) / p(x, y)] / [p(x⁺, x) / p(x)] )
//!
//! Two guards keep the sum finite: every density is floored at
//! [`DENSITY_FLOOR`], and negative terms are clamped to zero. Negative terms
//! arise from density estimation noise in the tails; clamping them biases the
//! estimate upwards and is a known approximation rather than a derivation.

use crate::estimators::approaches::kernel::DensitySet;
use crate::estimators::traits::DensityEstimate;

/// Floor applied to every density before division and logarithm.
pub const DENSITY_FLOOR: f64 = 1e-300;

/// One integrand evaluation with the guards that fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integrand {
    /// Non-negative integrand value
    pub value: f64,
    /// At least one density was below the floor
    pub floored: bool,
    /// The raw value was negative (or NaN) and replaced by zero
    pub clamped: bool,
}

/// Combines four already evaluated densities into one integrand term.
#[inline]
pub fn integrand_from_densities(joint: f64, hist_pair: f64, pred_pair: f64, marginal: f64) -> Integrand {
    let mut floored = false;
    let mut floor = |d: f64| {
        // NaN also fails this comparison and is floored.
        if d >= DENSITY_FLOOR {
            d
        } else {
            floored = true;
            DENSITY_FLOOR
        }
    };
    let p3 = floor(joint);
    let p2xy = floor(hist_pair);
    let p2px = floor(pred_pair);
    let p1 = floor(marginal);

    // Expanded log of the nested ratio; the ratio itself can overflow.
    let raw = p3 * (p3.ln() - p2xy.ln() - p2px.ln() + p1.ln());
    if raw >= 0.0 {
        Integrand {
            value: raw,
            floored,
            clamped: false,
        }
    } else {
        Integrand {
            value: 0.0,
            floored,
            clamped: true,
        }
    }
}

/// Evaluates the integrand at `(pred, x_hist, y_hist)`.
pub fn te_integrand<J, P, M>(
    densities: &DensitySet<J, P, M>,
    pred: f64,
    x_hist: f64,
    y_hist: f64,
) -> Integrand
where
    J: DensityEstimate<3>,
    P: DensityEstimate<2>,
    M: DensityEstimate<1>,
{
    integrand_from_densities(
        densities.joint.evaluate(&[pred, x_hist, y_hist]),
        densities.hist_pair.evaluate(&[x_hist, y_hist]),
        densities.pred_pair.evaluate(&[pred, x_hist]),
        densities.marginal.evaluate(&[x_hist]),
    )
}
