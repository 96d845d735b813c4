// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Riemann-sum integration of the transfer entropy integrand.
//!
//! Each embedded variable gets an equally spaced axis of `amp_bins` points
//! from its observed minimum to its maximum. The integrand is summed over the
//! Cartesian product of the three axes and scaled by the cell volume.
//!
//! The marginal and pairwise densities only depend on one or two coordinates,
//! so they are tabulated once per axis or plane. The joint density is
//! evaluated per slab of constant `x_pred`; slabs are independent and run on
//! the rayon pool when requested. Slab sums are collected in index order and
//! added sequentially, so serial and parallel runs return identical results.

use ndarray::{Array1, ArrayView1};
use rayon::prelude::*;
use tracing::debug;

use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::kernel::DensitySet;
use crate::estimators::approaches::kernel::integrand::integrand_from_densities;
use crate::estimators::traits::DensityEstimate;
use crate::estimators::utils::te_slicing::EmbeddedVectors;

/// Clamped fraction above which an estimate is reported as unreliable.
const UNRELIABLE_CLAMPED_FRACTION: f64 = 0.5;

/// Three equally spaced axes spanning the observed ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeGrid {
    pub x_pred: Array1<f64>,
    pub x_hist: Array1<f64>,
    pub y_hist: Array1<f64>,
}

fn axis_over<'a>(values: impl IntoIterator<Item = &'a f64>, amp_bins: usize) -> Result<Array1<f64>> {
    let (min, max) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !(min.is_finite() && max.is_finite()) {
        return Err(LoopTeError::invalid("vectors", "embedded vectors must be non-empty and finite"));
    }
    Ok(Array1::linspace(min, max, amp_bins))
}

impl AmplitudeGrid {
    /// Builds the axes over `x_pred` and over every row of both histories.
    pub fn new(vectors: &EmbeddedVectors, amp_bins: usize) -> Result<Self> {
        if amp_bins < 2 {
            return Err(LoopTeError::InvalidGrid { amp_bins });
        }
        Ok(Self {
            x_pred: axis_over(vectors.x_pred.iter(), amp_bins)?,
            x_hist: axis_over(vectors.x_hist.iter(), amp_bins)?,
            y_hist: axis_over(vectors.y_hist.iter(), amp_bins)?,
        })
    }

    pub fn amp_bins(&self) -> usize {
        self.x_pred.len()
    }

    /// First-interval spacing of each axis.
    pub fn spacing(&self) -> [f64; 3] {
        let step = |axis: &Array1<f64>| axis[1] - axis[0];
        [step(&self.x_pred), step(&self.x_hist), step(&self.y_hist)]
    }

    pub fn cell_volume(&self) -> f64 {
        self.spacing().iter().product()
    }

    /// `(x_hist[j], y_hist[k])` in `j`-major order.
    fn hist_plane(&self) -> Vec<[f64; 2]> {
        plane(self.x_hist.view(), self.y_hist.view())
    }

    /// `(x_pred[i], x_hist[j])` in `i`-major order.
    fn pred_plane(&self) -> Vec<[f64; 2]> {
        plane(self.x_pred.view(), self.x_hist.view())
    }

    /// Joint query points with `x_pred` fixed at index `i`.
    fn joint_slab(&self, i: usize) -> Vec<[f64; 3]> {
        let pred = self.x_pred[i];
        self.hist_plane()
            .into_iter()
            .map(|[xh, yh]| [pred, xh, yh])
            .collect()
    }

    fn joint_cube(&self) -> Vec<[f64; 3]> {
        (0..self.amp_bins()).flat_map(|i| self.joint_slab(i)).collect()
    }
}

fn plane(outer: ArrayView1<'_, f64>, inner: ArrayView1<'_, f64>) -> Vec<[f64; 2]> {
    outer
        .iter()
        .flat_map(|&a| inner.iter().map(move |&b| [a, b]))
        .collect()
}

/// Counts of grid cells where a numerical guard fired.
///
/// These are expected near the tails of the distributions and never abort an
/// estimate; a high clamped fraction marks an estimate as unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub grid_cells: usize,
    /// Cells where at least one density fell below the floor
    pub floored_cells: usize,
    /// Cells whose integrand was negative and clamped to zero
    pub clamped_cells: usize,
}

impl Diagnostics {
    pub fn floored_fraction(&self) -> f64 {
        if self.grid_cells == 0 {
            0.0
        } else {
            self.floored_cells as f64 / self.grid_cells as f64
        }
    }

    pub fn clamped_fraction(&self) -> f64 {
        if self.grid_cells == 0 {
            0.0
        } else {
            self.clamped_cells as f64 / self.grid_cells as f64
        }
    }

    fn absorb(&mut self, other: &Diagnostics) {
        self.grid_cells += other.grid_cells;
        self.floored_cells += other.floored_cells;
        self.clamped_cells += other.clamped_cells;
    }
}

/// Result of one grid integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridIntegral {
    pub value: f64,
    pub cell_volume: f64,
    pub diagnostics: Diagnostics,
}

#[derive(Default)]
struct SlabSum {
    sum: f64,
    diagnostics: Diagnostics,
}

/// Integrates the transfer entropy integrand over the amplitude grid.
///
/// Fails with `InvalidGrid` when `amp_bins < 2`.
pub fn integrate<J, P, M>(
    densities: &DensitySet<J, P, M>,
    vectors: &EmbeddedVectors,
    amp_bins: usize,
    parallel: bool,
) -> Result<GridIntegral>
where
    J: DensityEstimate<3>,
    P: DensityEstimate<2>,
    M: DensityEstimate<1>,
{
    let grid = AmplitudeGrid::new(vectors, amp_bins)?;
    let n = amp_bins;

    let marginal_points: Vec<[f64; 1]> = grid.x_hist.iter().map(|&v| [v]).collect();
    let marginal = densities.marginal.evaluate_many(&marginal_points);
    let hist_pair = densities.hist_pair.evaluate_many(&grid.hist_plane());
    let pred_pair = densities.pred_pair.evaluate_many(&grid.pred_plane());

    let slab = |i: usize, joint: &[f64]| -> SlabSum {
        let mut out = SlabSum::default();
        for j in 0..n {
            for k in 0..n {
                let cell = integrand_from_densities(
                    joint[j * n + k],
                    hist_pair[j * n + k],
                    pred_pair[i * n + j],
                    marginal[j],
                );
                out.sum += cell.value;
                out.diagnostics.grid_cells += 1;
                out.diagnostics.floored_cells += usize::from(cell.floored);
                out.diagnostics.clamped_cells += usize::from(cell.clamped);
            }
        }
        out
    };

    let slabs: Vec<SlabSum> = if densities.batched {
        let joint = densities.joint.evaluate_many(&grid.joint_cube());
        joint
            .chunks(n * n)
            .enumerate()
            .map(|(i, values)| slab(i, values))
            .collect()
    } else if parallel {
        (0..n)
            .into_par_iter()
            .map(|i| slab(i, &densities.joint.evaluate_many(&grid.joint_slab(i))))
            .collect()
    } else {
        (0..n)
            .map(|i| slab(i, &densities.joint.evaluate_many(&grid.joint_slab(i))))
            .collect()
    };

    let mut sum = 0.0;
    let mut diagnostics = Diagnostics::default();
    for s in &slabs {
        sum += s.sum;
        diagnostics.absorb(&s.diagnostics);
    }

    let cell_volume = grid.cell_volume();
    if diagnostics.clamped_fraction() > UNRELIABLE_CLAMPED_FRACTION {
        debug!(
            clamped = diagnostics.clamped_cells,
            floored = diagnostics.floored_cells,
            cells = diagnostics.grid_cells,
            "most integrand terms were clamped; estimate is unreliable"
        );
    }

    Ok(GridIntegral {
        value: sum * cell_volume,
        cell_volume,
        diagnostics,
    })
}
