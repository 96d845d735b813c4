// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use approx::assert_relative_eq;
use ndarray::array;

use loopte::LoopTeError;
use loopte::config::KdeConfig;
use loopte::estimators::approaches::kernel::{
    AmplitudeGrid, DensitySet, fit_densities, integrate, te_integrand,
};
use loopte::estimators::traits::DensityEstimate;
use loopte::estimators::utils::te_slicing::{EmbeddedVectors, EmbeddingSpec, te_observations};

use crate::test_helpers::coupled_pair;

/// Density that is the same everywhere.
struct Flat(f64);

impl<const K: usize> DensityEstimate<K> for Flat {
    fn evaluate(&self, _point: &[f64; K]) -> f64 {
        self.0
    }

    fn n_samples(&self) -> usize {
        0
    }
}

fn small_vectors() -> EmbeddedVectors {
    EmbeddedVectors {
        x_pred: array![0.0, 1.0, 2.0],
        x_hist: array![[0.0, 2.0, 4.0]],
        y_hist: array![[0.0, 3.0, 6.0]],
    }
}

fn coupled_vectors(sub_samples: usize) -> EmbeddedVectors {
    let (x, y) = coupled_pair(sub_samples + 10, 1, 0.3, 42);
    te_observations(x.view(), y.view(), &EmbeddingSpec::new(1, sub_samples)).unwrap()
}

#[test]
fn grid_axes_span_observed_range() {
    let grid = AmplitudeGrid::new(&small_vectors(), 4).unwrap();
    assert_eq!(grid.amp_bins(), 4);
    assert_relative_eq!(grid.x_pred[3], 2.0);
    assert_relative_eq!(grid.x_hist[3], 4.0);
    assert_relative_eq!(grid.y_hist[3], 6.0);

    let [dp, dx, dy] = grid.spacing();
    assert_relative_eq!(dp, 2.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(dx, 4.0 / 3.0, max_relative = 1e-12);
    assert_relative_eq!(dy, 2.0, max_relative = 1e-12);
    assert_relative_eq!(grid.cell_volume(), 16.0 / 9.0, max_relative = 1e-12);
}

#[test]
fn too_few_bins_is_invalid_grid() {
    for amp_bins in [0, 1] {
        assert_eq!(
            AmplitudeGrid::new(&small_vectors(), amp_bins),
            Err(LoopTeError::InvalidGrid { amp_bins })
        );
    }
}

#[test]
fn constant_integrand_scales_with_grid() {
    // integrand 0.4 · ln 2 in every cell
    let densities = DensitySet::new(Flat(0.4), Flat(0.1), Flat(0.2), Flat(0.1));
    let result = integrate(&densities, &small_vectors(), 4, false).unwrap();

    let expected = 0.4 * 2.0_f64.ln() * 64.0 * (16.0 / 9.0);
    assert_relative_eq!(result.value, expected, max_relative = 1e-12);
    assert_eq!(result.diagnostics.grid_cells, 64);
    assert_eq!(result.diagnostics.clamped_cells, 0);
    assert_eq!(result.diagnostics.floored_cells, 0);
}

#[test]
fn negative_integrand_is_counted_not_summed() {
    let densities = DensitySet::new(Flat(0.1), Flat(0.4), Flat(0.2), Flat(0.1));
    let result = integrate(&densities, &small_vectors(), 3, true).unwrap();
    assert_eq!(result.value, 0.0);
    assert_eq!(result.diagnostics.clamped_cells, 27);
    assert_relative_eq!(result.diagnostics.clamped_fraction(), 1.0);
}

#[test]
fn integrate_matches_pointwise_sum() {
    let vectors = coupled_vectors(120);
    let densities = fit_densities(&vectors, &KdeConfig::default()).unwrap();
    let amp_bins = 8;

    let grid = AmplitudeGrid::new(&vectors, amp_bins).unwrap();
    let mut manual = 0.0;
    for &p in grid.x_pred.iter() {
        let mut slab = 0.0;
        for &xh in grid.x_hist.iter() {
            for &yh in grid.y_hist.iter() {
                slab += te_integrand(&densities, p, xh, yh).value;
            }
        }
        manual += slab;
    }
    manual *= grid.cell_volume();

    let result = integrate(&densities, &vectors, amp_bins, false).unwrap();
    assert_relative_eq!(result.value, manual, max_relative = 1e-12);
    assert_relative_eq!(result.cell_volume, grid.cell_volume());
}

#[test]
fn parallel_and_serial_integration_agree_exactly() {
    let vectors = coupled_vectors(150);
    let densities = fit_densities(&vectors, &KdeConfig::default()).unwrap();
    let serial = integrate(&densities, &vectors, 12, false).unwrap();
    let parallel = integrate(&densities, &vectors, 12, true).unwrap();
    assert_eq!(serial, parallel);
}
