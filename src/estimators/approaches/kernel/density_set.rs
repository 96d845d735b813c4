// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::{DensityBackend, KdeConfig};
use crate::error::{LoopTeError, Result};
use crate::estimators::approaches::common_nd::dataset::NdDataset;
use crate::estimators::approaches::kernel::GaussianKde;
use crate::estimators::traits::DensityEstimate;
use crate::estimators::utils::te_slicing::EmbeddedVectors;

/// The four densities entering the transfer entropy integrand.
///
/// The type parameters let any [`DensityEstimate`] implementation stand in for
/// the default Gaussian KDE.
pub struct DensitySet<J = GaussianKde<3>, P = GaussianKde<2>, M = GaussianKde<1>> {
    /// p(x_pred, x_hist, y_hist)
    pub joint: J,
    /// p(x_hist, y_hist)
    pub hist_pair: P,
    /// p(x_pred, x_hist)
    pub pred_pair: P,
    /// p(x_hist)
    pub marginal: M,
    /// Whether the densities prefer one large batch over many small ones.
    pub batched: bool,
}

impl<J, P, M> DensitySet<J, P, M>
where
    J: DensityEstimate<3>,
    P: DensityEstimate<2>,
    M: DensityEstimate<1>,
{
    pub fn new(joint: J, hist_pair: P, pred_pair: P, marginal: M) -> Self {
        Self {
            joint,
            hist_pair,
            pred_pair,
            marginal,
            batched: false,
        }
    }

    pub fn with_batched(mut self, batched: bool) -> Self {
        self.batched = batched;
        self
    }
}

/// Fits the four Gaussian KDEs from the first history row of each variable.
pub fn fit_densities(vectors: &EmbeddedVectors, config: &KdeConfig) -> Result<DensitySet> {
    if vectors.x_hist.nrows() == 0 || vectors.y_hist.nrows() == 0 {
        return Err(LoopTeError::invalid("vectors", "history matrices must have at least one row"));
    }
    let pred = vectors.x_pred.view();
    let x_hist = vectors.x_hist_row();
    let y_hist = vectors.y_hist_row();
    if x_hist.len() != pred.len() || y_hist.len() != pred.len() {
        return Err(LoopTeError::invalid(
            "vectors",
            format!(
                "misaligned embedding: pred {}, x_hist {}, y_hist {}",
                pred.len(),
                x_hist.len(),
                y_hist.len()
            ),
        ));
    }

    let joint = GaussianKde::fit(NdDataset::<3>::points_from_columns([pred, x_hist, y_hist]), config)?;
    let hist_pair = GaussianKde::fit(NdDataset::<2>::points_from_columns([x_hist, y_hist]), config)?;
    let pred_pair = GaussianKde::fit(NdDataset::<2>::points_from_columns([pred, x_hist]), config)?;
    let marginal = GaussianKde::fit(NdDataset::<1>::points_from_columns([x_hist]), config)?;

    let batched = cfg!(feature = "gpu_support") && config.backend == DensityBackend::Gpu;
    Ok(DensitySet::new(joint, hist_pair, pred_pair, marginal).with_batched(batched))
}
