// SPDX-FileCopyrightText: 2025-2026 Carlson Büth <code@cbueth.de>
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # loopte
//!
//! Kernel transfer entropy for ranking the variables of process control loops
//! by how strongly they drive each other.
//!
//! ## Quick Start
//!
//! ```rust
//! use loopte::estimators::transfer_entropy::transfer_entropy;
//! use ndarray::Array1;
//!
//! // y drives x with a lag of one sample
//! let y = Array1::from_iter((0..120).map(|i| ((i * 37 % 101) as f64 / 101.0).sin()));
//! let x = Array1::from_iter((0..120).map(|i| if i == 0 { 0.0 } else { y[i - 1] + 0.1 * (i as f64).cos() }));
//!
//! let te = transfer_entropy(x.view(), y.view(), 1, 100, 10).unwrap();
//! assert!(te >= 0.0);
//! ```
//!
//! ## Pipeline
//!
//! 1. **Embedding**: both series are cut into aligned prediction and history
//!    vectors ([`estimators::utils::te_slicing`]).
//! 2. **Density estimation**: Gaussian kernel density estimates of the joint,
//!    the two pairwise and the marginal distributions
//!    ([`estimators::approaches::kernel`]).
//! 3. **Integration**: a Riemann sum of the transfer entropy integrand over an
//!    `amp_bins³` amplitude grid, parallelised with rayon.
//!
//! On top of the pairwise estimator, [`network`] builds gain matrices over a
//! loop topology and ranks variables by eigenvector importance, optionally per
//! time window.
//!
//! ## Feature Flags
//!
//! - `gpu_support`: evaluate the kernel sums of the joint density on the GPU
//!   (wgpu compute shader, falls back to the CPU when no adapter is found)
//! - `openblas-static` (default), `openblas-system`, `intel-mkl-static`: LAPACK
//!   backend used by `ndarray-linalg` for the kernel covariance factorisation.
//!   Build with `--no-default-features` to pick another one.

pub mod config;
pub mod error;
pub mod estimators;
pub mod network;

pub use config::{BandwidthRule, DensityBackend, KdeConfig, RankingConfig, TeConfig};
pub use error::{LoopTeError, Result};
pub use estimators::transfer_entropy::{
    KernelTransferEntropy, TeEstimate, TransferEntropy, transfer_entropy,
};
