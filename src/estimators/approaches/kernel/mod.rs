mod kernel_estimator; // gaussian kde
pub mod density_set;
pub mod grid;
pub mod integrand;

pub use density_set::{DensitySet, fit_densities};
pub use grid::{AmplitudeGrid, Diagnostics, GridIntegral, integrate};
pub use integrand::{DENSITY_FLOOR, Integrand, integrand_from_densities, te_integrand};
pub use kernel_estimator::*; // re-export GaussianKde, cholesky_lower

// Include the GPU implementations when the gpu_support feature flag is enabled
#[cfg(feature = "gpu_support")]
pub mod kernel_gpu;
