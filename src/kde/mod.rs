//! Kernel density estimation.
//!
//! [`multivariate`] holds the isotropic estimator over decision vectors used
//! by the density-based infill criterion.

pub mod multivariate;

pub use multivariate::{GaussianKde, default_bandwidth, gaussian_kde, gaussian_kde_many};
