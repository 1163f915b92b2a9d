//! Isotropic Gaussian kernel density over decision vectors.

use crate::error::{Error, Result};
use crate::normalisation::l2_distance;

/// Bandwidth used when the samples do not determine one.
pub const FALLBACK_BANDWIDTH: f64 = 0.01;

/// Density at `query` of an isotropic Gaussian kernel of width `h` placed
/// on every sample.
///
/// `f(q) = (1/n) sum_i exp(-|x_i - q|^2 / 2h^2) / (2 pi h^2)^(d/2)`.
/// Returns 0 for an empty sample set.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn gaussian_kde(samples: &[Vec<f64>], query: &[f64], h: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let d = query.len() as f64;
    let two_h2 = 2.0 * h * h;
    let sum: f64 = samples
        .iter()
        .map(|x| {
            let dist = l2_distance(x, query);
            (-dist * dist / two_h2).exp()
        })
        .sum();
    sum / (two_h2 * core::f64::consts::PI).powf(d / 2.0) / samples.len() as f64
}

/// [`gaussian_kde`] at every query point.
#[must_use]
pub fn gaussian_kde_many(samples: &[Vec<f64>], queries: &[Vec<f64>], h: f64) -> Vec<f64> {
    queries.iter().map(|q| gaussian_kde(samples, q, h)).collect()
}

/// One hundredth of the mean per-dimension range of `samples`.
///
/// Falls back to [`FALLBACK_BANDWIDTH`] when there are no samples or every
/// range is zero.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn default_bandwidth(samples: &[Vec<f64>]) -> f64 {
    let Some(first) = samples.first() else {
        return FALLBACK_BANDWIDTH;
    };
    let d = first.len();
    if d == 0 {
        return FALLBACK_BANDWIDTH;
    }
    let total: f64 = (0..d)
        .map(|j| {
            let (lo, hi) = samples
                .iter()
                .filter_map(|s| s.get(j))
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            hi - lo
        })
        .sum();
    let h = total / d as f64 / 100.0;
    if h > 0.0 { h } else { FALLBACK_BANDWIDTH }
}

/// Samples plus a fixed bandwidth, checked once up front.
#[derive(Clone, Debug)]
pub struct GaussianKde {
    samples: Vec<Vec<f64>>,
    bandwidth: f64,
}

impl GaussianKde {
    /// Estimator using [`default_bandwidth`].
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples` if `samples` is empty and
    /// `Error::DimensionMismatch` if sample lengths differ.
    pub fn new(samples: Vec<Vec<f64>>) -> Result<Self> {
        let bandwidth = default_bandwidth(&samples);
        Self::with_bandwidth(samples, bandwidth)
    }

    /// Estimator with an explicit bandwidth.
    ///
    /// # Errors
    ///
    /// As [`GaussianKde::new`], plus `Error::InvalidBandwidth` for a
    /// non-positive bandwidth.
    pub fn with_bandwidth(samples: Vec<Vec<f64>>, bandwidth: f64) -> Result<Self> {
        let Some(first) = samples.first() else {
            return Err(Error::EmptySamples);
        };
        let d = first.len();
        if let Some(bad) = samples.iter().find(|s| s.len() != d) {
            return Err(Error::DimensionMismatch {
                expected: d,
                got: bad.len(),
            });
        }
        if bandwidth <= 0.0 {
            return Err(Error::InvalidBandwidth(bandwidth));
        }
        Ok(Self { samples, bandwidth })
    }

    /// Density at `query`.
    #[must_use]
    pub fn pdf(&self, query: &[f64]) -> f64 {
        gaussian_kde(&self.samples, query, self.bandwidth)
    }

    /// Kernel width.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}
