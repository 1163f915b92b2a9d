//! Uncertainty distributions and the mappings that parameterise them.
//!
//! A decision variable or function output may be uncertain: instead of its
//! nominal value, evaluation uses a sample drawn from a distribution whose
//! parameters depend linearly on that nominal value.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rng_util::{f64_range, standard_normal};

/// The family of an uncertainty distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistributionKind {
    /// Uniform on `[low, high]`.
    Uniform,
    /// Gaussian with mean and standard deviation.
    Normal,
    /// Triangular with low, peak and high.
    Triangular,
    /// A point mass.
    Constant,
}

impl DistributionKind {
    /// Number of parameters the family takes.
    #[must_use]
    pub fn n_parameters(self) -> usize {
        match self {
            Self::Uniform | Self::Normal => 2,
            Self::Triangular => 3,
            Self::Constant => 1,
        }
    }
}

/// A univariate probability distribution.
#[derive(Clone, Debug, PartialEq)]
pub enum Distribution {
    /// Uniform on `[low, high]`.
    Uniform {
        /// Lower end.
        low: f64,
        /// Upper end.
        high: f64,
    },
    /// Gaussian.
    Normal {
        /// Mean.
        mean: f64,
        /// Standard deviation.
        std: f64,
    },
    /// Triangular on `[low, high]` with mode `peak`.
    Triangular {
        /// Lower end.
        low: f64,
        /// Mode.
        peak: f64,
        /// Upper end.
        high: f64,
    },
    /// Always the same value.
    Constant(f64),
}

impl Distribution {
    /// Build a distribution of `kind` from its parameter list.
    ///
    /// Returns `None` if the number of parameters does not match the family.
    #[must_use]
    pub fn from_parameters(kind: DistributionKind, params: &[f64]) -> Option<Self> {
        if params.len() != kind.n_parameters() {
            return None;
        }
        let d = match kind {
            DistributionKind::Uniform => {
                let (low, high) = ordered(params[0], params[1]);
                Self::Uniform { low, high }
            }
            DistributionKind::Normal => Self::Normal {
                mean: params[0],
                std: params[1].abs(),
            },
            DistributionKind::Triangular => {
                let mut p = [params[0], params[1], params[2]];
                p.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
                Self::Triangular {
                    low: p[0],
                    peak: p[1],
                    high: p[2],
                }
            }
            DistributionKind::Constant => Self::Constant(params[0]),
        };
        Some(d)
    }

    /// Draw one value.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        match *self {
            Self::Uniform { low, high } => f64_range(rng, low, high),
            Self::Normal { mean, std } => mean + std * standard_normal(rng),
            Self::Triangular { low, peak, high } => {
                let range = high - low;
                if range <= 0.0 {
                    return low;
                }
                let u = rng.f64();
                let split = (peak - low) / range;
                if u < split {
                    low + (u * range * (peak - low)).sqrt()
                } else {
                    high - ((1.0 - u) * range * (high - peak)).sqrt()
                }
            }
            Self::Constant(v) => v,
        }
    }

    /// The expected value.
    #[must_use]
    pub fn mean(&self) -> f64 {
        match *self {
            Self::Uniform { low, high } => 0.5 * (low + high),
            Self::Normal { mean, .. } => mean,
            Self::Triangular { low, peak, high } => (low + peak + high) / 3.0,
            Self::Constant(v) => v,
        }
    }

    /// Probability density at `x`. A point mass reports 0 everywhere.
    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        match *self {
            Self::Uniform { low, high } => {
                if high > low && (low..=high).contains(&x) {
                    1.0 / (high - low)
                } else {
                    0.0
                }
            }
            Self::Normal { mean, std } => {
                if std <= 0.0 {
                    return 0.0;
                }
                let z = (x - mean) / std;
                crate::surrogate::norm_pdf(z) / std
            }
            Self::Triangular { low, peak, high } => {
                if x < low || x > high || high <= low {
                    0.0
                } else if x < peak {
                    2.0 * (x - low) / ((high - low) * (peak - low))
                } else if x > peak {
                    2.0 * (high - x) / ((high - low) * (high - peak))
                } else {
                    2.0 / (high - low)
                }
            }
            Self::Constant(_) => 0.0,
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Maps a nominal value to the parameters of a distribution.
///
/// Parameter `i` is `constants[i] + linear[i] * value`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UncertaintyMapping {
    /// The distribution family.
    pub kind: DistributionKind,
    /// Constant terms, one per distribution parameter.
    pub constants: Vec<f64>,
    /// Linear coefficients, one per distribution parameter.
    pub linear: Vec<f64>,
}

impl UncertaintyMapping {
    /// Create a mapping. Parameter counts are checked by problem processing.
    #[must_use]
    pub fn new(kind: DistributionKind, constants: Vec<f64>, linear: Vec<f64>) -> Self {
        Self {
            kind,
            constants,
            linear,
        }
    }

    /// Whether both coefficient lists match the family's parameter count.
    #[must_use]
    pub fn is_well_defined(&self) -> bool {
        let n = self.kind.n_parameters();
        self.constants.len() == n && self.linear.len() == n
    }

    /// The distribution for a given nominal value.
    #[must_use]
    pub fn distribution(&self, value: f64) -> Option<Distribution> {
        if !self.is_well_defined() {
            return None;
        }
        let params: Vec<f64> = self
            .constants
            .iter()
            .zip(&self.linear)
            .map(|(c, l)| c + l * value)
            .collect();
        Distribution::from_parameters(self.kind, &params)
    }

    /// Sample around `value`, or return `value` when the mapping is ill defined.
    pub fn sample(&self, value: f64, rng: &mut fastrand::Rng) -> f64 {
        self.distribution(value).map_or(value, |d| d.sample(rng))
    }
}
