//! Ordinary kriging with a power variogram.
//!
//! The variogram is `gamma(h) = nugget + beta * h^eta` for `h > 0` and 0 at
//! the origin. `eta` is fitted from a binned empirical variogram of the
//! normalized training data, `beta` by least squares on the raw data.

use nalgebra::{DMatrix, DVector};

use super::Interpolator;
use crate::error::{Error, Result};
use crate::normalisation::l2_distance;

/// Lower and upper margin keeping `eta` inside the open interval (0, 2).
const ETA_TOLERANCE: f64 = 1e-4;

/// Exponent used when the data cannot determine one.
const DEFAULT_ETA: f64 = 1.0;

/// Smallest accepted ratio between the extreme diagonal entries of R.
const SINGULAR_RATIO: f64 = 1e-13;

/// Power-law variogram fitted to a training set.
#[derive(Clone, Debug)]
pub struct PowerVariogram {
    inputs: Vec<Vec<f64>>,
    outputs: Vec<f64>,
    eta: f64,
    beta: f64,
    nugget: f64,
}

impl PowerVariogram {
    /// Fit `eta` and `beta` to `(inputs, outputs)` with zero nugget.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptySamples` for an empty training set and
    /// `Error::DimensionMismatch` when the two slices differ in length or
    /// the inputs disagree in dimension.
    pub fn fit(inputs: Vec<Vec<f64>>, outputs: Vec<f64>) -> Result<Self> {
        Self::check(&inputs, &outputs)?;
        let mut v = Self {
            inputs,
            outputs,
            eta: DEFAULT_ETA,
            beta: 1.0,
            nugget: 0.0,
        };
        v.eta = v.fit_eta();
        v.update_beta();
        Ok(v)
    }

    /// Use a fixed `eta` in (0, 2) and a nugget of `nugget^2`; `beta` is
    /// still fitted. An `eta` outside the interval is fitted instead.
    ///
    /// # Errors
    ///
    /// As [`PowerVariogram::fit`].
    pub fn with_eta(inputs: Vec<Vec<f64>>, outputs: Vec<f64>, eta: f64, nugget: f64) -> Result<Self> {
        Self::check(&inputs, &outputs)?;
        let mut v = Self {
            inputs,
            outputs,
            eta: DEFAULT_ETA,
            beta: 1.0,
            nugget: nugget * nugget,
        };
        v.eta = if eta > 0.0 && eta < 2.0 { eta } else { v.fit_eta() };
        v.update_beta();
        Ok(v)
    }

    fn check(inputs: &[Vec<f64>], outputs: &[f64]) -> Result<()> {
        let Some(first) = inputs.first() else {
            return Err(Error::EmptySamples);
        };
        if inputs.len() != outputs.len() {
            return Err(Error::DimensionMismatch {
                expected: inputs.len(),
                got: outputs.len(),
            });
        }
        if let Some(bad) = inputs.iter().find(|x| x.len() != first.len()) {
            return Err(Error::DimensionMismatch {
                expected: first.len(),
                got: bad.len(),
            });
        }
        Ok(())
    }

    /// Variogram value at distance `h`.
    #[must_use]
    pub fn value(&self, h: f64) -> f64 {
        if h > 0.0 {
            self.nugget + self.beta * h.powf(self.eta)
        } else {
            0.0
        }
    }

    /// Fitted exponent.
    #[must_use]
    pub fn eta(&self) -> f64 {
        self.eta
    }

    /// Fitted scale.
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Nugget (already squared).
    #[must_use]
    pub fn nugget(&self) -> f64 {
        self.nugget
    }

    /// Training inputs.
    #[must_use]
    pub fn inputs(&self) -> &[Vec<f64>] {
        &self.inputs
    }

    /// Training outputs.
    #[must_use]
    pub fn outputs(&self) -> &[f64] {
        &self.outputs
    }

    /// Pairwise distances and absolute output differences.
    fn pairs(&self) -> (Vec<f64>, Vec<f64>) {
        let n = self.inputs.len();
        let mut dist = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        let mut dz = Vec::with_capacity(dist.capacity());
        for i in 0..n {
            for j in i + 1..n {
                dist.push(l2_distance(&self.inputs[i], &self.inputs[j]));
                dz.push((self.outputs[i] - self.outputs[j]).abs());
            }
        }
        (dist, dz)
    }

    fn fit_eta(&self) -> f64 {
        let (mut dist, mut dz) = self.pairs();
        if dist.is_empty() {
            return DEFAULT_ETA;
        }
        scale_to_unit_max(&mut dist);
        scale_to_unit_max(&mut dz);

        let (lags, gammas) = empirical_variogram(&dist, &dz);
        let (hth, htv) = lags
            .iter()
            .zip(&gammas)
            .filter(|&(&l, &g)| l > 0.0 && g > 0.0)
            .fold((0.0, 0.0), |(hth, htv), (l, g)| {
                (hth + l.ln() * l.ln(), htv + l.ln() * g.ln())
            });
        if hth <= 0.0 {
            return DEFAULT_ETA;
        }
        (htv / hth).clamp(ETA_TOLERANCE, 2.0 - ETA_TOLERANCE)
    }

    fn update_beta(&mut self) {
        let n = self.inputs.len();
        let mut num = 0.0;
        let mut denom = 0.0;
        for i in 0..n {
            for j in i + 1..n {
                let rb = l2_distance(&self.inputs[i], &self.inputs[j]).powf(self.eta);
                num += rb * (0.5 * (self.outputs[i] - self.outputs[j]).powi(2) - self.nugget);
                denom += rb * rb;
            }
        }
        let beta = num / denom;
        // flat or single-point data
        self.beta = if beta.is_finite() && beta > 0.0 { beta } else { 1.0 };
    }
}

fn scale_to_unit_max(v: &mut [f64]) {
    let max = v.iter().copied().fold(0.0, f64::max);
    if max < 1e-16 {
        v.iter_mut().for_each(|x| *x = 0.0);
    } else {
        v.iter_mut().for_each(|x| *x /= max);
    }
}

/// Binned empirical variogram.
///
/// Pairs are sorted by distance and grouped into bins of `floor(n/3)` pairs
/// (or `floor(8 log10 n)` from 20 pairs on); the last bin takes the
/// remainder. Each bin yields its mid lag and the mean squared difference.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn empirical_variogram(dist: &[f64], dz: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = dist.len();
    let per_bin = if n < 20 {
        (n / 3).max(1)
    } else {
        ((8.0 * (n as f64).log10()).floor() as usize).max(1)
    };
    let bins = (n / per_bin).max(1);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        dist[a]
            .partial_cmp(&dist[b])
            .unwrap_or(core::cmp::Ordering::Equal)
    });

    let mut lags = Vec::with_capacity(bins);
    let mut gammas = Vec::with_capacity(bins);
    let mut upper = dist[order[0]];
    for b in 0..bins {
        let lower = upper;
        let (start, end) = if b == bins - 1 {
            (b * per_bin, n)
        } else {
            (b * per_bin, (b + 1) * per_bin)
        };
        upper = dist[order[end - 1]];
        let gamma = order[start..end].iter().map(|&k| dz[k] * dz[k]).sum::<f64>()
            / (end - start) as f64;
        lags.push(0.5 * (lower + upper));
        gammas.push(gamma);
    }
    (lags, gammas)
}

// ---------------------------------------------------------------------------
// Ordinary kriging
// ---------------------------------------------------------------------------

/// A single prediction with its error components.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Prediction {
    /// Interpolated value.
    pub value: f64,
    /// Spread of the training outputs around the estimate, weighted.
    pub local_std: f64,
    /// Kriging standard deviation.
    pub kriging_std: f64,
}

impl Prediction {
    /// `sqrt(local * kriging)`.
    #[must_use]
    pub fn combined_std(&self) -> f64 {
        (self.local_std * self.kriging_std).sqrt()
    }
}

/// Ordinary kriging interpolator.
///
/// Solves the bordered variogram system with a column-pivoted QR
/// factorization computed once at construction.
#[derive(Clone, Debug)]
pub struct OrdinaryKriging {
    variogram: PowerVariogram,
    factor: nalgebra::linalg::ColPivQR<f64, nalgebra::Dyn, nalgebra::Dyn>,
    last: Option<(Vec<f64>, Prediction)>,
}

impl OrdinaryKriging {
    /// Build the interpolator. `measurement_errors`, when not empty, holds a
    /// standard deviation per training point subtracted (squared) from the
    /// diagonal.
    ///
    /// # Errors
    ///
    /// Returns `Error::DimensionMismatch` if `measurement_errors` has the
    /// wrong length and `Error::SingularSystem` if the system cannot be
    /// factorized, which happens with duplicated training inputs.
    pub fn new(variogram: PowerVariogram, measurement_errors: &[f64]) -> Result<Self> {
        let n = variogram.inputs.len();
        if !measurement_errors.is_empty() && measurement_errors.len() != n {
            return Err(Error::DimensionMismatch {
                expected: n,
                got: measurement_errors.len(),
            });
        }
        let x = &variogram.inputs;
        let mut v = DMatrix::<f64>::zeros(n + 1, n + 1);
        for i in 0..n {
            for j in i..n {
                let g = variogram.value(l2_distance(&x[i], &x[j]));
                v[(i, j)] = g;
                v[(j, i)] = g;
            }
            v[(i, n)] = 1.0;
            v[(n, i)] = 1.0;
            if let Some(e) = measurement_errors.get(i) {
                v[(i, i)] -= e * e;
            }
        }

        let factor = v.col_piv_qr();
        let (lo, hi) = factor
            .r()
            .diagonal()
            .iter()
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), d| (lo.min(d.abs()), hi.max(d.abs())));
        if !factor.is_invertible() || lo <= hi * SINGULAR_RATIO {
            return Err(Error::SingularSystem);
        }
        Ok(Self {
            variogram,
            factor,
            last: None,
        })
    }

    /// Fit a [`PowerVariogram`] and build the interpolator on it.
    ///
    /// # Errors
    ///
    /// Any error from [`PowerVariogram::fit`] or [`OrdinaryKriging::new`].
    pub fn fit(inputs: Vec<Vec<f64>>, outputs: Vec<f64>) -> Result<Self> {
        Self::new(PowerVariogram::fit(inputs, outputs)?, &[])
    }

    /// The underlying variogram.
    #[must_use]
    pub fn variogram(&self) -> &PowerVariogram {
        &self.variogram
    }

    /// Predict at `x` without touching the cache.
    #[must_use]
    pub fn predict(&self, x: &[f64]) -> Prediction {
        let inputs = &self.variogram.inputs;
        let outputs = &self.variogram.outputs;
        let n = inputs.len();
        let v_star = DVector::from_fn(n + 1, |i, _| {
            if i < n {
                self.variogram.value(l2_distance(&inputs[i], x))
            } else {
                1.0
            }
        });
        let Some(w) = self.factor.solve(&v_star) else {
            #[allow(clippy::cast_precision_loss)]
            let mean = outputs.iter().sum::<f64>() / n as f64;
            return Prediction {
                value: mean,
                ..Prediction::default()
            };
        };

        let value: f64 = (0..n).map(|i| w[i] * outputs[i]).sum();
        let local_std = (0..n)
            .map(|i| w[i] * w[i] * (outputs[i] - value).powi(2))
            .sum::<f64>()
            .sqrt();
        let kriging_var: f64 = (0..n).map(|i| w[i] * v_star[i]).sum::<f64>() + w[n];
        Prediction {
            value,
            local_std,
            kriging_std: kriging_var.abs().sqrt(),
        }
    }

    /// The prediction cached by the last [`Interpolator::value`] call.
    #[must_use]
    pub fn last_prediction(&self) -> Option<Prediction> {
        self.last.as_ref().map(|(_, p)| *p)
    }
}

impl Interpolator for OrdinaryKriging {
    fn value(&mut self, x: &[f64]) -> f64 {
        let p = self.predict(x);
        self.last = Some((x.to_vec(), p));
        p.value
    }

    fn error(&self, x: &[f64]) -> f64 {
        match &self.last {
            Some((cached, p)) if cached.as_slice() == x => p.combined_std(),
            _ => self.predict(x).combined_std(),
        }
    }

    fn inputs(&self) -> &[Vec<f64>] {
        &self.variogram.inputs
    }

    fn outputs(&self) -> &[f64] {
        &self.variogram.outputs
    }
}
