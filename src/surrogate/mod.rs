//! Surrogate models and the infill criteria built on them.
//!
//! - [`kriging`] - power variogram and ordinary kriging with error estimates
//! - [`infill`] - expected improvement and feasibility criteria

pub mod infill;
pub mod kriging;

pub use infill::{
    ConstrainedExpectedImprovement, DensityExpectedImprovement, ExpectedImprovement,
    InfillCriterion, PenalisedExpectedImprovement, ProbabilityOfFeasibility,
};
pub use kriging::{OrdinaryKriging, PowerVariogram};

/// A model that predicts a scalar from a decision vector.
pub trait Interpolator {
    /// Predicted value at `x`.
    fn value(&mut self, x: &[f64]) -> f64;

    /// Error estimate at `x`.
    ///
    /// Only meaningful after [`value`](Interpolator::value) has been called
    /// with the same `x`.
    fn error(&self, x: &[f64]) -> f64;

    /// Training inputs.
    fn inputs(&self) -> &[Vec<f64>];

    /// Training outputs.
    fn outputs(&self) -> &[f64];
}

// ---------------------------------------------------------------------------
// Normal distribution helpers (Abramowitz-Stegun approximation)
// ---------------------------------------------------------------------------

/// Standard normal PDF.
#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
    INV_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Standard normal CDF.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    if x < -8.0 {
        return 0.0;
    }
    if x > 8.0 {
        return 1.0;
    }

    let abs_x = x.abs();
    let t = 1.0 / (1.0 + 0.231_641_9 * abs_x);
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;
    let t5 = t4 * t;

    let poly = 0.319_381_530 * t - 0.356_563_782 * t2 + 1.781_477_937 * t3 - 1.821_255_978 * t4
        + 1.330_274_429 * t5;
    let cdf = 1.0 - norm_pdf(abs_x) * poly;

    if x >= 0.0 { cdf } else { 1.0 - cdf }
}
