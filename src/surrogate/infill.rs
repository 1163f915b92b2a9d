//! Infill criteria: how promising an unseen decision vector is under a
//! surrogate model. Larger is better for every criterion.

use core::f64::consts::PI;

use super::{Interpolator, norm_cdf, norm_pdf};
use crate::kde::{default_bandwidth, gaussian_kde};

/// Scores a decision vector; larger is more promising.
pub trait InfillCriterion {
    /// Score `x`.
    fn evaluate(&mut self, x: &[f64]) -> f64;
}

/// `diff * Phi(diff/err) + err * phi(diff/err)`, or 0 without error.
fn improvement(diff: f64, err: f64) -> f64 {
    if err > 0.0 {
        let z = diff / err;
        diff * norm_cdf(z) + err * norm_pdf(z)
    } else {
        0.0
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

// ---------------------------------------------------------------------------
// Expected improvement
// ---------------------------------------------------------------------------

/// Expected improvement over the best (smallest) training output, using
/// the model's own error estimate.
#[derive(Clone, Debug)]
pub struct ExpectedImprovement<M> {
    model: M,
    best: f64,
}

impl<M: Interpolator> ExpectedImprovement<M> {
    /// Wrap `model`.
    #[must_use]
    pub fn new(model: M) -> Self {
        let (best, _) = min_max(model.outputs());
        Self { model, best }
    }

    /// Smallest training output.
    #[must_use]
    pub fn best(&self) -> f64 {
        self.best
    }

    /// The wrapped model.
    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }
}

impl<M: Interpolator> InfillCriterion for ExpectedImprovement<M> {
    fn evaluate(&mut self, x: &[f64]) -> f64 {
        let val = self.model.value(x);
        let err = self.model.error(x);
        improvement(self.best - val, err)
    }
}

/// Expected improvement whose error comes from the sample density instead
/// of the model.
///
/// `err = atan(1 / density) / pi * 2 * (worst - best)`, so sparse regions
/// get errors close to the output range and dense ones close to 0.
#[derive(Clone, Debug)]
pub struct DensityExpectedImprovement<M> {
    model: M,
    samples: Vec<Vec<f64>>,
    bandwidth: f64,
    best: f64,
    worst: f64,
}

impl<M: Interpolator> DensityExpectedImprovement<M> {
    /// Wrap `model` with the density of `samples` at the default bandwidth.
    #[must_use]
    pub fn new(model: M, samples: Vec<Vec<f64>>) -> Self {
        let (best, worst) = min_max(model.outputs());
        let bandwidth = default_bandwidth(&samples);
        Self {
            model,
            samples,
            bandwidth,
            best,
            worst,
        }
    }

    /// Override the bandwidth. Non-positive values are ignored.
    #[must_use]
    pub fn with_bandwidth(mut self, h: f64) -> Self {
        if h > 0.0 {
            self.bandwidth = h;
        }
        self
    }

    /// Kernel width.
    #[must_use]
    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Density-derived error at `x`.
    #[must_use]
    pub fn error(&self, x: &[f64]) -> f64 {
        let density = gaussian_kde(&self.samples, x, self.bandwidth);
        (1.0 / density).atan() / PI * 2.0 * (self.worst - self.best)
    }
}

impl<M: Interpolator> InfillCriterion for DensityExpectedImprovement<M> {
    fn evaluate(&mut self, x: &[f64]) -> f64 {
        let val = self.model.value(x);
        improvement(self.best - val, self.error(x))
    }
}

// ---------------------------------------------------------------------------
// Feasibility
// ---------------------------------------------------------------------------

/// Probability that a constraint model predicts no violation.
///
/// The model is trained on violation amounts (positive means violated), so
/// the score is `Phi(-value / error)`.
#[derive(Clone, Debug)]
pub struct ProbabilityOfFeasibility<M> {
    model: M,
}

impl<M: Interpolator> ProbabilityOfFeasibility<M> {
    /// Wrap a violation model.
    #[must_use]
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Predicted violation at `x`.
    pub fn violation(&mut self, x: &[f64]) -> f64 {
        self.model.value(x)
    }
}

impl<M: Interpolator> InfillCriterion for ProbabilityOfFeasibility<M> {
    fn evaluate(&mut self, x: &[f64]) -> f64 {
        let val = self.model.value(x);
        let err = self.model.error(x);
        if err > 0.0 { norm_cdf(-(val / err)) } else { 0.0 }
    }
}

/// Expected improvement times the probability of meeting every constraint.
#[derive(Clone, Debug)]
pub struct ConstrainedExpectedImprovement<M> {
    objective: ExpectedImprovement<M>,
    constraints: Vec<ProbabilityOfFeasibility<M>>,
}

impl<M: Interpolator> ConstrainedExpectedImprovement<M> {
    /// Combine an objective model with one violation model per constraint.
    #[must_use]
    pub fn new(objective: M, constraints: Vec<M>) -> Self {
        Self {
            objective: ExpectedImprovement::new(objective),
            constraints: constraints
                .into_iter()
                .map(ProbabilityOfFeasibility::new)
                .collect(),
        }
    }
}

impl<M: Interpolator> InfillCriterion for ConstrainedExpectedImprovement<M> {
    fn evaluate(&mut self, x: &[f64]) -> f64 {
        let ei = self.objective.evaluate(x);
        self.constraints
            .iter_mut()
            .fold(ei, |acc, pf| acc * pf.evaluate(x))
    }
}

/// Expected improvement divided by one plus the total predicted violation.
#[derive(Clone, Debug)]
pub struct PenalisedExpectedImprovement<M> {
    objective: ExpectedImprovement<M>,
    constraints: Vec<ProbabilityOfFeasibility<M>>,
}

impl<M: Interpolator> PenalisedExpectedImprovement<M> {
    /// Combine an objective model with one violation model per constraint.
    #[must_use]
    pub fn new(objective: M, constraints: Vec<M>) -> Self {
        Self {
            objective: ExpectedImprovement::new(objective),
            constraints: constraints
                .into_iter()
                .map(ProbabilityOfFeasibility::new)
                .collect(),
        }
    }
}

impl<M: Interpolator> InfillCriterion for PenalisedExpectedImprovement<M> {
    fn evaluate(&mut self, x: &[f64]) -> f64 {
        let ei = self.objective.evaluate(x);
        let violation: f64 = self
            .constraints
            .iter_mut()
            .map(|c| c.violation(x).max(0.0))
            .sum();
        ei / (1.0 + violation)
    }
}
