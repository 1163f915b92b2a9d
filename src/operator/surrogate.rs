//! Surrogate-assisted proposal of new candidates.

use core::any::Any;

use super::{Context, Operator, Ports};
use crate::error::Result;
use crate::normalisation::l2_distance;
use crate::rng_util::{self, standard_normal};
use crate::surrogate::{
    ConstrainedExpectedImprovement, DensityExpectedImprovement, ExpectedImprovement,
    InfillCriterion, OrdinaryKriging, PenalisedExpectedImprovement,
};
use crate::tag::Tag;

/// Where the error term of the expected improvement comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorMethod {
    /// The kriging error estimate.
    ConfidenceInterval,
    /// Sparsity of the training inputs, from a kernel density estimate.
    #[default]
    DensityBased,
}

/// How constraint models enter the infill criterion when the problem has
/// constraints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstraintInfill {
    /// Model the cost only.
    Ignore,
    /// Expected improvement times the probability that every constraint is
    /// met.
    #[default]
    Constrained,
    /// Expected improvement divided by one plus the predicted violation.
    Penalised,
}

/// Inputs closer than this are treated as duplicates.
const DUPLICATE_DISTANCE: f64 = 1e-12;

/// Maximize `criterion` over the unit box.
///
/// Half of the budget goes to uniform samples, the rest to a Gaussian
/// walk around the incumbent whose step grows on success and shrinks on
/// failure. `starts` are scored first.
fn maximise<C: InfillCriterion>(
    criterion: &mut C,
    n_dims: usize,
    budget: usize,
    starts: &[Vec<f64>],
    rng: &mut fastrand::Rng,
) -> (Vec<f64>, f64) {
    let mut best_x = vec![0.5; n_dims];
    let mut best = f64::NEG_INFINITY;
    let consider = |x: Vec<f64>, criterion: &mut C, best_x: &mut Vec<f64>, best: &mut f64| {
        let v = criterion.evaluate(&x);
        if v > *best {
            *best = v;
            *best_x = x;
            true
        } else {
            false
        }
    };

    for x in starts {
        consider(x.clone(), criterion, &mut best_x, &mut best);
    }
    let random = budget / 2;
    for _ in 0..random {
        let x: Vec<f64> = (0..n_dims)
            .map(|_| rng_util::f64_range(rng, 0.0, 1.0))
            .collect();
        consider(x, criterion, &mut best_x, &mut best);
    }

    let mut step = 0.1;
    for _ in random..budget {
        let x: Vec<f64> = best_x
            .iter()
            .map(|&v| (v + step * standard_normal(rng)).clamp(0.0, 1.0))
            .collect();
        if consider(x, criterion, &mut best_x, &mut best) {
            step = (step * 1.5).min(0.5);
        } else {
            step = (step * 0.9).max(1e-4);
        }
    }
    (best_x, best)
}

/// Proposes one new candidate per pass by maximizing the expected
/// improvement of a kriging model of the cost.
///
/// The model is trained on the first input set, with decisions scaled to
/// the unit box and duplicate inputs dropped. The proposal is evaluated
/// immediately (one budget unit), takes the current reference direction as
/// its weights and is appended to the first output set. When no model can
/// be fitted the proposal is drawn uniformly instead.
///
/// On a constrained problem each constraint gets its own kriging model of
/// the violation (value minus threshold) and the criterion follows
/// [`ConstraintInfill`]. Those criteria take the error from the cost model,
/// whatever the [`ErrorMethod`]. If a constraint model cannot be fitted the
/// constraints are left out of that proposal.
#[derive(Clone, Debug)]
pub struct SurrogateBasedOptimizer {
    ports: Ports,
    budget_per_variable: usize,
    error_method: ErrorMethod,
    constraint_infill: ConstraintInfill,
    bandwidth: Option<f64>,
    last_infill: Option<f64>,
}

impl Default for SurrogateBasedOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SurrogateBasedOptimizer {
    /// Density-based expected improvement searched with 100 evaluations per
    /// decision variable.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::Filtration], vec![Tag::MainOptimization]),
            budget_per_variable: 100,
            error_method: ErrorMethod::default(),
            constraint_infill: ConstraintInfill::default(),
            bandwidth: None,
            last_infill: None,
        }
    }

    /// Infill evaluations per decision variable.
    #[must_use]
    pub fn with_budget_per_variable(mut self, n: usize) -> Self {
        self.budget_per_variable = n.max(1);
        self
    }

    /// Error term of the expected improvement.
    #[must_use]
    pub fn with_error_method(mut self, method: ErrorMethod) -> Self {
        self.error_method = method;
        self
    }

    /// Treatment of constraints.
    #[must_use]
    pub fn with_constraint_infill(mut self, infill: ConstraintInfill) -> Self {
        self.constraint_infill = infill;
        self
    }

    /// Kernel width for [`ErrorMethod::DensityBased`], in unit-box units.
    #[must_use]
    pub fn with_bandwidth(mut self, h: f64) -> Self {
        self.bandwidth = Some(h);
        self
    }

    /// Infill value of the last proposal, if a model was fitted.
    #[must_use]
    pub fn last_infill(&self) -> Option<f64> {
        self.last_infill
    }

    /// `violations` holds one column per constraint, aligned with `xx`.
    fn propose(
        &mut self,
        xx: Vec<Vec<f64>>,
        yy: Vec<f64>,
        violations: Vec<Vec<f64>>,
        n_dims: usize,
        rng: &mut fastrand::Rng,
    ) -> Vec<f64> {
        self.last_infill = None;
        let random = |rng: &mut fastrand::Rng| -> Vec<f64> {
            (0..n_dims)
                .map(|_| rng_util::f64_range(rng, 0.0, 1.0))
                .collect()
        };
        if xx.len() < 2 {
            return random(rng);
        }
        let best_start = crate::operator::ascending_order(&yy)
            .first()
            .map(|&i| vec![xx[i].clone()])
            .unwrap_or_default();
        let samples = xx.clone();
        let model = match OrdinaryKriging::fit(xx, yy) {
            Ok(m) => m,
            Err(_e) => {
                trace_debug!(error = %_e, "surrogate fit failed, sampling at random");
                return random(rng);
            }
        };
        let budget = self.budget_per_variable * n_dims;

        if self.constraint_infill != ConstraintInfill::Ignore && !violations.is_empty() {
            let fitted: Result<Vec<OrdinaryKriging>> = violations
                .into_iter()
                .map(|g| OrdinaryKriging::fit(samples.clone(), g))
                .collect();
            match fitted {
                Ok(constraints) => {
                    let (x, value) = if self.constraint_infill == ConstraintInfill::Penalised {
                        let mut pei = PenalisedExpectedImprovement::new(model, constraints);
                        maximise(&mut pei, n_dims, budget, &best_start, rng)
                    } else {
                        let mut cei = ConstrainedExpectedImprovement::new(model, constraints);
                        maximise(&mut cei, n_dims, budget, &best_start, rng)
                    };
                    trace_debug!(
                        infill = value,
                        mode = ?self.constraint_infill,
                        "constrained surrogate proposal"
                    );
                    self.last_infill = Some(value);
                    return x;
                }
                Err(_e) => {
                    trace_debug!(error = %_e, "constraint model fit failed, ignoring constraints");
                }
            }
        }

        let (x, value) = match self.error_method {
            ErrorMethod::ConfidenceInterval => {
                let mut ei = ExpectedImprovement::new(model);
                maximise(&mut ei, n_dims, budget, &best_start, rng)
            }
            ErrorMethod::DensityBased => {
                let mut ei = DensityExpectedImprovement::new(model, samples);
                if let Some(h) = self.bandwidth {
                    ei = ei.with_bandwidth(h);
                }
                maximise(&mut ei, n_dims, budget, &best_start, rng)
            }
        };
        trace_debug!(infill = value, "surrogate proposal");
        self.last_infill = Some(value);
        x
    }
}

impl Operator for SurrogateBasedOptimizer {
    fn name(&self) -> &'static str {
        "Surrogate Based Optimizer"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let bounds = ctx.container.problem().box_constraints();
        let lower = bounds.lower_values();
        let upper = bounds.upper_values();
        let n_dims = lower.len();
        let scale = |x: &[f64]| -> Vec<f64> {
            x.iter()
                .zip(lower.iter().zip(&upper))
                .map(|(v, (lo, hi))| if hi > lo { (v - lo) / (hi - lo) } else { 0.5 })
                .collect()
        };

        let thresholds = ctx.container.problem().thresholds().to_vec();
        let mut xx: Vec<Vec<f64>> = Vec::new();
        let mut yy: Vec<f64> = Vec::new();
        let mut violations: Vec<Vec<f64>> = vec![Vec::new(); thresholds.len()];
        for id in ctx.input_members(0) {
            let c = ctx.container.candidate(id);
            if !c.is_evaluated()
                || !c.cost().is_finite()
                || c.constraints().len() != thresholds.len()
            {
                continue;
            }
            let x = scale(&c.decision_values());
            if xx.iter().any(|seen| l2_distance(seen, &x) < DUPLICATE_DISTANCE) {
                continue;
            }
            xx.push(x);
            yy.push(c.cost());
            let columns = violations.iter_mut().zip(c.constraints()).zip(&thresholds);
            for ((column, value), threshold) in columns {
                column.push(value - threshold);
            }
        }

        let unit = self.propose(xx, yy, violations, n_dims, ctx.rng);
        let x: Vec<f64> = unit
            .iter()
            .zip(lower.iter().zip(&upper))
            .map(|(u, (lo, hi))| lo + u * (hi - lo))
            .collect();

        let id = ctx.container.create_candidate()?;
        let weights = ctx.container.dir_vec().to_vec();
        let c = ctx.container.candidate_mut(id);
        c.define_decisions(&x)?;
        c.define_weights(weights);
        ctx.container.evaluate(id, ctx.rng)?;
        ctx.container.observe(id);
        ctx.container.decrement_budget(1);

        match ctx.outputs().first().copied() {
            Some(main) => {
                if let Some(set) = ctx.container.set_mut(main) {
                    set.append(id);
                }
            }
            None => {
                ctx.append_output_set_with(vec![id]);
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
