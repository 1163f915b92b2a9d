//! A single solution and its evaluation data.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::problem::Problem;
use crate::types::{Direction, ElementType, Tribool};

/// One decision-space point plus everything later stages derive from it.
///
/// Objective values are stored in minimization form: maximized outputs are
/// negated during [`evaluate`](Self::evaluate).
#[derive(Clone, Debug)]
pub struct Candidate {
    decisions: Vec<Element>,
    inputs: Vec<f64>,
    objectives: Vec<f64>,
    constraints: Vec<f64>,
    unused: Vec<f64>,
    cost: f64,
    weights: Vec<f64>,
    evaluated: bool,
    scalarised: bool,
}

impl Candidate {
    /// A candidate at the centre of the problem's box.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`] unless the problem is fully defined.
    pub fn new(problem: &Problem) -> Result<Self> {
        problem.ensure_fully_defined()?;
        let bounds = problem.box_constraints();
        let decisions = problem
            .decision_types()
            .into_iter()
            .enumerate()
            .map(|(i, ty)| bounds.midpoint(i, ty))
            .collect();
        Ok(Self::with_decisions(decisions))
    }

    /// A candidate uniformly sampled inside the problem's box.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`] unless the problem is fully defined.
    pub fn random(problem: &Problem, rng: &mut fastrand::Rng) -> Result<Self> {
        problem.ensure_fully_defined()?;
        let bounds = problem.box_constraints();
        let decisions = problem
            .decision_types()
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Element::new(ty, bounds.random_value(i, ty, rng)))
            .collect();
        Ok(Self::with_decisions(decisions))
    }

    fn with_decisions(decisions: Vec<Element>) -> Self {
        Self {
            decisions,
            inputs: Vec::new(),
            objectives: Vec::new(),
            constraints: Vec::new(),
            unused: Vec::new(),
            cost: f64::INFINITY,
            weights: Vec::new(),
            evaluated: false,
            scalarised: false,
        }
    }

    /// An already evaluated candidate with the given objective values.
    ///
    /// Used by external tooling that evaluates outside the engine.
    #[must_use]
    pub fn from_values(decisions: Vec<Element>, objectives: Vec<f64>) -> Self {
        let mut c = Self::with_decisions(decisions);
        c.objectives = objectives;
        c.evaluated = true;
        c
    }

    // -----------------------------------------------------------------------
    // Decision vector
    // -----------------------------------------------------------------------

    /// The decision vector.
    #[must_use]
    pub fn decisions(&self) -> &[Element] {
        &self.decisions
    }

    /// The decision vector as plain values.
    #[must_use]
    pub fn decision_values(&self) -> Vec<f64> {
        self.decisions.iter().map(Element::value).collect()
    }

    /// Replace decision variable `i`. Clears the evaluated flag.
    pub fn define_decision(&mut self, i: usize, value: f64) {
        if let Some(e) = self.decisions.get_mut(i) {
            e.define_value(value);
            self.invalidate();
        }
    }

    /// Replace the whole decision vector. Clears the evaluated flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the length differs.
    pub fn define_decisions(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.decisions.len() {
            return Err(Error::DimensionMismatch {
                expected: self.decisions.len(),
                got: values.len(),
            });
        }
        for (e, &v) in self.decisions.iter_mut().zip(values) {
            e.define_value(v);
        }
        self.invalidate();
        Ok(())
    }

    fn invalidate(&mut self) {
        self.evaluated = false;
        self.scalarised = false;
    }

    /// Decision values actually fed to the functions in the last evaluation,
    /// after uncertainty sampling and truncation to the box.
    #[must_use]
    pub fn evaluated_inputs(&self) -> &[f64] {
        &self.inputs
    }

    // -----------------------------------------------------------------------
    // Evaluation data
    // -----------------------------------------------------------------------

    /// Objective values in minimization form.
    #[must_use]
    pub fn objectives(&self) -> &[f64] {
        &self.objectives
    }

    /// Overwrite the objective values.
    pub fn define_objectives(&mut self, objectives: Vec<f64>) {
        self.objectives = objectives;
        self.scalarised = false;
    }

    /// Constraint values.
    #[must_use]
    pub fn constraints(&self) -> &[f64] {
        &self.constraints
    }

    /// Overwrite the constraint values.
    pub fn define_constraints(&mut self, constraints: Vec<f64>) {
        self.constraints = constraints;
    }

    /// Unused output values.
    #[must_use]
    pub fn unused(&self) -> &[f64] {
        &self.unused
    }

    /// Scalar cost assigned by a fitness operator.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Set the scalar cost.
    pub fn define_cost(&mut self, cost: f64) {
        self.cost = cost;
    }

    /// The weighting vector, empty unless assigned.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Assign a weighting vector.
    pub fn define_weights(&mut self, weights: Vec<f64>) {
        self.weights = weights;
        self.scalarised = false;
    }

    /// Whether the objectives reflect the current decision vector.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.evaluated
    }

    /// Mark as evaluated or not.
    pub fn define_evaluated(&mut self, evaluated: bool) {
        self.evaluated = evaluated;
    }

    /// Whether the cost reflects the current weights and objectives.
    #[must_use]
    pub fn is_scalarised(&self) -> bool {
        self.scalarised
    }

    /// Mark the cost as current or stale.
    pub fn define_scalarised(&mut self, scalarised: bool) {
        self.scalarised = scalarised;
    }

    /// Copy decision and evaluation data from `other`, keeping the weights.
    pub fn adopt_solution(&mut self, other: &Self) {
        self.decisions.clone_from(&other.decisions);
        self.inputs.clone_from(&other.inputs);
        self.objectives.clone_from(&other.objectives);
        self.constraints.clone_from(&other.constraints);
        self.unused.clone_from(&other.unused);
        self.evaluated = other.evaluated;
    }

    /// Run every wired function and scatter the outputs.
    ///
    /// Uncertain decision variables are sampled and truncated into the box
    /// before being fed to the functions. Output uncertainty is applied next,
    /// then maximized objectives are negated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`] for a problem that is not fully
    /// defined, or [`Error::DimensionMismatch`] if the decision vector or a
    /// function's output does not have the declared size.
    pub fn evaluate(&mut self, problem: &Problem, rng: &mut fastrand::Rng) -> Result<()> {
        problem.ensure_fully_defined()?;
        if self.decisions.len() != problem.n_decisions() {
            return Err(Error::DimensionMismatch {
                expected: problem.n_decisions(),
                got: self.decisions.len(),
            });
        }

        let bounds = problem.box_constraints();
        let uncertainty = problem.decision_uncertainty();
        let inputs: Vec<f64> = self
            .decisions
            .iter()
            .enumerate()
            .map(|(j, e)| match uncertainty.get(j).and_then(Option::as_ref) {
                Some(mapping) => {
                    let sampled = bounds.clamp(j, mapping.sample(e.value(), rng));
                    if e.element_type() == ElementType::Real {
                        sampled
                    } else {
                        sampled.round()
                    }
                }
                None => e.value(),
            })
            .collect();

        let params = problem.parameter_values();
        let objective_props = problem.objective_properties();
        let mut objectives = vec![0.0; problem.n_objectives()];
        let mut constraints = vec![0.0; problem.n_constraints()];
        let mut unused = vec![0.0; problem.n_unused()];

        for entry in problem.functions() {
            let function = entry.function();
            let map = entry.map();
            let args: Vec<f64> = map
                .decisions
                .iter()
                .zip(&map.parameters)
                .map(|(d, p)| match (d, p) {
                    (Some(d), _) => inputs[*d],
                    (None, Some(p)) => params[*p].value(),
                    (None, None) => 0.0,
                })
                .collect();
            let mut outputs = function.evaluate(&args);
            if outputs.len() != function.n_outputs() {
                return Err(Error::DimensionMismatch {
                    expected: function.n_outputs(),
                    got: outputs.len(),
                });
            }
            for (out, mapping) in outputs.iter_mut().zip(entry.output_uncertainty()) {
                if let Some(mapping) = mapping {
                    *out = mapping.sample(*out, rng);
                }
            }
            for (o, value) in outputs.into_iter().enumerate() {
                if let Some(k) = map.objectives[o] {
                    objectives[k] = match objective_props[k].direction() {
                        Direction::Maximize => -value,
                        Direction::Minimize | Direction::Ignore => value,
                    };
                } else if let Some(k) = map.constraints[o] {
                    constraints[k] = value;
                } else if let Some(k) = map.unused[o] {
                    unused[k] = value;
                }
            }
        }

        self.inputs = inputs;
        self.objectives = objectives;
        self.constraints = constraints;
        self.unused = unused;
        self.evaluated = true;
        self.scalarised = false;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Derived attributes
    // -----------------------------------------------------------------------

    /// Every constraint is within its threshold.
    #[must_use]
    pub fn is_feasible(&self, thresholds: &[f64]) -> bool {
        self.constraints
            .iter()
            .zip(thresholds)
            .all(|(c, t)| c <= t)
    }

    /// Sum of constraint excess over the thresholds.
    #[must_use]
    pub fn constraint_violation(&self, thresholds: &[f64]) -> f64 {
        self.constraints
            .iter()
            .zip(thresholds)
            .map(|(c, t)| (c - t).max(0.0))
            .sum()
    }

    /// Every objective with a goal meets it.
    #[must_use]
    pub fn is_pertinent(&self, goals: &[Option<f64>]) -> bool {
        self.objectives
            .iter()
            .zip(goals)
            .all(|(f, g)| g.is_none_or(|g| *f <= g))
    }

    // -----------------------------------------------------------------------
    // Comparison
    // -----------------------------------------------------------------------

    fn comparable(&self, other: &Self) -> bool {
        self.evaluated
            && other.evaluated
            && !self.objectives.is_empty()
            && self.objectives.len() == other.objectives.len()
    }

    /// Strict dominance: better in every objective.
    ///
    /// A tie in any objective makes the pair incomparable.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn dominates(&self, other: &Self) -> Tribool {
        if !self.comparable(other) {
            return Tribool::Incomparable;
        }
        let mut all_better = true;
        for (a, b) in self.objectives.iter().zip(&other.objectives) {
            if a == b {
                return Tribool::Incomparable;
            }
            if a > b {
                all_better = false;
            }
        }
        Tribool::from(all_better)
    }

    /// Weak dominance: no worse anywhere and better somewhere.
    ///
    /// Identical objective vectors are incomparable.
    #[must_use]
    pub fn weakly_dominates(&self, other: &Self) -> Tribool {
        if !self.comparable(other) {
            return Tribool::Incomparable;
        }
        let mut any_better = false;
        let mut any_worse = false;
        for (a, b) in self.objectives.iter().zip(&other.objectives) {
            if a < b {
                any_better = true;
            } else if a > b {
                any_worse = true;
            }
        }
        if !any_better && !any_worse {
            return Tribool::Incomparable;
        }
        Tribool::from(any_better && !any_worse)
    }

    /// Exact equality of objectives and decisions.
    ///
    /// Two unevaluated candidates compare on decisions only.
    #[must_use]
    pub fn equals(&self, other: &Self) -> Tribool {
        let same_decisions = self.decisions == other.decisions;
        match (self.evaluated, other.evaluated) {
            (false, false) => {
                if self.decisions.len() == other.decisions.len() {
                    Tribool::from(same_decisions)
                } else {
                    Tribool::Incomparable
                }
            }
            (true, true) if self.comparable(other) => {
                Tribool::from(same_decisions && self.objectives == other.objectives)
            }
            _ => Tribool::Incomparable,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::distribution::{DistributionKind, UncertaintyMapping};
    use crate::element::PropertiesFactory;
    use crate::problem::{FnFunction, FunctionMap};

    fn evaluated(objectives: Vec<f64>) -> Candidate {
        Candidate::from_values(vec![Element::real(0.0)], objectives)
    }

    fn mixed_problem() -> Problem {
        let mut p = Problem::new();
        let x = p.append_decision_variable(PropertiesFactory::create("x", ElementType::Real), 0.0, 2.0);
        let f_min = p.append_objective(PropertiesFactory::create("min", ElementType::Real));
        let f_max = p.append_objective(
            PropertiesFactory::builder("max")
                .direction(Direction::Maximize)
                .build(),
        );
        let g = p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 0.5);
        let f = FnFunction::new("f", 1, 3, |x| vec![x[0], x[0] * 10.0, x[0] - 0.5]);
        let map = FunctionMap::new(1, 3)
            .decision(0, x)
            .objective(0, f_min)
            .objective(1, f_max)
            .constraint(2, g);
        p.append_function(Arc::new(f), map);
        p.process();
        p
    }

    #[test]
    fn test_new_requires_fully_defined() {
        let p = Problem::new();
        assert!(matches!(Candidate::new(&p), Err(Error::ProblemNotReady(_))));
    }

    #[test]
    fn test_new_starts_at_midpoint() {
        let p = mixed_problem();
        let c = Candidate::new(&p).unwrap();
        assert_eq!(c.decision_values(), vec![1.0]);
        assert!(!c.is_evaluated());
    }

    #[test]
    fn test_evaluate_negates_maximized_outputs() {
        let p = mixed_problem();
        let mut c = Candidate::new(&p).unwrap();
        let mut rng = fastrand::Rng::with_seed(0);
        c.evaluate(&p, &mut rng).unwrap();
        assert!(c.is_evaluated());
        assert_eq!(c.objectives(), &[1.0, -10.0]);
        assert_eq!(c.constraints(), &[0.5]);
        assert!(c.is_feasible(p.thresholds()));
        c.define_decision(0, 1.5);
        assert!(!c.is_evaluated());
        c.evaluate(&p, &mut rng).unwrap();
        assert!(!c.is_feasible(p.thresholds()));
        assert!((c.constraint_violation(p.thresholds()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_uncertain_input_is_truncated_into_box() {
        let mut p = Problem::new();
        let f = FnFunction::new("sq", 1, 1, |x| vec![x[0] * x[0] + 1.0]);
        p.append_function_auto(Arc::new(f));
        p.define_decision_uncertainty(
            0,
            Some(UncertaintyMapping::new(
                DistributionKind::Uniform,
                vec![100.0, 200.0],
                vec![0.0, 0.0],
            )),
        );
        assert!(p.process() == crate::problem::ProblemStatus::FullyDefined);
        let mut c = Candidate::new(&p).unwrap();
        let mut rng = fastrand::Rng::with_seed(4);
        c.evaluate(&p, &mut rng).unwrap();
        assert!((c.evaluated_inputs()[0] - 1.0).abs() < f64::EPSILON);
        assert!((c.objectives()[0] - 2.0).abs() < f64::EPSILON);
        assert!((c.decision_values()[0] - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dominance_tribool() {
        let a = evaluated(vec![1.0, 1.0]);
        let b = evaluated(vec![2.0, 2.0]);
        let c = evaluated(vec![1.0, 2.0]);
        assert_eq!(a.dominates(&b), Tribool::True);
        assert_eq!(b.dominates(&a), Tribool::False);
        assert_eq!(a.dominates(&c), Tribool::Incomparable);
        assert_eq!(a.weakly_dominates(&c), Tribool::True);
        assert_eq!(c.weakly_dominates(&a), Tribool::False);
        assert_eq!(a.weakly_dominates(&a.clone()), Tribool::Incomparable);
    }

    #[test]
    fn test_unevaluated_or_mismatched_is_incomparable() {
        let a = evaluated(vec![1.0, 1.0]);
        let short = evaluated(vec![0.0]);
        let mut raw = a.clone();
        raw.define_evaluated(false);
        assert_eq!(a.dominates(&short), Tribool::Incomparable);
        assert_eq!(a.weakly_dominates(&raw), Tribool::Incomparable);
        assert_eq!(a.equals(&raw), Tribool::Incomparable);
        assert_eq!(a.equals(&a.clone()), Tribool::True);
    }

    #[test]
    fn test_pertinence() {
        let a = evaluated(vec![1.0, 3.0]);
        assert!(a.is_pertinent(&[Some(2.0), None]));
        assert!(!a.is_pertinent(&[None, Some(2.0)]));
    }
}
