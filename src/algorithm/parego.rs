//! ParEGO: scalarize along a rotating direction, model the scalar cost with
//! kriging, and evaluate the point of greatest expected improvement.
//!
//! # Graph
//!
//! ```text
//! RandomInit -> Evaluator -> SimplexLatticeDirectionIterator
//!   -> GeneralizedDecomposition (global, augmented Chebyshev)
//!   -> ConstraintPenalty -> DirectionFitnessFiltration
//!   -> SurrogateBasedOptimizer
//! ```
//!
//! Every iteration after the initial design costs exactly one evaluation.

use super::{Algorithm, check_population, prepared_container};
use crate::error::Result;
use crate::operator::{
    ConstraintInfill, ConstraintPenalty, DirectionFitnessFiltration, ErrorMethod, Evaluator,
    GeneralizedDecomposition, Graph, RandomInit, SimplexLatticeDirectionIterator,
    SurrogateBasedOptimizer, WeightScope,
};
use crate::problem::Problem;
use crate::scalarizing::ScalarisingFunction;

/// Builder for a ParEGO [`Algorithm`].
///
/// The initial design defaults to `11 * n - 1` random points for `n`
/// decision variables.
#[derive(Debug)]
pub struct ParEgoBuilder {
    problem: Problem,
    initial_size: Option<usize>,
    reference_set_size: usize,
    max_training_solutions: usize,
    budget_per_variable: usize,
    error_method: ErrorMethod,
    constraint_infill: ConstraintInfill,
    budget: Option<usize>,
    max_iterations: Option<usize>,
    seed: Option<u64>,
}

impl ParEgoBuilder {
    /// Start from a fully defined problem.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            initial_size: None,
            reference_set_size: 11,
            max_training_solutions: 100,
            budget_per_variable: 100,
            error_method: ErrorMethod::default(),
            constraint_infill: ConstraintInfill::default(),
            budget: None,
            max_iterations: None,
            seed: None,
        }
    }

    /// Size of the random initial design.
    #[must_use]
    pub fn initial_size(mut self, size: usize) -> Self {
        self.initial_size = Some(size);
        self
    }

    /// Minimum number of directions per cycle.
    #[must_use]
    pub fn reference_set_size(mut self, size: usize) -> Self {
        self.reference_set_size = size;
        self
    }

    /// Cap on the surrogate's training set.
    #[must_use]
    pub fn max_training_solutions(mut self, n: usize) -> Self {
        self.max_training_solutions = n;
        self
    }

    /// Infill evaluations per decision variable.
    #[must_use]
    pub fn budget_per_variable(mut self, n: usize) -> Self {
        self.budget_per_variable = n;
        self
    }

    /// Error term of the expected improvement.
    #[must_use]
    pub fn error_method(mut self, method: ErrorMethod) -> Self {
        self.error_method = method;
        self
    }

    /// How constraint models shape the infill criterion.
    #[must_use]
    pub fn constraint_infill(mut self, infill: ConstraintInfill) -> Self {
        self.constraint_infill = infill;
        self
    }

    /// Evaluation budget.
    #[must_use]
    pub fn budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Iteration limit.
    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Seed for reproducible runs.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Assemble the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProblemNotReady`](crate::Error::ProblemNotReady) for
    /// an unprocessed problem and
    /// [`Error::InvalidParameter`](crate::Error::InvalidParameter) for an
    /// initial design below 2 points or a run without a stopping rule.
    pub fn build(self) -> Result<Algorithm> {
        let n = self.problem.n_decisions();
        let initial = self
            .initial_size
            .unwrap_or_else(|| (11 * n).saturating_sub(1));
        check_population(initial, 2)?;
        let container = prepared_container(self.problem, self.budget, self.max_iterations)?;
        let mut g = Graph::new(container, self.seed);

        let init = g.add(RandomInit::new(initial), None)?;
        let eval = g.add(Evaluator::new(), Some(init))?;
        let directions = g.add(
            SimplexLatticeDirectionIterator::new().with_reference_set_size(self.reference_set_size),
            Some(eval),
        )?;
        let gd = g.add(
            GeneralizedDecomposition::new()
                .with_scope(WeightScope::Global)
                .with_function(ScalarisingFunction::WeightedChebyshevAugmented),
            Some(directions),
        )?;
        let penalty = g.add(ConstraintPenalty::new(), Some(gd))?;
        let filtration = g.add(
            DirectionFitnessFiltration::new().with_max_solutions(self.max_training_solutions),
            Some(penalty),
        )?;
        let surrogate = g.add(
            SurrogateBasedOptimizer::new()
                .with_error_method(self.error_method)
                .with_constraint_infill(self.constraint_infill)
                .with_budget_per_variable(self.budget_per_variable),
            Some(filtration),
        )?;

        trace_info!(initial, decisions = n, "ParEGO assembled");
        Algorithm::new("ParEGO", g, surrogate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::algorithm::test_support::zdt1;
    use crate::element::PropertiesFactory;
    use crate::problem::{FnFunction, FunctionMap};
    use crate::types::ElementType;

    #[test]
    fn test_one_evaluation_per_iteration() {
        let mut alg = ParEgoBuilder::new(zdt1(2))
            .initial_size(6)
            .budget_per_variable(10)
            .max_iterations(4)
            .seed(9)
            .build()
            .unwrap();
        alg.run().unwrap();
        assert_eq!(alg.main_set().len(), 10);
        assert_eq!(alg.container().used_budget(), 10);
        let c = alg.container();
        for id in alg.main_set() {
            assert!(c.candidate(id).is_evaluated());
        }
    }

    #[test]
    fn test_default_initial_design() {
        let mut alg = ParEgoBuilder::new(zdt1(2))
            .budget_per_variable(5)
            .max_iterations(1)
            .seed(1)
            .build()
            .unwrap();
        alg.evaluate().unwrap();
        // 21 initial points plus one proposal
        assert_eq!(alg.container().used_budget(), 22);
    }

    #[test]
    fn test_training_set_is_capped() {
        let mut alg = ParEgoBuilder::new(zdt1(2))
            .initial_size(12)
            .max_training_solutions(5)
            .budget_per_variable(5)
            .max_iterations(1)
            .seed(3)
            .build()
            .unwrap();
        alg.evaluate().unwrap();
        let c = alg.container();
        let training = c.set_with_tag(&crate::tag::Tag::Filtration).unwrap();
        assert_eq!(c.members(training).len(), 5);
    }

    /// Two objectives on `[0, 1]^2` with `x0 + x1 <= 0.8`.
    fn constrained() -> Problem {
        let mut p = Problem::new();
        for name in ["x0", "x1"] {
            p.append_decision_variable(PropertiesFactory::create(name, ElementType::Real), 0.0, 1.0);
        }
        for name in ["f0", "f1"] {
            p.append_objective(PropertiesFactory::create(name, ElementType::Real));
        }
        p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 0.8);
        let map = FunctionMap::new(2, 3)
            .decision(0, 0)
            .decision(1, 1)
            .objective(0, 0)
            .objective(1, 1)
            .constraint(2, 0);
        p.append_function(
            Arc::new(FnFunction::new("con", 2, 3, |x| {
                vec![1.0 - x[0], 1.0 - x[1], x[0] + x[1]]
            })),
            map,
        );
        p.process();
        p
    }

    #[test]
    fn test_constrained_infill_modes() {
        for infill in [
            ConstraintInfill::Constrained,
            ConstraintInfill::Penalised,
            ConstraintInfill::Ignore,
        ] {
            let mut alg = ParEgoBuilder::new(constrained())
                .initial_size(8)
                .budget_per_variable(20)
                .constraint_infill(infill)
                .max_iterations(4)
                .seed(5)
                .build()
                .unwrap();
            alg.run().unwrap();
            assert_eq!(alg.container().used_budget(), 12, "{infill:?}");
            assert_eq!(alg.main_set().len(), 12, "{infill:?}");
        }
    }
}
