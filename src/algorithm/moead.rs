//! MOEA/D with generalized decomposition.
//!
//! Every member of the population owns a weighting vector from a simplex
//! lattice and is scored by the generalized decomposition of that vector.
//! Each iteration breeds one child per member from two parents drawn from
//! the member's neighbourhood (or, with a small probability, from the whole
//! population). The child is evaluated at the start of the next iteration
//! and replaces the neighbours it beats.
//!
//! # Graph
//!
//! ```text
//! WeightVectorInit -> Evaluator -> GeneralizedDecomposition (local)
//!   -> NeighbourhoodFiltration -> MoeadNeighbourhoodUpdate
//!   -> RandSetReplacement -> RandFiltrationForDirection
//!   -> SbxCrossover -> TruncateSets(1) -> PolynomialMutation
//! ```
//!
//! # Configuration
//!
//! | Parameter | Builder method | Default |
//! |-----------|---------------|---------|
//! | Population size | [`population_size`](MoeadBuilder::population_size) | 100, rounded up to the lattice |
//! | Neighbourhood size | [`neighbourhood_size`](MoeadBuilder::neighbourhood_size) | 5 |
//! | Replacements per child | [`max_replacements`](MoeadBuilder::max_replacements) | 2 |
//! | Whole-population mating | [`replacement_probability`](MoeadBuilder::replacement_probability) | 0.1 |
//! | Scalarizing function | [`function`](MoeadBuilder::function) | weighted Chebyshev |
//! | SBX distribution index | [`crossover_eta`](MoeadBuilder::crossover_eta) | 15.0 |
//! | Mutation distribution index | [`mutation_eta`](MoeadBuilder::mutation_eta) | 20.0 |
//! | Random seed | [`seed`](MoeadBuilder::seed) | random |

use super::{Algorithm, check_population, prepared_container};
use crate::error::Result;
use crate::operator::{
    Evaluator, GeneralizedDecomposition, Graph, MoeadNeighbourhoodUpdate, NeighbourhoodCriterion,
    NeighbourhoodFiltration, Operator, PolynomialMutation, RandFiltrationForDirection,
    RandSetReplacement, SbxCrossover, TruncateSets, WeightScope, WeightVectorInit,
};
use crate::problem::Problem;
use crate::scalarizing::ScalarisingFunction;
use crate::simplex_lattice::{DistanceMeasure, RegularisationApproach};
use crate::tag::Tag;

/// Builder for a MOEA/D [`Algorithm`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use evoflow::algorithm::MoeadBuilder;
/// use evoflow::prelude::*;
///
/// let mut problem = Problem::new();
/// problem.append_function_auto(Arc::new(FnFunction::new("lin", 2, 2, |x| {
///     vec![x[0], 1.0 - x[0] + x[1]]
/// })));
/// problem.process();
///
/// let mut moead = MoeadBuilder::new(problem)
///     .population_size(6)
///     .max_iterations(4)
///     .seed(1)
///     .build()
///     .unwrap();
/// moead.run().unwrap();
/// assert_eq!(moead.main_set().len(), 6);
/// ```
#[derive(Debug)]
pub struct MoeadBuilder {
    problem: Problem,
    population_size: usize,
    neighbourhood_size: usize,
    max_replacements: usize,
    replacement_probability: f64,
    function: ScalarisingFunction,
    crossover_eta: f64,
    mutation_eta: f64,
    budget: Option<usize>,
    max_iterations: Option<usize>,
    seed: Option<u64>,
}

impl MoeadBuilder {
    /// Start from a fully defined problem.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            population_size: 100,
            neighbourhood_size: 5,
            max_replacements: 2,
            replacement_probability: 0.1,
            function: ScalarisingFunction::WeightedChebyshev,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            budget: None,
            max_iterations: None,
            seed: None,
        }
    }

    /// Minimum population; the lattice may round it up.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Neighbours per subproblem, excluding itself.
    #[must_use]
    pub fn neighbourhood_size(mut self, size: usize) -> Self {
        self.neighbourhood_size = size;
        self
    }

    /// Neighbours a single child may replace.
    #[must_use]
    pub fn max_replacements(mut self, n: usize) -> Self {
        self.max_replacements = n;
        self
    }

    /// Probability of mating within the whole population instead of the
    /// neighbourhood.
    #[must_use]
    pub fn replacement_probability(mut self, p: f64) -> Self {
        self.replacement_probability = p;
        self
    }

    /// Scalarizing function of the decomposition.
    #[must_use]
    pub fn function(mut self, function: ScalarisingFunction) -> Self {
        self.function = function;
        self
    }

    /// SBX distribution index.
    #[must_use]
    pub fn crossover_eta(mut self, eta: f64) -> Self {
        self.crossover_eta = eta;
        self
    }

    /// Polynomial mutation distribution index.
    #[must_use]
    pub fn mutation_eta(mut self, eta: f64) -> Self {
        self.mutation_eta = eta;
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
    /// [`Error::InvalidParameter`](crate::Error::InvalidParameter) for a
    /// population below 2 or a run without a stopping rule.
    pub fn build(self) -> Result<Algorithm> {
        check_population(self.population_size, 2)?;
        let container = prepared_container(self.problem, self.budget, self.max_iterations)?;
        let mut g = Graph::new(container, self.seed);

        let mut init = WeightVectorInit::new(self.population_size)
            .with_regularisation(RegularisationApproach::CentroidBasedOrder)
            .with_distance_measure(DistanceMeasure::Angle);
        init.ports_mut().add_additional_output(Tag::ForNeighbourhoods);
        let init = g.add(init, None)?;

        let eval = g.add(Evaluator::new(), Some(init))?;

        let gd = GeneralizedDecomposition::new()
            .with_scope(WeightScope::Local)
            .with_function(self.function);
        let gd = g.add(gd, Some(eval))?;

        let mut neighbourhoods = NeighbourhoodFiltration::new()
            .with_criterion(NeighbourhoodCriterion::Size(self.neighbourhood_size))
            .with_distance_measure(DistanceMeasure::Euclidean)
            .with_clear_outputs(false);
        neighbourhoods
            .ports_mut()
            .add_additional_output(Tag::ForSetReplacement);
        let neighbourhoods = g.add(neighbourhoods, Some(gd))?;

        let update = MoeadNeighbourhoodUpdate::new()
            .with_function(self.function)
            .with_generalised_decomposition(true)
            .with_max_replacements(self.max_replacements);
        let update = g.add(update, Some(neighbourhoods))?;

        let replacement =
            RandSetReplacement::new().with_probability(self.replacement_probability);
        let replacement = g.add(replacement, Some(update))?;

        let mut parents = RandFiltrationForDirection::new().with_input_set_size(2);
        for tag in [
            Tag::ForPerturbation,
            Tag::ForResize,
            Tag::ForEvaluation,
            Tag::ForMoeadUpdate,
        ] {
            parents.ports_mut().add_additional_output(tag);
        }
        let parents = g.add(parents, Some(replacement))?;

        let sbx = g.add(SbxCrossover::new().with_eta(self.crossover_eta), Some(parents))?;
        let truncate = g.add(TruncateSets::new(1), Some(sbx))?;
        let mutation = g.add(
            PolynomialMutation::new().with_eta(self.mutation_eta),
            Some(truncate),
        )?;

        trace_info!(
            population = self.population_size,
            neighbourhood = self.neighbourhood_size,
            "MOEA/D assembled"
        );
        Algorithm::new("MOEA/D", g, mutation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::test_support::zdt1;
    use crate::simplex_lattice::lattice_size;

    #[test]
    fn test_population_is_rounded_to_lattice() {
        let mut alg = MoeadBuilder::new(zdt1(4))
            .population_size(7)
            .max_iterations(1)
            .seed(2)
            .build()
            .unwrap();
        alg.run().unwrap();
        assert_eq!(alg.main_set().len(), lattice_size(6, 2));
        assert_eq!(alg.container().used_budget(), lattice_size(6, 2));
    }

    #[test]
    fn test_children_evaluated_next_iteration() {
        let mut alg = MoeadBuilder::new(zdt1(4))
            .population_size(10)
            .max_iterations(3)
            .seed(4)
            .build()
            .unwrap();
        alg.run().unwrap();
        let n = alg.main_set().len();
        // one population and two generations of children
        assert_eq!(alg.container().used_budget(), 3 * n);
        let c = alg.container();
        for id in alg.main_set() {
            let cand = c.candidate(id);
            assert!(cand.is_evaluated());
            assert!(cand.cost().is_finite());
            assert!((cand.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_invalid_population() {
        let r = MoeadBuilder::new(zdt1(2)).population_size(1).budget(10).build();
        assert!(r.is_err());
    }
}
