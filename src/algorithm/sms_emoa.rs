//! Steady-state SMS-EMOA.
//!
//! Each iteration ranks the population into non-dominated fronts, removes
//! the member of the worst front that contributes least hypervolume, and
//! breeds one child by binary tournament, SBX and polynomial mutation. The
//! child joins the population and is evaluated at the start of the next
//! iteration.
//!
//! # Graph
//!
//! ```text
//! RandomInit -> Evaluator -> NonDominanceRanking -> SmsEmoaReduce
//!   -> TournamentFiltrationForDirection -> SbxCrossover
//!   -> TruncateSets(1) -> PolynomialMutation -> MergeForNextIteration
//! ```

use super::{Algorithm, check_population, prepared_container};
use crate::error::Result;
use crate::operator::{
    Evaluator, Graph, MergeForNextIteration, NonDominanceRanking, Operator, PolynomialMutation,
    RandomInit, SbxCrossover, SelectionMethod, SmsEmoaReduce, TournamentFiltrationForDirection,
    TruncateSets,
};
use crate::problem::Problem;
use crate::tag::Tag;

/// Builder for an SMS-EMOA [`Algorithm`].
#[derive(Debug)]
pub struct SmsEmoaBuilder {
    problem: Problem,
    population_size: usize,
    crossover_eta: f64,
    mutation_eta: f64,
    constraint_handling: bool,
    budget: Option<usize>,
    max_iterations: Option<usize>,
    seed: Option<u64>,
}

impl SmsEmoaBuilder {
    /// Start from a fully defined problem.
    #[must_use]
    pub fn new(problem: Problem) -> Self {
        Self {
            problem,
            population_size: 100,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            constraint_handling: true,
            budget: None,
            max_iterations: None,
            seed: None,
        }
    }

    /// Population kept after each reduction.
    #[must_use]
    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = size;
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

    /// Rank infeasible members behind feasible ones.
    #[must_use]
    pub fn constraint_handling(mut self, on: bool) -> Self {
        self.constraint_handling = on;
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

        let init = g.add(RandomInit::new(self.population_size), None)?;
        let eval = g.add(Evaluator::new(), Some(init))?;

        let mut ranking =
            NonDominanceRanking::new().with_constraint_handling(self.constraint_handling);
        ranking
            .ports_mut()
            .define_outputs(vec![Tag::ForReducePopulation]);
        let ranking = g.add(ranking, Some(eval))?;

        let reduce = g.add(SmsEmoaReduce::new(), Some(ranking))?;

        let mut tournament = TournamentFiltrationForDirection::new()
            .with_mappings_per_set(2)
            .with_number_of_mappings(2)
            .with_selection_method(SelectionMethod::Shuffled);
        for tag in [Tag::ForPerturbation, Tag::ForNextIteration, Tag::ForResize] {
            tournament.ports_mut().add_additional_output(tag);
        }
        let tournament = g.add(tournament, Some(reduce))?;

        let sbx = g.add(
            SbxCrossover::new()
                .with_eta(self.crossover_eta)
                .with_solution_probability(1.0),
            Some(tournament),
        )?;
        let truncate = g.add(TruncateSets::new(1), Some(sbx))?;
        let mutation = g.add(
            PolynomialMutation::new()
                .with_eta(self.mutation_eta)
                .with_inverse_dimension_probability(),
            Some(truncate),
        )?;
        let merge = g.add(MergeForNextIteration::new(), Some(mutation))?;

        trace_info!(population = self.population_size, "SMS-EMOA assembled");
        Algorithm::new("SMS-EMOA", g, merge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::test_support::zdt1;

    #[test]
    fn test_steady_state_population() {
        let mut alg = SmsEmoaBuilder::new(zdt1(3))
            .population_size(8)
            .max_iterations(5)
            .seed(6)
            .build()
            .unwrap();
        alg.run().unwrap();
        // reduced population plus the child awaiting evaluation
        assert_eq!(alg.main_set().len(), 9);
        assert_eq!(alg.container().used_budget(), 8 + 4);
        let c = alg.container();
        let unevaluated = alg
            .main_set()
            .into_iter()
            .filter(|&id| !c.candidate(id).is_evaluated())
            .count();
        assert_eq!(unevaluated, 1);
    }

    #[test]
    fn test_budget_stops_run() {
        let mut alg = SmsEmoaBuilder::new(zdt1(2))
            .population_size(6)
            .budget(10)
            .seed(2)
            .build()
            .unwrap();
        alg.run().unwrap();
        assert!(alg.is_terminate());
        assert_eq!(alg.remaining_budget(), Some(0));
    }
}
