//! Pre-wired operator graphs.
//!
//! Each algorithm is an [`Algorithm`]: a [`Graph`] plus the handle of its
//! last node. One call to [`Algorithm::evaluate`] runs every node once, in
//! chain order; [`Algorithm::run`] repeats that until the container reports
//! termination.
//!
//! | Builder | Algorithm | Evaluations per iteration |
//! |---------|-----------|---------------------------|
//! | [`MoeadBuilder`] | MOEA/D with generalized decomposition | one per subproblem |
//! | [`ParEgoBuilder`] | ParEGO with a kriging surrogate | one |
//! | [`SmsEmoaBuilder`] | steady-state SMS-EMOA | one |
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use evoflow::algorithm::SmsEmoaBuilder;
//! use evoflow::prelude::*;
//!
//! let mut problem = Problem::new();
//! problem.append_function_auto(Arc::new(FnFunction::new("sch", 1, 2, |x| {
//!     vec![x[0] * x[0], (x[0] - 2.0).powi(2)]
//! })));
//! problem.process();
//!
//! let mut sms = SmsEmoaBuilder::new(problem)
//!     .population_size(10)
//!     .budget(60)
//!     .seed(3)
//!     .build()
//!     .unwrap();
//! sms.run().unwrap();
//! assert!(sms.is_terminate());
//! assert!(!sms.pareto_front().is_empty());
//! ```

mod moead;
mod parego;
mod sms_emoa;

pub use self::moead::MoeadBuilder;
pub use self::parego::ParEgoBuilder;
pub use self::sms_emoa::SmsEmoaBuilder;
use crate::container::Container;
use crate::error::{Error, Result};
use crate::operator::{Graph, NodeId};
use crate::pareto::{DominanceMode, non_dominance_sort};
use crate::set::CandidateId;
use crate::tag::Tag;

/// A graph of operators driven as one optimizer.
#[derive(Debug)]
pub struct Algorithm {
    name: &'static str,
    graph: Graph,
    last: NodeId,
}

impl Algorithm {
    /// Wrap `graph`; `last` is the node whose evaluation runs a full
    /// iteration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if `last` is not in `graph`, or
    /// [`Error::UnboundPort`] if the graph does not validate.
    pub fn new(name: &'static str, graph: Graph, last: NodeId) -> Result<Self> {
        if last.index() >= graph.len() {
            return Err(Error::UnknownNode(last.index()));
        }
        graph.validate()?;
        Ok(Self { name, graph, last })
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run one iteration: every node of the chain once.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a node.
    pub fn evaluate(&mut self) -> Result<()> {
        self.graph.evaluate(self.last)
    }

    /// Open the next iteration.
    ///
    /// Candidates that no set or archive entry still references are
    /// released first, so handles kept from earlier iterations are only
    /// valid while a set holds them.
    pub fn advance_iteration(&mut self) {
        self.graph.container_mut().release_unreferenced();
        self.graph.increment_iteration();
    }

    /// The iteration counter.
    #[must_use]
    pub fn current_iteration(&self) -> usize {
        self.graph.current_iteration()
    }

    /// Evaluations left, or `None` when unlimited.
    #[must_use]
    pub fn remaining_budget(&self) -> Option<usize> {
        self.graph.remaining_budget()
    }

    /// Whether the budget or the iteration limit has been reached.
    #[must_use]
    pub fn is_terminate(&self) -> bool {
        self.graph.container().is_terminate()
    }

    /// Iterate until [`is_terminate`](Self::is_terminate).
    ///
    /// An iteration that starts with budget left always completes, so the
    /// final count of evaluations may exceed the budget by up to one
    /// iteration's worth.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a node.
    pub fn run(&mut self) -> Result<()> {
        while !self.is_terminate() {
            self.evaluate()?;
            self.advance_iteration();
        }
        trace_info!(
            algorithm = self.name,
            iterations = self.current_iteration(),
            evaluations = self.graph.container().used_budget(),
            "optimization finished"
        );
        Ok(())
    }

    /// Members of the main set, in order.
    #[must_use]
    pub fn main_set(&self) -> Vec<CandidateId> {
        let c = self.graph.container();
        c.set_with_tag(&Tag::MainOptimization)
            .map(|id| c.members(id))
            .unwrap_or_default()
    }

    /// Evaluated members of the main set that no other member dominates.
    #[must_use]
    pub fn pareto_front(&self) -> Vec<CandidateId> {
        let c = self.graph.container();
        let evaluated: Vec<CandidateId> = self
            .main_set()
            .into_iter()
            .filter(|&id| c.candidate(id).is_evaluated())
            .collect();
        non_dominance_sort(c, &evaluated, DominanceMode::Weak)
            .into_iter()
            .next()
            .unwrap_or_default()
    }

    /// The shared container.
    #[must_use]
    pub fn container(&self) -> &Container {
        self.graph.container()
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Mutable access to the graph, for tuning nodes between iterations.
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Give up the algorithm and keep the container.
    #[must_use]
    pub fn into_container(self) -> Container {
        self.graph.into_container()
    }
}

/// Container for `problem` with the stopping rules applied.
fn prepared_container(
    problem: crate::problem::Problem,
    budget: Option<usize>,
    max_iterations: Option<usize>,
) -> Result<Container> {
    problem.ensure_fully_defined()?;
    if budget.is_none() && max_iterations.is_none() {
        return Err(Error::InvalidParameter {
            name: "budget",
            reason: "a budget or an iteration limit is required".to_string(),
        });
    }
    let mut container = Container::new(problem);
    if let Some(b) = budget {
        container.define_budget(b);
    }
    if let Some(m) = max_iterations {
        container.define_max_iteration(m);
    }
    Ok(container)
}

fn check_population(size: usize, min: usize) -> Result<()> {
    if size < min {
        return Err(Error::InvalidParameter {
            name: "population_size",
            reason: format!("must be at least {min}, got {size}"),
        });
    }
    Ok(())
}
