use core::any::Any;

use super::{Context, Operator, Ports};
use crate::error::Result;
use crate::tag::Tag;

/// Evaluates every unevaluated member of the sets tagged for evaluation.
///
/// Each evaluation costs one unit of budget as soon as it returns, so a
/// failure part way through still accounts for the completed ones. Results
/// are folded into the ideal,
/// anti-ideal and archive. In single-objective mode the first objective
/// also becomes the cost.
#[derive(Clone, Debug)]
pub struct Evaluator {
    ports: Ports,
    single_objective: bool,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Evaluate sets tagged [`Tag::ForEvaluation`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::ForEvaluation]),
            single_objective: false,
        }
    }

    /// Copy the first objective into the cost after evaluation.
    #[must_use]
    pub fn with_single_objective(mut self, single: bool) -> Self {
        self.single_objective = single;
        self
    }
}

impl Operator for Evaluator {
    fn name(&self) -> &'static str {
        "Evaluator"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let mut count = 0;
        for set in ctx.outputs().to_vec() {
            for id in ctx.container.members(set) {
                if ctx.container.candidate(id).is_evaluated() {
                    continue;
                }
                ctx.container.evaluate(id, ctx.rng)?;
                ctx.container.decrement_budget(1);
                if self.single_objective
                    && let Some(&f) = ctx.container.candidate(id).objectives().first()
                {
                    ctx.container.candidate_mut(id).define_cost(f);
                }
                ctx.container.observe(id);
                count += 1;
            }
        }
        if count > 0 {
            trace_debug!(count, "candidates evaluated");
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
