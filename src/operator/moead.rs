use core::any::Any;

use super::{Context, Operator, Ports};
use crate::error::Result;
use crate::normalisation::normalise_to_unit_box;
use crate::rng_util::permutation;
use crate::scalarizing::{ScalarisingFunction, gd_weights};
use crate::tag::Tag;

/// Lets each offspring replace members of the neighbourhood it was bred in.
///
/// Input set `i` holds one evaluated child; output set `i` is the matching
/// neighbourhood. The child is scored with each neighbour's weighting vector
/// (in random order) and replaces every neighbour it beats, up to
/// `max_replacements`. Replaced neighbours keep their weights and are
/// marked scalarised.
#[derive(Clone, Debug)]
pub struct MoeadNeighbourhoodUpdate {
    ports: Ports,
    function: ScalarisingFunction,
    generalised_decomposition: bool,
    max_replacements: usize,
}

impl Default for MoeadNeighbourhoodUpdate {
    fn default() -> Self {
        Self::new()
    }
}

impl MoeadNeighbourhoodUpdate {
    /// Chebyshev scores, two replacements per child.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForMoeadUpdate], vec![Tag::ForSelection]),
            function: ScalarisingFunction::WeightedChebyshev,
            generalised_decomposition: false,
            max_replacements: 2,
        }
    }

    /// Scalarizing function used to score the child.
    #[must_use]
    pub fn with_function(mut self, function: ScalarisingFunction) -> Self {
        self.function = function;
        self
    }

    /// Treat weighting vectors as directions, as
    /// [`GeneralizedDecomposition`](super::GeneralizedDecomposition) does.
    #[must_use]
    pub fn with_generalised_decomposition(mut self, on: bool) -> Self {
        self.generalised_decomposition = on;
        self
    }

    /// Maximum neighbours a single child may replace.
    #[must_use]
    pub fn with_max_replacements(mut self, n: usize) -> Self {
        self.max_replacements = n.max(1);
        self
    }

    /// Change the scalarizing function.
    pub fn define_function(&mut self, function: ScalarisingFunction) {
        self.function = function;
    }
}

impl Operator for MoeadNeighbourhoodUpdate {
    fn name(&self) -> &'static str {
        "MOEA/D Neighbourhood Update"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let ideal = ctx.container.ideal().to_vec();
        let anti_ideal = ctx.container.anti_ideal().to_vec();
        let pairs = ctx.inputs().len().min(ctx.outputs().len());

        for i in 0..pairs {
            let Some(&child_id) = ctx.input_members(i).first() else {
                continue;
            };
            let child = ctx.container.candidate(child_id).clone();
            if !child.is_evaluated() {
                continue;
            }
            let f = normalise_to_unit_box(child.objectives(), &ideal, &anti_ideal);
            let neighbours = ctx.output_members(i);

            let mut replaced = 0;
            for k in permutation(ctx.rng, neighbours.len()) {
                let id = neighbours[k];
                let current = ctx.container.candidate(id);
                let weights = if self.generalised_decomposition {
                    gd_weights(current.weights())
                } else {
                    current.weights().to_vec()
                };
                let cost = self.function.apply(&weights, &f);
                if cost < current.cost() {
                    let current = ctx.container.candidate_mut(id);
                    current.adopt_solution(&child);
                    current.define_cost(cost);
                    current.define_scalarised(true);
                    ctx.container.observe(id);
                    replaced += 1;
                    if replaced >= self.max_replacements {
                        break;
                    }
                }
            }
            trace_debug!(neighbourhood = i, replaced, "neighbourhood updated");
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
