use core::any::Any;

use super::{Context, Operator, Ports};
use crate::error::Result;
use crate::pareto::{componentwise_max, hypervolume_contributions};
use crate::set::CandidateId;
use crate::tag::Tag;

/// Index of the member to drop from `front`, the one with the smallest
/// hypervolume contribution against the inflated componentwise maximum.
/// Ties go to the first member. A single-member front loses that member.
pub(crate) fn least_contributor(front: &[Vec<f64>]) -> Option<usize> {
    match front.len() {
        0 => None,
        1 => Some(0),
        _ => {
            let reference: Vec<f64> = componentwise_max(front)
                .into_iter()
                .map(|m| m + 0.1 * m.abs())
                .collect();
            let loss = hypervolume_contributions(front, &reference);
            let mut best = 0;
            for (i, &l) in loss.iter().enumerate().skip(1) {
                if l < loss[best] {
                    best = i;
                }
            }
            Some(best)
        }
    }
}

/// Steady-state reduction by hypervolume contribution.
///
/// Concatenates the ranked input fronts into a single output set minus one
/// member of the worst front: the first front whose leading member has the
/// largest cost. The first pass only concatenates, so the population grows
/// to its working size before reduction starts.
#[derive(Clone, Debug)]
pub struct SmsEmoaReduce {
    ports: Ports,
    passes: usize,
}

impl Default for SmsEmoaReduce {
    fn default() -> Self {
        Self::new()
    }
}

impl SmsEmoaReduce {
    /// Reduce the sets ranked for population reduction.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(
                vec![Tag::ForReducePopulation],
                vec![Tag::ForNextIteration, Tag::ForSelection],
            ),
            passes: 0,
        }
    }

    fn worst_front(ctx: &Context<'_>, fronts: &[Vec<CandidateId>]) -> Option<usize> {
        let mut worst: Option<(usize, f64)> = None;
        for (i, front) in fronts.iter().enumerate() {
            let Some(&first) = front.first() else {
                continue;
            };
            let cost = ctx.container.candidate(first).cost();
            if worst.is_none_or(|(_, c)| cost > c) {
                worst = Some((i, cost));
            }
        }
        worst.map(|(i, _)| i)
    }
}

impl Operator for SmsEmoaReduce {
    fn name(&self) -> &'static str {
        "SMS-EMOA Reduce"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.clear_output_sets();
        let fronts: Vec<Vec<CandidateId>> = (0..ctx.inputs().len())
            .map(|i| ctx.input_members(i))
            .collect();
        self.passes += 1;

        let discard = if self.passes == 1 {
            None
        } else {
            Self::worst_front(ctx, &fronts).and_then(|w| {
                let values = ctx.container.objective_vectors(&fronts[w]);
                least_contributor(&values).map(|k| (w, k))
            })
        };

        let mut kept = Vec::with_capacity(fronts.iter().map(Vec::len).sum());
        for (i, front) in fronts.iter().enumerate() {
            for (k, &id) in front.iter().enumerate() {
                if discard != Some((i, k)) {
                    kept.push(id);
                }
            }
        }
        trace_debug!(?discard, "least contributor discarded");
        ctx.append_output_set_with(kept);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
