//! Operators that create the main population.

use core::any::Any;

use super::{Context, Operator, Ports};
use crate::candidate::Candidate;
use crate::error::Result;
use crate::normalisation::normalise_to_unit_box;
use crate::set::{CandidateId, SetId};
use crate::simplex_lattice::{
    DistanceMeasure, RegularisationApproach, assign_by_centroid, auto_divisions,
    preferred_simplex_lattice, simplex_lattice,
};
use crate::tag::Tag;

fn init_ports() -> Ports {
    Ports::new(Vec::new(), vec![Tag::MainOptimization, Tag::ForEvaluation])
}

fn random_members(ctx: &mut Context<'_>, n: usize) -> Result<Vec<CandidateId>> {
    (0..n)
        .map(|_| ctx.container.create_random_candidate(ctx.rng))
        .collect()
}

// ---------------------------------------------------------------------------
// RandomInit
// ---------------------------------------------------------------------------

/// Creates a main set of uniformly random candidates on its first pass.
///
/// Later passes leave the existing main set alone.
#[derive(Clone, Debug)]
pub struct RandomInit {
    ports: Ports,
    set_size: usize,
}

impl RandomInit {
    /// Create `set_size` random candidates.
    #[must_use]
    pub fn new(set_size: usize) -> Self {
        Self {
            ports: init_ports(),
            set_size,
        }
    }

    /// Number of candidates created.
    #[must_use]
    pub fn set_size(&self) -> usize {
        self.set_size
    }

    /// Change the number of candidates created.
    pub fn define_set_size(&mut self, set_size: usize) {
        self.set_size = set_size;
    }
}

impl Operator for RandomInit {
    fn name(&self) -> &'static str {
        "Random Initialisation"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if !ctx.outputs().is_empty() {
            return Ok(());
        }
        let members = random_members(ctx, self.set_size)?;
        ctx.append_output_set_with(members);
        trace_info!(size = self.set_size, "random population created");
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// UserDefinedInit
// ---------------------------------------------------------------------------

/// Seeds the main set with caller-supplied solutions.
///
/// Decision vectors become fresh unevaluated candidates. Prepared candidates
/// are stored as given; evaluated ones update the reference points. Both
/// queues are consumed on the first pass that finds no main set.
#[derive(Clone, Debug)]
pub struct UserDefinedInit {
    ports: Ports,
    decisions: Vec<Vec<f64>>,
    candidates: Vec<Candidate>,
}

impl Default for UserDefinedInit {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDefinedInit {
    /// An initializer with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: init_ports(),
            decisions: Vec::new(),
            candidates: Vec::new(),
        }
    }

    /// Queue decision vectors.
    #[must_use]
    pub fn with_decisions(mut self, decisions: Vec<Vec<f64>>) -> Self {
        self.decisions.extend(decisions);
        self
    }

    /// Queue prepared candidates.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates.extend(candidates);
        self
    }

    /// Number of queued solutions.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.decisions.len() + self.candidates.len()
    }
}

impl Operator for UserDefinedInit {
    fn name(&self) -> &'static str {
        "User Defined Initialisation"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if !ctx.outputs().is_empty() {
            return Ok(());
        }
        let mut members = Vec::with_capacity(self.pending());
        for values in core::mem::take(&mut self.decisions) {
            let id = ctx.container.create_candidate()?;
            ctx.container.candidate_mut(id).define_decisions(&values)?;
            members.push(id);
        }
        for candidate in core::mem::take(&mut self.candidates) {
            let evaluated = candidate.is_evaluated();
            let id = ctx.container.insert(candidate);
            if evaluated {
                ctx.container.observe(id);
            }
            members.push(id);
        }
        ctx.append_output_set_with(members);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// WeightVectorInit
// ---------------------------------------------------------------------------

/// Gives every member of the main set a simplex-lattice weighting vector.
///
/// The lattice resolution is chosen so that the lattice holds at least as
/// many vectors as the population, unless fixed with
/// [`with_divisions`](Self::with_divisions). The population is then resized
/// to the lattice: surplus members are dropped and missing ones are created
/// at random. Weights are assigned once; the archive is switched on so that
/// the nadir is tracked.
///
/// With [`RegularisationApproach::CentroidBasedOrder`] and an evaluated
/// population, lattice vectors closest to the lattice centroid pick the
/// nearest normalized objective vector first. An unevaluated population is
/// paired in lattice order.
#[derive(Clone, Debug)]
pub struct WeightVectorInit {
    ports: Ports,
    set_size: usize,
    divisions: Option<usize>,
    regularisation: RegularisationApproach,
    measure: DistanceMeasure,
    goal: Option<Vec<f64>>,
    assigned: bool,
}

impl WeightVectorInit {
    /// Create `set_size` random candidates when no main set exists yet.
    #[must_use]
    pub fn new(set_size: usize) -> Self {
        Self {
            ports: init_ports(),
            set_size,
            divisions: None,
            regularisation: RegularisationApproach::default(),
            measure: DistanceMeasure::default(),
            goal: None,
            assigned: false,
        }
    }

    /// Fix the number of lattice divisions.
    #[must_use]
    pub fn with_divisions(mut self, h: usize) -> Self {
        self.divisions = Some(h.max(1));
        self
    }

    /// How lattice vectors are paired with members.
    #[must_use]
    pub fn with_regularisation(mut self, approach: RegularisationApproach) -> Self {
        self.regularisation = approach;
        self
    }

    /// Distance used when pairing by centroid.
    #[must_use]
    pub fn with_distance_measure(mut self, measure: DistanceMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Concentrate the lattice on a normalized preference vector.
    #[must_use]
    pub fn with_goal(mut self, goal: Vec<f64>) -> Self {
        self.goal = Some(goal);
        self
    }

    /// Recompute weights on the next pass.
    pub fn reset(&mut self) {
        self.assigned = false;
    }

    fn assign(&self, ctx: &mut Context<'_>, set: SetId) -> Result<()> {
        let m = ctx.container.problem().n_objectives();
        let n = ctx.container.members(set).len();
        let h = self.divisions.unwrap_or_else(|| auto_divisions(m, n));
        let lattice = match &self.goal {
            Some(goal) => preferred_simplex_lattice(h, m, goal),
            None => simplex_lattice(h, m),
        };

        let target = lattice.len();
        if n > target {
            if let Some(s) = ctx.container.set_mut(set) {
                s.truncate(target);
            }
        } else if n < target {
            let extra = random_members(ctx, target - n)?;
            if let Some(s) = ctx.container.set_mut(set) {
                s.extend(extra);
            }
        }

        let members = ctx.container.members(set);
        let evaluated = members
            .iter()
            .all(|&id| ctx.container.candidate(id).objectives().len() == m);
        let map: Vec<usize> = match self.regularisation {
            RegularisationApproach::CentroidBasedOrder if evaluated => {
                let ideal = ctx.container.ideal().to_vec();
                let anti_ideal = ctx.container.anti_ideal().to_vec();
                let points: Vec<Vec<f64>> = members
                    .iter()
                    .map(|&id| {
                        normalise_to_unit_box(
                            ctx.container.candidate(id).objectives(),
                            &ideal,
                            &anti_ideal,
                        )
                    })
                    .collect();
                assign_by_centroid(&lattice, &points, self.measure)
            }
            _ => (0..members.len()).collect(),
        };
        for (pos, &id) in members.iter().enumerate() {
            if let Some(w) = lattice.get(map[pos]) {
                ctx.container.candidate_mut(id).define_weights(w.clone());
            }
        }
        trace_info!(divisions = h, size = target, "weight vectors assigned");
        Ok(())
    }
}

impl Operator for WeightVectorInit {
    fn name(&self) -> &'static str {
        "Weight Vector Initialisation"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.container.define_keep_archive(true);
        if self.assigned {
            return Ok(());
        }
        if ctx.outputs().is_empty() {
            let members = random_members(ctx, self.set_size)?;
            ctx.append_output_set_with(members);
        }
        for set in ctx.outputs().to_vec() {
            self.assign(ctx, set)?;
        }
        self.assigned = true;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Graph;
    use crate::operator::test_support::container;
    use crate::simplex_lattice::lattice_size;

    #[test]
    fn test_random_init_runs_once() {
        let mut g = Graph::new(container(), Some(3));
        let n = g.add(RandomInit::new(6), None).unwrap();
        g.evaluate(n).unwrap();
        g.increment_iteration();
        g.evaluate(n).unwrap();
        let c = g.container();
        assert_eq!(c.n_sets(), 1);
        let main = c.set_with_tag(&Tag::MainOptimization).unwrap();
        assert_eq!(c.members(main).len(), 6);
        assert!(c.set(main).unwrap().has_tag(&Tag::ForEvaluation));
        for id in c.members(main) {
            assert!(
                c.candidate(id)
                    .decision_values()
                    .iter()
                    .all(|v| (0.0..=1.0).contains(v))
            );
        }
    }

    #[test]
    fn test_user_defined_init() {
        let mut g = Graph::new(container(), None);
        let init = UserDefinedInit::new().with_decisions(vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
        assert_eq!(init.pending(), 2);
        let n = g.add(init, None).unwrap();
        g.evaluate(n).unwrap();
        let c = g.container();
        let main = c.set_with_tag(&Tag::MainOptimization).unwrap();
        let members = c.members(main);
        assert_eq!(c.candidate(members[1]).decision_values(), vec![0.3, 0.4]);
        assert_eq!(g.node_mut::<UserDefinedInit>(n).unwrap().pending(), 0);
    }

    #[test]
    fn test_weight_vectors_resize_population() {
        let mut g = Graph::new(container(), Some(5));
        let n = g
            .add(
                WeightVectorInit::new(7)
                    .with_regularisation(RegularisationApproach::InitialOrder),
                None,
            )
            .unwrap();
        g.evaluate(n).unwrap();
        let c = g.container();
        assert!(c.keeps_archive());
        let main = c.set_with_tag(&Tag::MainOptimization).unwrap();
        let members = c.members(main);
        // smallest lattice for 2 objectives holding 7 vectors has h = 6
        assert_eq!(members.len(), lattice_size(6, 2));
        for id in &members {
            let w = c.candidate(*id).weights();
            assert_eq!(w.len(), 2);
            assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        }
        assert_eq!(c.candidate(members[0]).weights(), &[0.0, 1.0]);
    }
}
