//! Operators that select, group and resize candidate sets.

use core::any::Any;

use super::{Context, Operator, Ports, ascending_order, happens};
use crate::error::Result;
use crate::normalisation::{
    l2_distance, normalise_to_unit_box, normalised_distance, to_unit_vec,
};
use crate::rng_util::permutation;
use crate::set::CandidateId;
use crate::simplex_lattice::DistanceMeasure;
use crate::tag::Tag;

// ---------------------------------------------------------------------------
// Random filtration
// ---------------------------------------------------------------------------

/// Groups random copies of input members into sets for a direction operator.
///
/// For each input set a random permutation of at most `input_set_size`
/// members is copied into consecutive output sets of `output_set_size`.
#[derive(Clone, Debug)]
pub struct RandFiltrationForDirection {
    ports: Ports,
    input_set_size: usize,
    output_set_size: usize,
}

impl Default for RandFiltrationForDirection {
    fn default() -> Self {
        Self::new()
    }
}

impl RandFiltrationForDirection {
    /// Pairs drawn from whole input sets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForSelection], vec![Tag::ForDirection]),
            input_set_size: 0,
            output_set_size: 2,
        }
    }

    /// Draw at most `n` members per input set. Zero draws all of them.
    #[must_use]
    pub fn with_input_set_size(mut self, n: usize) -> Self {
        self.input_set_size = n;
        self
    }

    /// Members per output set.
    #[must_use]
    pub fn with_output_set_size(mut self, n: usize) -> Self {
        self.output_set_size = n.max(1);
        self
    }
}

impl Operator for RandFiltrationForDirection {
    fn name(&self) -> &'static str {
        "Random Filtration For Direction"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.clear_output_sets();
        for i in 0..ctx.inputs().len() {
            let members = ctx.input_members(i);
            let take = if self.input_set_size == 0 {
                members.len()
            } else {
                self.input_set_size.min(members.len())
            };
            let order = permutation(ctx.rng, members.len());
            for chunk in order[..take].chunks(self.output_set_size) {
                let set = ctx.append_output_set();
                for &k in chunk {
                    ctx.clone_into(members[k], set);
                }
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Tournament filtration
// ---------------------------------------------------------------------------

/// How tournament contestants are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SelectionMethod {
    /// Two members drawn with replacement.
    Random,
    /// Consecutive pairs of a random permutation, refreshed when exhausted.
    Shuffled,
    /// Consecutive pairs in set order.
    #[default]
    Ordered,
}

/// Fills output sets with the winners of binary tournaments on cost.
///
/// Contestants come from the union of the input sets. The lower cost wins;
/// ties go to the second contestant. Winners are copied, `mappings_per_set`
/// per output set, until `number_of_mappings` (or the population size when
/// unset) have been produced.
#[derive(Clone, Debug)]
pub struct TournamentFiltrationForDirection {
    ports: Ports,
    mappings_per_set: usize,
    number_of_mappings: Option<usize>,
    method: SelectionMethod,
}

impl Default for TournamentFiltrationForDirection {
    fn default() -> Self {
        Self::new()
    }
}

impl TournamentFiltrationForDirection {
    /// Pairs of winners, as many as the population, in order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForSelection], vec![Tag::ForDirection]),
            mappings_per_set: 2,
            number_of_mappings: None,
            method: SelectionMethod::default(),
        }
    }

    /// Winners per output set. Zero is ignored.
    #[must_use]
    pub fn with_mappings_per_set(mut self, n: usize) -> Self {
        if n > 0 {
            self.mappings_per_set = n;
        }
        self
    }

    /// Total winners per pass.
    #[must_use]
    pub fn with_number_of_mappings(mut self, n: usize) -> Self {
        self.number_of_mappings = Some(n);
        self
    }

    /// How contestants are drawn.
    #[must_use]
    pub fn with_selection_method(mut self, method: SelectionMethod) -> Self {
        self.method = method;
        self
    }
}

impl Operator for TournamentFiltrationForDirection {
    fn name(&self) -> &'static str {
        "Tournament Filtration For Direction"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.clear_output_sets();
        let pool = ctx.input_union();
        let pop = pool.len();
        if pop == 0 {
            return Ok(());
        }
        let total = self.number_of_mappings.unwrap_or(pop);
        let cost = |ctx: &Context<'_>, k: usize| ctx.container.candidate(pool[k]).cost();

        let mut order: Vec<usize> = match self.method {
            SelectionMethod::Shuffled => permutation(ctx.rng, pop),
            _ => (0..pop).collect(),
        };
        let mut cursor = 0;
        let mut produced = 0;
        while produced < total {
            let set = ctx.append_output_set();
            for _ in 0..self.mappings_per_set {
                let (a, b) = match self.method {
                    SelectionMethod::Random => (ctx.rng.usize(..pop), ctx.rng.usize(..pop)),
                    SelectionMethod::Shuffled | SelectionMethod::Ordered => {
                        let a = order[cursor];
                        let b = if cursor + 1 < pop { order[cursor + 1] } else { a };
                        cursor += 2;
                        if cursor >= pop {
                            cursor = 0;
                            if self.method == SelectionMethod::Shuffled {
                                order = permutation(ctx.rng, pop);
                            }
                        }
                        (a, b)
                    }
                };
                let winner = if cost(ctx, a) < cost(ctx, b) { a } else { b };
                ctx.clone_into(pool[winner], set);
                produced += 1;
                if produced >= total {
                    break;
                }
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Neighbourhoods
// ---------------------------------------------------------------------------

/// What makes two members neighbours.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NeighbourhoodCriterion {
    /// Normalized decision-space distance below `r * sqrt(n_decisions)`.
    Radius(f64),
    /// The `k` members with the closest weighting vectors.
    Size(usize),
}

impl Default for NeighbourhoodCriterion {
    fn default() -> Self {
        Self::Radius(0.1)
    }
}

/// Builds one neighbourhood set per member of the first input set.
///
/// Output set `i` holds member `i` followed by its neighbours. The sets are
/// built once and kept on later passes unless output clearing is on.
#[derive(Clone, Debug)]
pub struct NeighbourhoodFiltration {
    ports: Ports,
    criterion: NeighbourhoodCriterion,
    measure: DistanceMeasure,
    max_solutions: usize,
    clear_outputs: bool,
}

impl Default for NeighbourhoodFiltration {
    fn default() -> Self {
        Self::new()
    }
}

impl NeighbourhoodFiltration {
    /// Radius neighbourhoods with Euclidean distance, rebuilt every pass.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForNeighbourhoods], vec![Tag::Neighbourhoods]),
            criterion: NeighbourhoodCriterion::default(),
            measure: DistanceMeasure::Euclidean,
            max_solutions: 0,
            clear_outputs: true,
        }
    }

    /// Neighbour criterion.
    #[must_use]
    pub fn with_criterion(mut self, criterion: NeighbourhoodCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Distance measure. Radius neighbourhoods support Euclidean and
    /// Manhattan; angle falls back to Euclidean there.
    #[must_use]
    pub fn with_distance_measure(mut self, measure: DistanceMeasure) -> Self {
        self.measure = measure;
        self
    }

    /// Build neighbourhoods only for the first `n` members. Zero means all.
    #[must_use]
    pub fn with_max_solutions(mut self, n: usize) -> Self {
        self.max_solutions = n;
        self
    }

    /// Rebuild the neighbourhoods on every pass.
    #[must_use]
    pub fn with_clear_outputs(mut self, clear: bool) -> Self {
        self.clear_outputs = clear;
        self
    }

    fn by_radius(&self, ctx: &Context<'_>, members: &[CandidateId], r: f64) -> Vec<Vec<usize>> {
        let problem = ctx.container.problem();
        let bounds = problem.box_constraints();
        let types = problem.decision_types();
        let p = if self.measure == DistanceMeasure::Manhattan {
            1.0
        } else {
            2.0
        };
        #[allow(clippy::cast_precision_loss)]
        let limit = r * (problem.n_decisions() as f64).sqrt();
        let x: Vec<Vec<f64>> = members
            .iter()
            .map(|&id| ctx.container.candidate(id).decision_values())
            .collect();

        let mut neighbours = vec![Vec::new(); members.len()];
        for i in 0..members.len() {
            for h in (i + 1)..members.len() {
                let d = normalised_distance(&x[i], &x[h], bounds, &types, p);
                if (0.0..limit).contains(&d) {
                    neighbours[i].push(h);
                    neighbours[h].push(i);
                }
            }
        }
        neighbours
    }

    fn by_size(&self, ctx: &Context<'_>, members: &[CandidateId], k: usize) -> Vec<Vec<usize>> {
        let weights: Vec<&[f64]> = members
            .iter()
            .map(|&id| ctx.container.candidate(id).weights())
            .collect();
        weights
            .iter()
            .map(|wi| {
                let dist: Vec<f64> = weights
                    .iter()
                    .map(|wj| self.measure.distance(wi, wj))
                    .collect();
                let order = ascending_order(&dist);
                let end = (k + 1).min(order.len());
                order.get(1..end).map(<[usize]>::to_vec).unwrap_or_default()
            })
            .collect()
    }
}

impl Operator for NeighbourhoodFiltration {
    fn name(&self) -> &'static str {
        "Neighbourhood Filtration"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if self.clear_outputs {
            ctx.clear_output_sets();
        }
        if !ctx.outputs().is_empty() {
            return Ok(());
        }
        let members = ctx.input_members(0);
        let neighbours = match self.criterion {
            NeighbourhoodCriterion::Radius(r) => self.by_radius(ctx, &members, r),
            NeighbourhoodCriterion::Size(k) => self.by_size(ctx, &members, k),
        };
        let n_sets = if self.max_solutions > 0 {
            self.max_solutions.min(members.len())
        } else {
            members.len()
        };
        for (i, near) in neighbours.iter().enumerate().take(n_sets) {
            let mut set = Vec::with_capacity(near.len() + 1);
            set.push(members[i]);
            set.extend(near.iter().map(|&k| members[k]));
            ctx.append_output_set_with(set);
        }
        trace_debug!(sets = n_sets, "neighbourhoods built");
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Replaces each input set by the whole replacement set with a fixed
/// probability.
///
/// Output sets reference the same candidates as their source; nothing is
/// copied. Without a replacement set the inputs pass through unchanged.
#[derive(Clone, Debug)]
pub struct RandSetReplacement {
    ports: Ports,
    probability: f64,
    replacement_tags: Vec<Tag>,
}

impl Default for RandSetReplacement {
    fn default() -> Self {
        Self::new()
    }
}

impl RandSetReplacement {
    /// Replace neighbourhoods by the main set one time in ten.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForSetReplacement], vec![Tag::ForSelection]),
            probability: 0.1,
            replacement_tags: vec![Tag::MainOptimization],
        }
    }

    /// Replacement probability, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_probability(mut self, p: f64) -> Self {
        self.probability = p.clamp(0.0, 1.0);
        self
    }

    /// Tags identifying the replacement set.
    #[must_use]
    pub fn with_replacement_tags(mut self, tags: Vec<Tag>) -> Self {
        self.replacement_tags = tags;
        self
    }
}

impl Operator for RandSetReplacement {
    fn name(&self) -> &'static str {
        "Random Set Replacement"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.clear_output_sets();
        let replacement = ctx
            .container
            .sets_with_tags(&self.replacement_tags)
            .first()
            .map(|&id| ctx.container.members(id));
        for i in 0..ctx.inputs().len() {
            let members = match &replacement {
                Some(r) if happens(ctx.rng, self.probability) => r.clone(),
                _ => ctx.input_members(i),
            };
            ctx.append_output_set_with(members);
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Resizing
// ---------------------------------------------------------------------------

/// Keeps the first `n` members of every output set.
#[derive(Clone, Debug)]
pub struct TruncateSets {
    ports: Ports,
    set_size: usize,
}

impl TruncateSets {
    /// Truncate sets tagged [`Tag::ForResize`] to `set_size`.
    #[must_use]
    pub fn new(set_size: usize) -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::ForResize]),
            set_size,
        }
    }

    /// Target size.
    #[must_use]
    pub fn set_size(&self) -> usize {
        self.set_size
    }
}

impl Operator for TruncateSets {
    fn name(&self) -> &'static str {
        "Truncate Sets"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        for id in ctx.outputs().to_vec() {
            if let Some(set) = ctx.container.set_mut(id) {
                set.truncate(self.set_size);
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Makes the main set the concatenation of every set marked for the next
/// iteration.
#[derive(Clone, Debug)]
pub struct MergeForNextIteration {
    ports: Ports,
}

impl Default for MergeForNextIteration {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeForNextIteration {
    /// Merge [`Tag::ForNextIteration`] sets into the main set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::ForNextIteration], vec![Tag::MainOptimization]),
        }
    }
}

impl Operator for MergeForNextIteration {
    fn name(&self) -> &'static str {
        "Merge For Next Iteration"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let merged = ctx.input_union();
        match ctx.outputs().first().copied() {
            Some(main) => {
                if let Some(set) = ctx.container.set_mut(main) {
                    set.define(merged);
                }
            }
            None => {
                ctx.append_output_set_with(merged);
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Direction fitness
// ---------------------------------------------------------------------------

/// Selects a training set for a surrogate: the better half by cost plus the
/// members whose normalized objectives point closest to the reference
/// direction.
#[derive(Clone, Debug)]
pub struct DirectionFitnessFiltration {
    ports: Ports,
    max_solutions: usize,
}

impl Default for DirectionFitnessFiltration {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectionFitnessFiltration {
    /// Keep every member of the main set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::MainOptimization], vec![Tag::Filtration]),
            max_solutions: 0,
        }
    }

    /// Keep at most `n` members. Zero keeps all.
    #[must_use]
    pub fn with_max_solutions(mut self, n: usize) -> Self {
        self.max_solutions = n;
        self
    }

    /// Change the member cap.
    pub fn define_max_solutions(&mut self, n: usize) {
        self.max_solutions = n;
    }

    /// Current member cap.
    #[must_use]
    pub fn max_solutions(&self) -> usize {
        self.max_solutions
    }

    fn select(&self, ctx: &Context<'_>, members: &[CandidateId]) -> Vec<CandidateId> {
        let max = self.max_solutions;
        if max == 0 || max >= members.len() {
            return members.to_vec();
        }
        let costs: Vec<f64> = members
            .iter()
            .map(|&id| ctx.container.candidate(id).cost())
            .collect();
        let by_cost = ascending_order(&costs);
        let half = max.div_ceil(2);
        let mut chosen: Vec<CandidateId> = by_cost[..half].iter().map(|&i| members[i]).collect();

        let rest: Vec<CandidateId> = by_cost[half..].iter().map(|&i| members[i]).collect();
        let ideal = ctx.container.ideal();
        let anti_ideal = ctx.container.anti_ideal();
        let dir = ctx.container.dir_vec();
        let distances: Vec<f64> = rest
            .iter()
            .map(|&id| {
                let mut v =
                    normalise_to_unit_box(ctx.container.candidate(id).objectives(), ideal, anti_ideal);
                to_unit_vec(&mut v, 1.0);
                l2_distance(&v, dir)
            })
            .collect();
        chosen.extend(
            ascending_order(&distances)
                .into_iter()
                .take(max - half)
                .map(|i| rest[i]),
        );
        chosen
    }
}

impl Operator for DirectionFitnessFiltration {
    fn name(&self) -> &'static str {
        "Direction Fitness Filtration"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let members = ctx.input_members(0);
        let chosen = self.select(ctx, &members);
        match ctx.outputs().first().copied() {
            Some(out) => {
                if let Some(set) = ctx.container.set_mut(out) {
                    set.define(chosen);
                }
            }
            None => {
                ctx.append_output_set_with(chosen);
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::Candidate;
    use crate::container::Container;
    use crate::element::Element;
    use crate::operator::test_support::container;

    fn add(c: &mut Container, x: [f64; 2], f: [f64; 2], cost: f64) -> CandidateId {
        let mut cand = Candidate::from_values(
            vec![Element::real(x[0]), Element::real(x[1])],
            f.to_vec(),
        );
        cand.define_cost(cost);
        let id = c.insert(cand);
        c.observe(id);
        id
    }

    fn run<O: Operator>(op: &mut O, c: &mut Container, seed: u64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut ctx = Context::resolve(c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
    }

    fn population(c: &mut Container, n: usize) -> Vec<CandidateId> {
        #[allow(clippy::cast_precision_loss)]
        (0..n)
            .map(|i| {
                let v = i as f64 / n as f64;
                add(c, [v, 0.5], [v, 1.0 - v], i as f64)
            })
            .collect()
    }

    #[test]
    fn test_rand_filtration_copies_into_pairs() {
        let mut c = container();
        let pop = population(&mut c, 5);
        c.append_set_with(pop.clone(), vec![Tag::ForSelection]);
        let mut op = RandFiltrationForDirection::new();
        run(&mut op, &mut c, 1);
        let out = c.sets_with_tags(&[Tag::ForDirection]);
        assert_eq!(out.len(), 3);
        let sizes: Vec<usize> = out.iter().map(|&s| c.members(s).len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        for &s in &out {
            for id in c.members(s) {
                assert!(!pop.contains(&id));
            }
        }
        // a second pass replaces the previous groups
        run(&mut op, &mut c, 2);
        assert_eq!(c.sets_with_tags(&[Tag::ForDirection]).len(), 3);
    }

    #[test]
    fn test_rand_filtration_limits_input() {
        let mut c = container();
        let pop = population(&mut c, 6);
        c.append_set_with(pop[..3].to_vec(), vec![Tag::ForSelection]);
        c.append_set_with(pop[3..].to_vec(), vec![Tag::ForSelection]);
        let mut op = RandFiltrationForDirection::new().with_input_set_size(2);
        run(&mut op, &mut c, 4);
        let out = c.sets_with_tags(&[Tag::ForDirection]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|&s| c.members(s).len() == 2));
    }

    #[test]
    fn test_ordered_tournament_picks_lower_cost() {
        let mut c = container();
        let pop = population(&mut c, 4);
        // costs 0..3; pairs (0, 1) and (2, 3)
        c.append_set_with(pop, vec![Tag::ForSelection]);
        let mut op = TournamentFiltrationForDirection::new();
        run(&mut op, &mut c, 0);
        let out = c.sets_with_tags(&[Tag::ForDirection]);
        assert_eq!(out.len(), 2);
        let costs: Vec<f64> = c
            .members(out[0])
            .iter()
            .map(|&id| c.candidate(id).cost())
            .collect();
        assert_eq!(costs, vec![0.0, 2.0]);
    }

    #[test]
    fn test_shuffled_tournament_counts() {
        let mut c = container();
        let pop = population(&mut c, 5);
        c.append_set_with(pop, vec![Tag::ForSelection]);
        let mut op = TournamentFiltrationForDirection::new()
            .with_selection_method(SelectionMethod::Shuffled)
            .with_number_of_mappings(2);
        run(&mut op, &mut c, 3);
        let out = c.sets_with_tags(&[Tag::ForDirection]);
        assert_eq!(out.len(), 1);
        assert_eq!(c.members(out[0]).len(), 2);
        // two pairs of distinct members; the worst can never win
        for id in c.members(out[0]) {
            assert!(c.candidate(id).cost() < 4.0);
        }
    }

    #[test]
    fn test_neighbourhoods_by_weight() {
        let mut c = container();
        let pop = population(&mut c, 5);
        for (i, &id) in pop.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let w = i as f64 / 4.0;
            c.candidate_mut(id).define_weights(vec![w, 1.0 - w]);
        }
        c.append_set_with(pop.clone(), vec![Tag::ForNeighbourhoods]);
        let mut op = NeighbourhoodFiltration::new()
            .with_criterion(NeighbourhoodCriterion::Size(2))
            .with_clear_outputs(false);
        run(&mut op, &mut c, 0);
        let out = c.sets_with_tags(&[Tag::Neighbourhoods]);
        assert_eq!(out.len(), 5);
        assert_eq!(c.members(out[2]), vec![pop[2], pop[1], pop[3]]);
        assert_eq!(c.members(out[0]), vec![pop[0], pop[1], pop[2]]);
        // kept on the next pass
        run(&mut op, &mut c, 0);
        assert_eq!(c.sets_with_tags(&[Tag::Neighbourhoods]).len(), 5);
    }

    #[test]
    fn test_neighbourhoods_by_radius() {
        let mut c = container();
        let a = add(&mut c, [0.0, 0.0], [0.0, 0.0], 0.0);
        let b = add(&mut c, [0.05, 0.0], [0.0, 0.0], 0.0);
        let far = add(&mut c, [1.0, 1.0], [0.0, 0.0], 0.0);
        c.append_set_with(vec![a, b, far], vec![Tag::ForNeighbourhoods]);
        let mut op = NeighbourhoodFiltration::new().with_max_solutions(2);
        run(&mut op, &mut c, 0);
        let out = c.sets_with_tags(&[Tag::Neighbourhoods]);
        assert_eq!(out.len(), 2);
        assert_eq!(c.members(out[0]), vec![a, b]);
        assert_eq!(c.members(out[1]), vec![b, a]);
    }

    #[test]
    fn test_set_replacement_probabilities() {
        let mut c = container();
        let pop = population(&mut c, 4);
        c.append_set_with(pop.clone(), vec![Tag::MainOptimization]);
        c.append_set_with(pop[..2].to_vec(), vec![Tag::ForSetReplacement]);
        let mut never = RandSetReplacement::new().with_probability(0.0);
        run(&mut never, &mut c, 0);
        let out = c.sets_with_tags(&[Tag::ForSelection]);
        assert_eq!(c.members(out[0]), pop[..2].to_vec());

        let mut always = RandSetReplacement::new().with_probability(1.0);
        run(&mut always, &mut c, 0);
        let out = c.sets_with_tags(&[Tag::ForSelection]);
        assert_eq!(out.len(), 1);
        assert_eq!(c.members(out[0]), pop);
    }

    #[test]
    fn test_truncate_and_merge() {
        let mut c = container();
        let pop = population(&mut c, 4);
        let main = c.append_set_with(pop[..2].to_vec(), vec![Tag::MainOptimization]);
        c.append_set_with(pop[..2].to_vec(), vec![Tag::ForNextIteration]);
        c.append_set_with(pop[2..].to_vec(), vec![Tag::ForResize, Tag::ForNextIteration]);
        run(&mut TruncateSets::new(1), &mut c, 0);
        run(&mut MergeForNextIteration::new(), &mut c, 0);
        assert_eq!(c.members(main), vec![pop[0], pop[1], pop[2]]);
    }

    #[test]
    fn test_direction_fitness_selection() {
        let mut c = container();
        // costs favour a and b; d lies on the direction [0.5, 0.5]
        let a = add(&mut c, [0.0; 2], [0.0, 1.0], 0.0);
        let b = add(&mut c, [0.0; 2], [1.0, 0.0], 1.0);
        let d = add(&mut c, [0.0; 2], [0.5, 0.5], 5.0);
        let e = add(&mut c, [0.0; 2], [0.9, 0.1], 4.0);
        c.append_set_with(vec![a, b, d, e], vec![Tag::MainOptimization]);
        let mut op = DirectionFitnessFiltration::new().with_max_solutions(3);
        run(&mut op, &mut c, 0);
        let out = c.set_with_tag(&Tag::Filtration).unwrap();
        assert_eq!(c.members(out), vec![a, b, d]);

        op.define_max_solutions(0);
        run(&mut op, &mut c, 0);
        assert_eq!(c.sets_with_tags(&[Tag::Filtration]).len(), 1);
        assert_eq!(c.members(out).len(), 4);
    }
}
