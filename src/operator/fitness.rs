//! Operators that assign a scalar cost to candidates.

use core::any::Any;

use super::{Context, Operator, Ports};
use crate::error::Result;
use crate::normalisation::normalise_to_unit_box;
use crate::pareto::{DominanceMode, non_dominance_sort};
use crate::scalarizing::{ScalarisingFunction, gd_weights};
use crate::set::CandidateId;
use crate::tag::Tag;

/// Where the weighting vector of a scalarization comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightScope {
    /// Each candidate's own weighting vector. The result is final: scalarised
    /// candidates are skipped on later passes.
    Local,
    /// The container's reference direction, shared by every candidate.
    #[default]
    Global,
}

/// Cost every evaluated, not yet scalarised member of the output sets.
///
/// Objectives are normalized to the unit box spanned by the ideal and
/// anti-ideal before the scalarizing function is applied.
fn scalarise(
    ctx: &mut Context<'_>,
    function: ScalarisingFunction,
    scope: WeightScope,
    transform: fn(&[f64]) -> Vec<f64>,
) {
    let ideal = ctx.container.ideal().to_vec();
    let anti_ideal = ctx.container.anti_ideal().to_vec();
    let global = match scope {
        WeightScope::Global => Some(transform(ctx.container.dir_vec())),
        WeightScope::Local => None,
    };
    for set in ctx.outputs().to_vec() {
        for id in ctx.container.members(set) {
            let c = ctx.container.candidate(id);
            if c.is_scalarised() || !c.is_evaluated() {
                continue;
            }
            let f = normalise_to_unit_box(c.objectives(), &ideal, &anti_ideal);
            let cost = match &global {
                Some(w) => function.apply(w, &f),
                None => function.apply(&transform(c.weights()), &f),
            };
            let c = ctx.container.candidate_mut(id);
            c.define_cost(cost);
            if scope == WeightScope::Local {
                c.define_scalarised(true);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scalarization
// ---------------------------------------------------------------------------

/// Assigns every candidate the scalarized value of its normalized objectives.
#[derive(Clone, Debug)]
pub struct Scalarization {
    ports: Ports,
    function: ScalarisingFunction,
    scope: WeightScope,
}

impl Default for Scalarization {
    fn default() -> Self {
        Self::new()
    }
}

impl Scalarization {
    /// Weighted sum with global weights over the main set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::MainOptimization]),
            function: ScalarisingFunction::default(),
            scope: WeightScope::default(),
        }
    }

    /// Scalarizing function.
    #[must_use]
    pub fn with_function(mut self, function: ScalarisingFunction) -> Self {
        self.function = function;
        self
    }

    /// Source of the weighting vector.
    #[must_use]
    pub fn with_scope(mut self, scope: WeightScope) -> Self {
        self.scope = scope;
        self
    }

    /// The scalarizing function in use.
    #[must_use]
    pub fn function(&self) -> ScalarisingFunction {
        self.function
    }
}

impl Operator for Scalarization {
    fn name(&self) -> &'static str {
        "Scalarization"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        scalarise(ctx, self.function, self.scope, <[f64]>::to_vec);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Generalized decomposition
// ---------------------------------------------------------------------------

/// Scalarization whose weights are derived from a direction with
/// [`gd_weights`], so that the optimum of the scalarizing function lies on
/// that direction.
#[derive(Clone, Debug)]
pub struct GeneralizedDecomposition {
    ports: Ports,
    function: ScalarisingFunction,
    scope: WeightScope,
}

impl Default for GeneralizedDecomposition {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneralizedDecomposition {
    /// Weighted sum with global weights over the main set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::MainOptimization]),
            function: ScalarisingFunction::default(),
            scope: WeightScope::default(),
        }
    }

    /// Scalarizing function.
    #[must_use]
    pub fn with_function(mut self, function: ScalarisingFunction) -> Self {
        self.function = function;
        self
    }

    /// Source of the direction.
    #[must_use]
    pub fn with_scope(mut self, scope: WeightScope) -> Self {
        self.scope = scope;
        self
    }

    /// Change the scalarizing function.
    pub fn define_function(&mut self, function: ScalarisingFunction) {
        self.function = function;
    }

    /// The scalarizing function in use.
    #[must_use]
    pub fn function(&self) -> ScalarisingFunction {
        self.function
    }
}

impl Operator for GeneralizedDecomposition {
    fn name(&self) -> &'static str {
        "Generalized Decomposition"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        scalarise(ctx, self.function, self.scope, gd_weights);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Non-dominance ranking
// ---------------------------------------------------------------------------

/// Sorts the first input set into non-dominated layers.
///
/// Every layer becomes an output set and its members get the layer index as
/// cost. With constraint handling on and constraints declared, feasible
/// members are ranked first; infeasible ones follow in layers of equal
/// total violation, least violated first.
#[derive(Clone, Debug)]
pub struct NonDominanceRanking {
    ports: Ports,
    constraint_handling: bool,
}

impl Default for NonDominanceRanking {
    fn default() -> Self {
        Self::new()
    }
}

impl NonDominanceRanking {
    /// Rank the main set into sets tagged for selection and fitness.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(
                vec![Tag::MainOptimization],
                vec![Tag::ForSelection, Tag::Fitness],
            ),
            constraint_handling: true,
        }
    }

    /// Let constraint violation influence the ranks.
    #[must_use]
    pub fn with_constraint_handling(mut self, on: bool) -> Self {
        self.constraint_handling = on;
        self
    }

    fn ranks(&self, ctx: &Context<'_>, members: &[CandidateId]) -> Vec<Vec<CandidateId>> {
        let problem = ctx.container.problem();
        if !self.constraint_handling || problem.n_constraints() == 0 {
            return non_dominance_sort(ctx.container, members, DominanceMode::Weak);
        }
        let thresholds = problem.thresholds();
        let (feasible, infeasible): (Vec<CandidateId>, Vec<CandidateId>) = members
            .iter()
            .partition(|&&id| ctx.container.candidate(id).is_feasible(thresholds));

        let mut ranks = non_dominance_sort(ctx.container, &feasible, DominanceMode::Weak);
        let violations: Vec<f64> = infeasible
            .iter()
            .map(|&id| ctx.container.candidate(id).constraint_violation(thresholds))
            .collect();
        let mut last = f64::NAN;
        for i in super::ascending_order(&violations) {
            if (violations[i] - last).abs() < crate::EPSILON {
                if let Some(rank) = ranks.last_mut() {
                    rank.push(infeasible[i]);
                }
            } else {
                ranks.push(vec![infeasible[i]]);
                last = violations[i];
            }
        }
        ranks
    }
}

impl Operator for NonDominanceRanking {
    fn name(&self) -> &'static str {
        "Non-dominance Ranking"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.clear_output_sets();
        let members = ctx.input_members(0);
        let ranks = self.ranks(ctx, &members);
        for (r, rank) in ranks.into_iter().enumerate() {
            for &id in &rank {
                ctx.container.candidate_mut(id).define_cost(r as f64);
            }
            ctx.append_output_set_with(rank);
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Constraint penalty
// ---------------------------------------------------------------------------

/// Penalizes the cost of infeasible members.
///
/// Per output set, each member's infeasibility is its mean violation
/// relative to the largest violation of each violated constraint. Infeasible
/// members first have their cost raised to the best reference cost (the best
/// feasible cost, or the cost of the least infeasible member), then receive
/// `gamma * (exp(c + v) - 1) / (exp(2) - 1)`, where `c` and `v` are the
/// member's cost and infeasibility normalized over the set and `gamma` is
/// the spread of costs above the reference.
#[derive(Clone, Debug)]
pub struct ConstraintPenalty {
    ports: Ports,
}

impl Default for ConstraintPenalty {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintPenalty {
    /// Penalize the main set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::MainOptimization]),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn penalise(costs: &mut [f64], violations: &[Vec<f64>]) {
    let n = costs.len();
    let n_constraints = violations.first().map_or(0, Vec::len);
    if n == 0 || n_constraints == 0 {
        return;
    }
    let max_violation: Vec<f64> = (0..n_constraints)
        .map(|j| violations.iter().map(|v| v[j]).fold(0.0, f64::max))
        .collect();
    if max_violation.iter().all(|&m| m <= crate::EPSILON) {
        return;
    }
    let infeasibility: Vec<f64> = violations
        .iter()
        .map(|v| {
            v.iter()
                .zip(&max_violation)
                .filter(|&(_, &m)| m > crate::EPSILON)
                .map(|(x, m)| x / m)
                .sum::<f64>()
                / n_constraints as f64
        })
        .collect();
    let feasible: Vec<bool> = infeasibility.iter().map(|&v| v < crate::EPSILON).collect();

    let (best_cost, min_infeasibility) = if feasible.iter().any(|&f| f) {
        let best = (0..n)
            .filter(|&i| feasible[i])
            .map(|i| costs[i])
            .fold(f64::INFINITY, f64::min);
        (best, 0.0)
    } else {
        let least = super::ascending_order(&infeasibility)[0];
        (costs[least], infeasibility[least])
    };
    let min_cost = costs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_cost = costs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let max_infeasibility = (0..n)
        .filter(|&i| !feasible[i])
        .map(|i| infeasibility[i])
        .fold(f64::NEG_INFINITY, f64::max);

    let spread = if max_cost > best_cost {
        max_cost - best_cost
    } else {
        max_cost - min_cost
    };
    let gamma = if spread > 0.0 { spread } else { 1.0 };
    let denom = 2.0_f64.exp() - 1.0;

    for i in (0..n).filter(|&i| !feasible[i]) {
        costs[i] = costs[i].max(best_cost);
        let norm_cost = if max_cost > min_cost {
            ((costs[i] - min_cost) / (max_cost - min_cost)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let norm_infeasibility = if max_infeasibility > min_infeasibility {
            (infeasibility[i] - min_infeasibility) / (max_infeasibility - min_infeasibility)
        } else {
            1.0
        };
        costs[i] += gamma * ((norm_cost + norm_infeasibility).exp() - 1.0) / denom;
    }
}

impl Operator for ConstraintPenalty {
    fn name(&self) -> &'static str {
        "Constraint Penalty"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        if ctx.container.problem().n_constraints() == 0 {
            return Ok(());
        }
        let thresholds = ctx.container.problem().thresholds().to_vec();
        for set in ctx.outputs().to_vec() {
            let members = ctx.container.members(set);
            let mut costs: Vec<f64> = members
                .iter()
                .map(|&id| ctx.container.candidate(id).cost())
                .collect();
            let violations: Vec<Vec<f64>> = members
                .iter()
                .map(|&id| {
                    let c = ctx.container.candidate(id).constraints();
                    thresholds
                        .iter()
                        .enumerate()
                        .map(|(j, t)| c.get(j).map_or(0.0, |v| (v - t).max(0.0)))
                        .collect()
                })
                .collect();
            penalise(&mut costs, &violations);
            for (&id, cost) in members.iter().zip(costs) {
                ctx.container.candidate_mut(id).define_cost(cost);
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
    use crate::operator::test_support::{constrained_container, container};

    fn add(c: &mut Container, f: [f64; 2]) -> CandidateId {
        let id = c.insert(Candidate::from_values(
            vec![Element::real(0.5), Element::real(0.5)],
            f.to_vec(),
        ));
        c.observe(id);
        id
    }

    #[test]
    fn test_local_weights_scalarise_once() {
        let mut c = container();
        let a = add(&mut c, [0.0, 1.0]);
        let b = add(&mut c, [1.0, 0.0]);
        c.candidate_mut(a).define_weights(vec![1.0, 0.0]);
        c.candidate_mut(b).define_weights(vec![1.0, 0.0]);
        c.append_set_with(vec![a, b], vec![Tag::MainOptimization]);
        let mut rng = fastrand::Rng::with_seed(0);
        let mut op = Scalarization::new()
            .with_function(ScalarisingFunction::WeightedChebyshev)
            .with_scope(WeightScope::Local);
        let mut ctx = Context::resolve(&mut c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
        assert!(c.candidate(a).cost().abs() < 1e-5);
        assert!((c.candidate(b).cost() - 1.0).abs() < 1e-5);
        assert!(c.candidate(a).is_scalarised());
    }

    #[test]
    fn test_gd_global_prefers_direction() {
        let mut c = container();
        let a = add(&mut c, [0.2, 0.8]);
        let b = add(&mut c, [0.8, 0.2]);
        c.append_set_with(vec![a, b], vec![Tag::MainOptimization]);
        c.define_dir_vec(&[0.9, 0.1]).unwrap();
        let mut rng = fastrand::Rng::with_seed(0);
        let mut op = GeneralizedDecomposition::new()
            .with_function(ScalarisingFunction::WeightedChebyshev);
        let mut ctx = Context::resolve(&mut c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
        // the direction leans to objective 0, so a member far along it wins
        assert!(c.candidate(b).cost() < c.candidate(a).cost());
        assert!(!c.candidate(a).is_scalarised());
    }

    #[test]
    fn test_ranking_sets_cost_to_layer() {
        let mut c = container();
        let a = add(&mut c, [1.0, 3.0]);
        let b = add(&mut c, [3.0, 1.0]);
        let d = add(&mut c, [4.0, 4.0]);
        c.append_set_with(vec![d, a, b], vec![Tag::MainOptimization]);
        let mut rng = fastrand::Rng::with_seed(0);
        let mut op = NonDominanceRanking::new();
        let mut ctx = Context::resolve(&mut c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
        let ranks = c.sets_with_tags(&[Tag::ForSelection, Tag::Fitness]);
        assert_eq!(ranks.len(), 2);
        assert_eq!(c.members(ranks[0]), vec![a, b]);
        assert!((c.candidate(d).cost() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ranking_puts_infeasible_last() {
        let mut c = constrained_container();
        let good = add(&mut c, [4.0, 4.0]);
        let bad = add(&mut c, [0.0, 0.0]);
        let worse = add(&mut c, [0.0, 0.0]);
        c.candidate_mut(good).define_constraints(vec![0.5]);
        c.candidate_mut(bad).define_constraints(vec![2.0]);
        c.candidate_mut(worse).define_constraints(vec![3.0]);
        c.append_set_with(vec![worse, bad, good], vec![Tag::MainOptimization]);
        let mut rng = fastrand::Rng::with_seed(0);
        let mut op = NonDominanceRanking::new();
        let mut ctx = Context::resolve(&mut c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
        let ranks = c.sets_with_tags(&[Tag::ForSelection]);
        assert_eq!(ranks.len(), 3);
        assert_eq!(c.members(ranks[0]), vec![good]);
        assert_eq!(c.members(ranks[2]), vec![worse]);
    }

    #[test]
    fn test_penalty_makes_infeasible_worse() {
        let mut costs = vec![0.5, 0.1, 0.9];
        let violations = vec![vec![0.0], vec![2.0], vec![1.0]];
        penalise(&mut costs, &violations);
        assert!((costs[0] - 0.5).abs() < f64::EPSILON);
        assert!(costs[1] > 0.5);
        assert!(costs[2] > 0.9);
        // more violation means more penalty
        let mut all_bad = vec![0.3, 0.3];
        penalise(&mut all_bad, &[vec![1.0], vec![2.0]]);
        assert!(all_bad[1] > all_bad[0]);
    }

    #[test]
    fn test_penalty_ignores_feasible_sets() {
        let mut costs = vec![0.5, 0.1];
        penalise(&mut costs, &[vec![0.0], vec![0.0]]);
        assert_eq!(costs, vec![0.5, 0.1]);
    }
}
