//! Recombination and mutation of decision vectors.

use core::any::Any;

use super::{Context, Operator, Ports, happens};
use crate::container::Container;
use crate::error::Result;
use crate::set::CandidateId;
use crate::tag::Tag;
use crate::types::ElementType;

fn is_arithmetic(t: ElementType) -> bool {
    matches!(t, ElementType::Real | ElementType::Integer)
}

/// Mirror every decision of `id` back into the box.
fn reflect_into_box(container: &mut Container, id: CandidateId) {
    let values = container.candidate(id).decision_values();
    let reflected: Vec<f64> = {
        let bounds = container.problem().box_constraints();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| bounds.reflect(i, v))
            .collect()
    };
    let cand = container.candidate_mut(id);
    for (i, (old, new)) in values.iter().zip(reflected).enumerate() {
        #[allow(clippy::float_cmp)]
        if *old != new {
            cand.define_decision(i, new);
        }
    }
}

/// SBX spread factor for a uniform draw `u`.
fn sbx_beta(u: f64, eta: f64) -> f64 {
    if u <= 0.5 {
        (2.0 * u).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 * (1.0 - (u - crate::EPSILON)))).powf(1.0 / (eta + 1.0))
    }
}

/// Polynomial mutation of `x` within `[low, high]`.
fn polynomial_step(u: f64, x: f64, low: f64, high: f64, eta: f64) -> f64 {
    if u <= 0.5 {
        let delta = (2.0 * u).powf(1.0 / (eta + 1.0)) - 1.0;
        x + delta * (x - low)
    } else {
        let delta = 1.0 - (2.0 * (1.0 - u)).powf(1.0 / (eta + 1.0));
        x + delta * (high - x)
    }
}

// ---------------------------------------------------------------------------
// SBX
// ---------------------------------------------------------------------------

/// Simulated binary crossover of the first two members of each output set.
///
/// Only real and integer variables take part. Both members are mirrored
/// back into the box afterwards. Processing stops at the first set with
/// fewer than two members.
#[derive(Clone, Debug)]
pub struct SbxCrossover {
    ports: Ports,
    eta: f64,
    solution_probability: f64,
    variable_probability: f64,
    swap_probability: f64,
}

impl Default for SbxCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl SbxCrossover {
    /// Distribution index 15, crossover probability 0.9.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::ForDirection]),
            eta: 15.0,
            solution_probability: 0.9,
            variable_probability: 0.5,
            swap_probability: 0.5,
        }
    }

    /// Distribution index. Larger values keep children closer to parents.
    #[must_use]
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    /// Probability that a pair is recombined at all.
    #[must_use]
    pub fn with_solution_probability(mut self, p: f64) -> Self {
        self.solution_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability that a variable of a recombined pair is crossed.
    #[must_use]
    pub fn with_variable_probability(mut self, p: f64) -> Self {
        self.variable_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability that the two children swap places.
    #[must_use]
    pub fn with_swap_probability(mut self, p: f64) -> Self {
        self.swap_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Change the crossover probability.
    pub fn define_solution_probability(&mut self, p: f64) {
        self.solution_probability = p.clamp(0.0, 1.0);
    }

    /// Distribution index.
    #[must_use]
    pub fn eta(&self) -> f64 {
        self.eta
    }
}

impl Operator for SbxCrossover {
    fn name(&self) -> &'static str {
        "SBX Crossover"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let types = ctx.container.problem().decision_types();
        for set in ctx.outputs().to_vec() {
            let members = ctx.container.members(set);
            let [a, b, ..] = members[..] else {
                return Ok(());
            };
            if !happens(ctx.rng, self.solution_probability) {
                continue;
            }
            for (var, &t) in types.iter().enumerate() {
                if !is_arithmetic(t) || !happens(ctx.rng, self.variable_probability) {
                    continue;
                }
                let beta = sbx_beta(ctx.rng.f64(), self.eta);
                let av = ctx.container.candidate(a).decisions()[var].value();
                let bv = ctx.container.candidate(b).decisions()[var].value();
                let x = 0.5 * ((1.0 + beta) * av + (1.0 - beta) * bv);
                let y = 0.5 * ((1.0 - beta) * av + (1.0 + beta) * bv);
                let (to_a, to_b) = if happens(ctx.rng, self.swap_probability) {
                    (x, y)
                } else {
                    (y, x)
                };
                ctx.container.candidate_mut(a).define_decision(var, to_a);
                ctx.container.candidate_mut(b).define_decision(var, to_b);
            }
            for id in members {
                reflect_into_box(ctx.container, id);
            }
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Polynomial mutation
// ---------------------------------------------------------------------------

/// Polynomial mutation of every member of the output sets.
///
/// Real and integer variables are perturbed towards a bound; ordinal and
/// nominal variables are redrawn uniformly from their range. Mutated
/// members are mirrored back into the box.
#[derive(Clone, Debug)]
pub struct PolynomialMutation {
    ports: Ports,
    eta: f64,
    solution_probability: f64,
    variable_probability: Option<f64>,
}

impl Default for PolynomialMutation {
    fn default() -> Self {
        Self::new()
    }
}

impl PolynomialMutation {
    /// Distribution index 20, every solution mutated, variables with
    /// probability 0.1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::new(Vec::new(), vec![Tag::ForPerturbation]),
            eta: 20.0,
            solution_probability: 1.0,
            variable_probability: Some(0.1),
        }
    }

    /// Distribution index.
    #[must_use]
    pub fn with_eta(mut self, eta: f64) -> Self {
        self.eta = eta;
        self
    }

    /// Probability that a member is mutated.
    #[must_use]
    pub fn with_solution_probability(mut self, p: f64) -> Self {
        self.solution_probability = p.clamp(0.0, 1.0);
        self
    }

    /// Probability that a variable of a mutated member changes.
    #[must_use]
    pub fn with_variable_probability(mut self, p: f64) -> Self {
        self.variable_probability = Some(p.clamp(0.0, 1.0));
        self
    }

    /// Mutate each variable with probability `1 / n_decisions`.
    #[must_use]
    pub fn with_inverse_dimension_probability(mut self) -> Self {
        self.variable_probability = None;
        self
    }

    /// Distribution index.
    #[must_use]
    pub fn eta(&self) -> f64 {
        self.eta
    }
}

impl Operator for PolynomialMutation {
    fn name(&self) -> &'static str {
        "Polynomial Mutation"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    #[allow(clippy::cast_precision_loss)]
    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        let types = ctx.container.problem().decision_types();
        let bounds = ctx.container.problem().box_constraints().clone();
        let p_var = self
            .variable_probability
            .unwrap_or(1.0 / types.len().max(1) as f64);
        for set in ctx.outputs().to_vec() {
            for id in ctx.container.members(set) {
                if !happens(ctx.rng, self.solution_probability) {
                    continue;
                }
                for (j, &t) in types.iter().enumerate() {
                    if !happens(ctx.rng, p_var) {
                        continue;
                    }
                    let value = if is_arithmetic(t) {
                        let x = ctx.container.candidate(id).decisions()[j].value();
                        let low = bounds.lower_bound(j).value();
                        let high = bounds.upper_bound(j).value();
                        polynomial_step(ctx.rng.f64(), x, low, high, self.eta)
                    } else {
                        bounds.random_value(j, t, ctx.rng)
                    };
                    ctx.container.candidate_mut(id).define_decision(j, value);
                }
                reflect_into_box(ctx.container, id);
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
    use crate::element::Element;
    use crate::operator::test_support::container;

    fn add(c: &mut Container, x: [f64; 2]) -> CandidateId {
        c.insert(Candidate::from_values(
            vec![Element::real(x[0]), Element::real(x[1])],
            vec![0.0, 0.0],
        ))
    }

    fn run<O: Operator>(op: &mut O, c: &mut Container, seed: u64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut ctx = Context::resolve(c, &mut rng, op.ports().clone());
        op.evaluate_node(&mut ctx).unwrap();
    }

    #[test]
    fn test_sbx_beta_symmetry() {
        assert!((sbx_beta(0.5, 15.0) - 1.0).abs() < 1e-12);
        assert!(sbx_beta(0.1, 15.0) < 1.0);
        assert!(sbx_beta(0.9, 15.0) > 1.0);
    }

    #[test]
    fn test_sbx_preserves_mean() {
        for seed in 0..20 {
            let mut c = container();
            let a = add(&mut c, [0.4, 0.3]);
            let b = add(&mut c, [0.6, 0.7]);
            c.append_set_with(vec![a, b], vec![Tag::ForDirection]);
            let mut op = SbxCrossover::new()
                .with_solution_probability(1.0)
                .with_variable_probability(1.0);
            run(&mut op, &mut c, seed);
            let xa = c.candidate(a).decision_values();
            let xb = c.candidate(b).decision_values();
            assert!((xa[0] + xb[0] - 1.0).abs() < 1e-9);
            assert!((xa[1] + xb[1] - 1.0).abs() < 1e-9);
            assert!(xa.iter().chain(&xb).all(|v| (0.0..=1.0).contains(v)));
            assert!(!c.candidate(a).is_evaluated());
        }
    }

    #[test]
    fn test_sbx_stops_at_short_set() {
        let mut c = container();
        let a = add(&mut c, [0.2, 0.2]);
        let b = add(&mut c, [0.8, 0.8]);
        let d = add(&mut c, [0.1, 0.9]);
        c.append_set_with(vec![d], vec![Tag::ForDirection]);
        c.append_set_with(vec![a, b], vec![Tag::ForDirection]);
        let mut op = SbxCrossover::new().with_solution_probability(1.0);
        run(&mut op, &mut c, 0);
        assert_eq!(c.candidate(a).decision_values(), vec![0.2, 0.2]);
        assert!(c.candidate(a).is_evaluated());
    }

    #[test]
    fn test_polynomial_step_moves_towards_bounds() {
        // u below one half moves towards the lower bound
        assert!(polynomial_step(0.1, 0.5, 0.0, 1.0, 20.0) < 0.5);
        assert!(polynomial_step(0.9, 0.5, 0.0, 1.0, 20.0) > 0.5);
        assert!((polynomial_step(0.5, 0.5, 0.0, 1.0, 20.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mutation_stays_in_box() {
        let mut c = container();
        let ids: Vec<CandidateId> = (0..10).map(|_| add(&mut c, [0.0, 1.0])).collect();
        c.append_set_with(ids.clone(), vec![Tag::ForPerturbation]);
        let mut op = PolynomialMutation::new().with_variable_probability(1.0);
        run(&mut op, &mut c, 7);
        let mut moved = 0;
        for id in ids {
            let x = c.candidate(id).decision_values();
            assert!(x.iter().all(|v| (0.0..=1.0).contains(v)));
            if x[0] > 0.0 || x[1] < 1.0 {
                moved += 1;
            }
            assert!(!c.candidate(id).is_evaluated());
        }
        assert!(moved > 0);
    }

    #[test]
    fn test_mutation_probability_zero_is_noop() {
        let mut c = container();
        let a = add(&mut c, [0.3, 0.3]);
        c.append_set_with(vec![a], vec![Tag::ForPerturbation]);
        let mut op = PolynomialMutation::new().with_solution_probability(0.0);
        run(&mut op, &mut c, 1);
        assert!(c.candidate(a).is_evaluated());
    }

    #[test]
    fn test_reflection_mirrors_overshoot() {
        let mut c = container();
        let a = add(&mut c, [0.5, 0.5]);
        c.candidate_mut(a).define_decision(0, 1.2);
        c.candidate_mut(a).define_decision(1, -0.25);
        reflect_into_box(&mut c, a);
        let x = c.candidate(a).decision_values();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 0.25).abs() < 1e-12);
    }
}
