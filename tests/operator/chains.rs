use std::sync::Arc;

use evoflow::operator::{
    Evaluator, GeneralizedDecomposition, NonDominanceRanking, UserDefinedInit, WeightScope,
};
use evoflow::prelude::*;

/// `f = (x0, 1 - x0 + x1)` on `[0, 1]^2`, optionally with `x0 + x1 <= 1`.
fn problem(constrained: bool) -> Problem {
    let mut p = Problem::new();
    for name in ["x0", "x1"] {
        p.append_decision_variable(PropertiesFactory::create(name, ElementType::Real), 0.0, 1.0);
    }
    for name in ["f0", "f1"] {
        p.append_objective(PropertiesFactory::create(name, ElementType::Real));
    }
    let n_outputs = if constrained { 3 } else { 2 };
    let mut map = FunctionMap::new(2, n_outputs)
        .decision(0, 0)
        .decision(1, 1)
        .objective(0, 0)
        .objective(1, 1);
    if constrained {
        p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 1.0);
        map = map.constraint(2, 0);
    }
    p.append_function(
        Arc::new(FnFunction::new("lin", 2, n_outputs, move |x| {
            let mut out = vec![x[0], 1.0 - x[0] + x[1]];
            if n_outputs == 3 {
                out.push(x[0] + x[1]);
            }
            out
        })),
        map,
    );
    assert_eq!(p.process(), ProblemStatus::FullyDefined);
    p
}

fn ranked(problem: Problem, decisions: Vec<Vec<f64>>) -> (Graph, Vec<CandidateId>) {
    let mut g = Graph::new(Container::new(problem), Some(3));
    let init = g
        .add(UserDefinedInit::new().with_decisions(decisions), None)
        .unwrap();
    let eval = g.add(Evaluator::new(), Some(init)).unwrap();
    let rank = g.add(NonDominanceRanking::new(), Some(eval)).unwrap();
    g.evaluate(rank).unwrap();
    let c = g.container();
    let main = c.members(c.set_with_tag(&Tag::MainOptimization).unwrap());
    (g, main)
}

#[test]
fn test_ranking_layers_become_sets() {
    let (g, main) = ranked(
        problem(false),
        vec![
            vec![0.1, 0.2],
            vec![0.5, 0.5],
            vec![0.9, 0.1],
            vec![0.5, 0.9],
        ],
    );
    let c = g.container();
    assert_eq!(c.used_budget(), 4);
    let layers = c.sets_with_tags(&[Tag::ForSelection, Tag::Fitness]);
    assert_eq!(layers.len(), 2);
    assert_eq!(c.members(layers[0]).len(), 3);
    assert_eq!(c.members(layers[1]), vec![main[3]]);
    let costs: Vec<f64> = main.iter().map(|&id| c.candidate(id).cost()).collect();
    assert_eq!(costs, vec![0.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_infeasible_members_ranked_last() {
    let (g, main) = ranked(
        problem(true),
        vec![
            vec![0.1, 0.2],
            vec![0.9, 0.8],
            vec![0.5, 0.1],
            vec![0.6, 0.6],
        ],
    );
    let c = g.container();
    let thresholds = c.problem().thresholds();
    assert!(c.candidate(main[0]).is_feasible(thresholds));
    assert!(!c.candidate(main[1]).is_feasible(thresholds));
    let costs: Vec<f64> = main.iter().map(|&id| c.candidate(id).cost()).collect();
    // feasible front, then violation 0.2, then violation 0.7
    assert_eq!(costs, vec![0.0, 2.0, 0.0, 1.0]);
}

#[test]
fn test_global_decomposition_follows_direction() {
    let mut g = Graph::new(Container::new(problem(false)), Some(8));
    let init = g
        .add(
            UserDefinedInit::new().with_decisions(vec![
                vec![0.0, 0.0],
                vec![1.0, 0.0],
                vec![0.5, 0.5],
            ]),
            None,
        )
        .unwrap();
    let eval = g.add(Evaluator::new(), Some(init)).unwrap();
    let gd = g
        .add(
            GeneralizedDecomposition::new()
                .with_scope(WeightScope::Global)
                .with_function(ScalarisingFunction::WeightedChebyshev),
            Some(eval),
        )
        .unwrap();
    g.container_mut().define_dir_vec(&[1.0, 0.0]).unwrap();
    g.evaluate(gd).unwrap();

    // objectives (0, 1), (1, 0) and (0.5, 1); the direction favours a small f1
    let c = g.container();
    let main = c.members(c.set_with_tag(&Tag::MainOptimization).unwrap());
    let costs: Vec<f64> = main.iter().map(|&id| c.candidate(id).cost()).collect();
    assert!(costs.iter().all(|x| x.is_finite() && *x >= 0.0));
    assert!(costs[1] < costs[0]);
    assert!(costs[1] < costs[2]);
}
