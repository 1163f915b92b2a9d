//! Integration tests for problem definition, evaluation and records.

use std::sync::Arc;

use evoflow::distribution::{DistributionKind, UncertaintyMapping};
use evoflow::{
    Candidate, Direction, ElementType, Error, FnFunction, Function, FunctionMap, Problem,
    ProblemStatus, PropertiesFactory,
};

fn identity_problem() -> Problem {
    let mut p = Problem::new();
    p.append_function_auto(Arc::new(FnFunction::new("id", 1, 1, |x| vec![x[0]])));
    p
}

#[test]
fn test_uncertain_input_is_clamped_to_bound() {
    let mut p = identity_problem();
    // always samples 5.0, far above the upper bound of 1.0
    let mapping = UncertaintyMapping::new(DistributionKind::Constant, vec![5.0], vec![0.0]);
    p.define_decision_uncertainty(0, Some(mapping));
    assert_eq!(p.process(), ProblemStatus::FullyDefined);

    let mut c = Candidate::new(&p).unwrap();
    c.define_decisions(&[0.5]).unwrap();
    let mut rng = fastrand::Rng::with_seed(0);
    c.evaluate(&p, &mut rng).unwrap();

    assert_eq!(c.evaluated_inputs(), &[1.0]);
    assert!((c.objectives()[0] - 1.0).abs() < 1e-12);
    // the stored decision is untouched
    assert!((c.decision_values()[0] - 0.5).abs() < 1e-12);
}

#[test]
fn test_evaluation_requires_processing() {
    let p = identity_problem();
    assert_eq!(p.status(), ProblemStatus::UnprocessedChanges);
    assert!(matches!(
        Candidate::new(&p),
        Err(Error::ProblemNotReady(ProblemStatus::UnprocessedChanges))
    ));
}

#[test]
fn test_maximized_objective_is_negated() {
    let mut p = Problem::new();
    p.append_function_auto(Arc::new(
        FnFunction::new("gain", 1, 1, |x| vec![2.0 * x[0]])
            .with_directions(vec![Direction::Maximize]),
    ));
    p.process();
    let mut c = Candidate::new(&p).unwrap();
    c.define_decisions(&[0.25]).unwrap();
    c.evaluate(&p, &mut fastrand::Rng::with_seed(1)).unwrap();
    assert!((c.objectives()[0] + 0.5).abs() < 1e-12);
}

#[test]
fn test_constraint_feasibility() {
    let mut p = Problem::new();
    for name in ["x0", "x1"] {
        p.append_decision_variable(PropertiesFactory::create(name, ElementType::Real), 0.0, 1.0);
    }
    p.append_objective(PropertiesFactory::create("f", ElementType::Real));
    p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 1.0);
    let map = FunctionMap::new(2, 2)
        .decision(0, 0)
        .decision(1, 1)
        .objective(0, 0)
        .constraint(1, 0);
    p.append_function(
        Arc::new(FnFunction::new("fg", 2, 2, |x| vec![x[0] - x[1], x[0] + x[1]])),
        map,
    );
    assert_eq!(p.process(), ProblemStatus::FullyDefined);

    let mut rng = fastrand::Rng::with_seed(2);
    let mut inside = Candidate::new(&p).unwrap();
    inside.define_decisions(&[0.2, 0.3]).unwrap();
    inside.evaluate(&p, &mut rng).unwrap();
    assert!(inside.is_feasible(p.thresholds()));
    assert!(inside.constraint_violation(p.thresholds()).abs() < 1e-12);

    let mut outside = Candidate::new(&p).unwrap();
    outside.define_decisions(&[0.9, 0.6]).unwrap();
    outside.evaluate(&p, &mut rng).unwrap();
    assert!(!outside.is_feasible(p.thresholds()));
    assert!((outside.constraint_violation(p.thresholds()) - 0.5).abs() < 1e-12);
}

#[test]
fn test_record_round_trip() {
    let f: Arc<dyn Function> = Arc::new(FnFunction::new("lin", 2, 2, |x| {
        vec![x[0], 1.0 - x[0] + x[1]]
    }));
    let mut p = Problem::new();
    p.append_function_auto(Arc::clone(&f));
    p.define_bounds(1, -1.0, 2.0).unwrap();
    p.process();

    let record = p.to_record();
    let q = Problem::from_record(&record, |name| (name == "lin").then(|| Arc::clone(&f))).unwrap();
    assert!(q.is_fully_defined());
    assert_eq!(q.n_decisions(), 2);
    assert_eq!(q.n_objectives(), 2);
    assert_eq!(q.box_constraints().lower_values(), vec![0.0, -1.0]);
    assert_eq!(q.box_constraints().upper_values(), vec![1.0, 2.0]);
    assert_eq!(q.to_record(), record);

    let unknown = Problem::from_record(&record, |_| None);
    assert!(matches!(unknown, Err(Error::UnknownFunction(name)) if name == "lin"));
}
