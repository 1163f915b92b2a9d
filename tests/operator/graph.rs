use core::any::Any;
use std::sync::Arc;

use evoflow::operator::{Context, Evaluator, RandomInit};
use evoflow::prelude::*;

fn problem() -> Problem {
    let mut p = Problem::new();
    p.append_function_auto(Arc::new(FnFunction::new("sq", 1, 2, |x| {
        vec![x[0] * x[0], (x[0] - 1.0).powi(2)]
    })));
    p.process();
    p
}

/// Copies every member of the main set into a fresh elite set.
struct Elite {
    ports: Ports,
    passes: usize,
}

impl Elite {
    fn new() -> Self {
        Self {
            ports: Ports::new(vec![Tag::MainOptimization], vec![Tag::custom("elite")]),
            passes: 0,
        }
    }
}

impl Operator for Elite {
    fn name(&self) -> &'static str {
        "elite"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        self.passes += 1;
        ctx.clear_output_sets();
        let set = ctx.append_output_set();
        for id in ctx.input_members(0) {
            ctx.clone_into(id, set);
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn test_custom_operator_copies_main_set() {
    let mut g = Graph::new(Container::new(problem()), Some(5));
    let init = g.add(RandomInit::new(6), None).unwrap();
    let eval = g.add(Evaluator::new(), Some(init)).unwrap();
    let elite = g.add(Elite::new(), Some(eval)).unwrap();
    g.validate().unwrap();
    g.evaluate(elite).unwrap();

    let c = g.container();
    let main = c.members(c.set_with_tag(&Tag::MainOptimization).unwrap());
    let copies = c.members(c.set_with_tag(&Tag::custom("elite")).unwrap());
    assert_eq!(copies.len(), 6);
    for (&a, &b) in main.iter().zip(&copies) {
        assert_ne!(a, b);
        assert_eq!(c.candidate(a).decision_values(), c.candidate(b).decision_values());
        assert_eq!(c.candidate(a).objectives(), c.candidate(b).objectives());
    }
}

#[test]
fn test_outputs_are_replaced_each_iteration() {
    let mut g = Graph::new(Container::new(problem()), Some(5));
    let init = g.add(RandomInit::new(4), None).unwrap();
    let elite = g.add(Elite::new(), Some(init)).unwrap();
    for _ in 0..3 {
        g.evaluate(elite).unwrap();
        g.increment_iteration();
    }
    assert_eq!(g.node_mut::<Elite>(elite).unwrap().passes, 3);
    let c = g.container();
    assert_eq!(c.sets_with_tags(&[Tag::custom("elite")]).len(), 1);
}

#[test]
fn test_node_without_input_is_skipped() {
    let mut g = Graph::new(Container::new(problem()), None);
    let elite = g.add(Elite::new(), None).unwrap();
    g.declare_source(Tag::MainOptimization);
    g.validate().unwrap();
    g.evaluate(elite).unwrap();
    assert_eq!(g.node_mut::<Elite>(elite).unwrap().passes, 0);
    assert!(g.container().set_with_tag(&Tag::custom("elite")).is_none());
}

#[test]
fn test_unbound_input_fails_validation() {
    let mut g = Graph::new(Container::new(problem()), None);
    g.add(Elite::new(), None).unwrap();
    let err = g.validate().unwrap_err();
    assert!(matches!(err, Error::UnboundPort { node: "elite", .. }));
}

#[test]
fn test_additional_outputs_tag_produced_sets() {
    let mut g = Graph::new(Container::new(problem()), Some(1));
    let init = g.add(RandomInit::new(3), None).unwrap();
    g.ports_mut(init)
        .unwrap()
        .add_additional_output(Tag::custom("seeded"));
    g.evaluate(init).unwrap();
    let c = g.container();
    let main = c.set_with_tag(&Tag::MainOptimization).unwrap();
    assert_eq!(c.set_with_tag(&Tag::custom("seeded")), Some(main));
    assert_eq!(g.node_name(init), Some("Random Initialisation"));
}
