//! The operator graph.
//!
//! Every node implements [`Operator`] and declares its [`Ports`]: the tags a
//! set must carry to be consumed and the tags the node stamps on the sets it
//! produces. Nodes are chained by parent links inside a [`Graph`], which owns
//! the [`Container`] and the random generator shared by all nodes.
//!
//! # Node evaluation
//!
//! Before a node runs, the graph resolves
//!
//! - its *output sets*: every set carrying all output tags, with the
//!   additional output tags applied (in shuffled order when requested);
//! - its *input sets*: every set carrying all input tags.
//!
//! A node that declares input tags but finds no matching set is skipped.
//! That is a normal outcome, not an error.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use evoflow::operator::{Evaluator, Graph, RandomInit};
//! use evoflow::prelude::*;
//!
//! let mut problem = Problem::new();
//! problem.append_function_auto(Arc::new(FnFunction::new("sq", 1, 2, |x| {
//!     vec![x[0] * x[0], (x[0] - 2.0).powi(2)]
//! })));
//! problem.process();
//!
//! let mut graph = Graph::new(Container::new(problem), Some(7));
//! let init = graph.add(RandomInit::new(8), None).unwrap();
//! let eval = graph.add(Evaluator::new(), Some(init)).unwrap();
//! graph.validate().unwrap();
//! graph.evaluate(eval).unwrap();
//!
//! let main = graph.container().set_with_tag(&Tag::MainOptimization).unwrap();
//! assert_eq!(graph.container().members(main).len(), 8);
//! assert_eq!(graph.container().used_budget(), 8);
//! ```

mod direction;
mod evaluator;
mod filtration;
mod fitness;
mod init;
mod moead;
mod reduce;
mod surrogate;
mod variation;

use core::any::Any;

pub use self::direction::SimplexLatticeDirectionIterator;
pub use self::evaluator::Evaluator;
pub use self::filtration::{
    DirectionFitnessFiltration, MergeForNextIteration, NeighbourhoodCriterion,
    NeighbourhoodFiltration, RandFiltrationForDirection, RandSetReplacement, SelectionMethod,
    TournamentFiltrationForDirection, TruncateSets,
};
pub use self::fitness::{
    ConstraintPenalty, GeneralizedDecomposition, NonDominanceRanking, Scalarization, WeightScope,
};
pub use self::init::{RandomInit, UserDefinedInit, WeightVectorInit};
pub use self::moead::MoeadNeighbourhoodUpdate;
pub use self::reduce::SmsEmoaReduce;
pub use self::surrogate::{ConstraintInfill, ErrorMethod, SurrogateBasedOptimizer};
pub use self::variation::{PolynomialMutation, SbxCrossover};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::set::{CandidateId, SetId};
use crate::tag::Tag;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Tags a node consumes and produces.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ports {
    /// A set is an input when it carries every one of these tags.
    pub inputs: Vec<Tag>,
    /// A set is an output when it carries every one of these tags. New
    /// output sets are created with them.
    pub outputs: Vec<Tag>,
    /// Tags added to every output set, existing or new.
    pub additional_outputs: Vec<Tag>,
    /// Visit output sets in random order.
    pub shuffle_outputs: bool,
}

impl Ports {
    /// Ports with the given input and output tags.
    #[must_use]
    pub fn new(inputs: Vec<Tag>, outputs: Vec<Tag>) -> Self {
        Self {
            inputs,
            outputs,
            additional_outputs: Vec::new(),
            shuffle_outputs: false,
        }
    }

    /// Add an input tag unless present.
    pub fn add_input(&mut self, tag: Tag) {
        if !self.inputs.contains(&tag) {
            self.inputs.push(tag);
        }
    }

    /// Add an output tag unless present.
    pub fn add_output(&mut self, tag: Tag) {
        if !self.outputs.contains(&tag) {
            self.outputs.push(tag);
        }
    }

    /// Add an additional output tag unless present.
    pub fn add_additional_output(&mut self, tag: Tag) {
        if !self.additional_outputs.contains(&tag) {
            self.additional_outputs.push(tag);
        }
    }

    /// Replace the input tags.
    pub fn define_inputs(&mut self, tags: Vec<Tag>) {
        self.inputs = tags;
    }

    /// Replace the output tags.
    pub fn define_outputs(&mut self, tags: Vec<Tag>) {
        self.outputs = tags;
    }

    /// Whether sets produced by this node carry `tag`.
    #[must_use]
    pub fn produces(&self, tag: &Tag) -> bool {
        self.outputs.contains(tag) || self.additional_outputs.contains(tag)
    }

    /// Every tag a new output set is created with.
    #[must_use]
    pub fn all_output_tags(&self) -> Vec<Tag> {
        let mut tags = self.outputs.clone();
        for t in &self.additional_outputs {
            if !tags.contains(t) {
                tags.push(t.clone());
            }
        }
        tags
    }
}

// ---------------------------------------------------------------------------
// Operator trait
// ---------------------------------------------------------------------------

/// A node of the operator graph.
///
/// Implementations transform the sets resolved in the [`Context`]. They must
/// not fail because input is missing; the graph already skips nodes whose
/// input tags match nothing.
pub trait Operator {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Declared tags.
    fn ports(&self) -> &Ports;

    /// Mutable access to the declared tags, for rewiring.
    fn ports_mut(&mut self) -> &mut Ports;

    /// Run the node once.
    ///
    /// # Errors
    ///
    /// Propagates errors from candidate creation, evaluation and the
    /// numerical routines.
    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()>;

    /// Upcast used by [`Graph::node_mut`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What a node sees while it runs.
pub struct Context<'a> {
    /// The shared store.
    pub container: &'a mut Container,
    /// The graph's random generator.
    pub rng: &'a mut fastrand::Rng,
    ports: Ports,
    inputs: Vec<SetId>,
    outputs: Vec<SetId>,
}

impl<'a> Context<'a> {
    /// Resolve `ports` against the container.
    ///
    /// Additional output tags are stamped on every resolved output set.
    pub fn resolve(container: &'a mut Container, rng: &'a mut fastrand::Rng, ports: Ports) -> Self {
        let mut outputs = if ports.outputs.is_empty() {
            Vec::new()
        } else {
            container.sets_with_tags(&ports.outputs)
        };
        for &id in &outputs {
            for tag in &ports.additional_outputs {
                container.tag_set(id, tag.clone());
            }
        }
        if ports.shuffle_outputs {
            rng.shuffle(&mut outputs);
        }
        let inputs = container.sets_with_tags(&ports.inputs);
        Self {
            container,
            rng,
            ports,
            inputs,
            outputs,
        }
    }

    /// Resolved input sets, in container order.
    #[must_use]
    pub fn inputs(&self) -> &[SetId] {
        &self.inputs
    }

    /// Resolved output sets, including those appended by this node.
    #[must_use]
    pub fn outputs(&self) -> &[SetId] {
        &self.outputs
    }

    /// The ports this context was resolved from.
    #[must_use]
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Members of input set `i`, or nothing if out of range.
    #[must_use]
    pub fn input_members(&self, i: usize) -> Vec<CandidateId> {
        self.inputs
            .get(i)
            .map(|&id| self.container.members(id))
            .unwrap_or_default()
    }

    /// Members of output set `i`, or nothing if out of range.
    #[must_use]
    pub fn output_members(&self, i: usize) -> Vec<CandidateId> {
        self.outputs
            .get(i)
            .map(|&id| self.container.members(id))
            .unwrap_or_default()
    }

    /// Members of every input set concatenated in order.
    #[must_use]
    pub fn input_union(&self) -> Vec<CandidateId> {
        self.inputs
            .iter()
            .flat_map(|&id| self.container.members(id))
            .collect()
    }

    /// Create an empty output set carrying every output tag.
    pub fn append_output_set(&mut self) -> SetId {
        self.append_output_set_with(Vec::new())
    }

    /// Create an output set holding `members`.
    pub fn append_output_set_with(&mut self, members: Vec<CandidateId>) -> SetId {
        let id = self
            .container
            .append_set_with(members, self.ports.all_output_tags());
        self.outputs.push(id);
        id
    }

    /// Remove every output set from the container.
    pub fn clear_output_sets(&mut self) {
        for id in self.outputs.drain(..) {
            self.container.remove_set(id);
        }
    }

    /// Store a copy of `id` and append it to `set`.
    pub fn clone_into(&mut self, id: CandidateId, set: SetId) -> CandidateId {
        let copy = self.container.clone_candidate(id);
        if let Some(s) = self.container.set_mut(set) {
            s.append(copy);
        }
        copy
    }

    /// The container's iteration counter.
    #[must_use]
    pub fn iteration(&self) -> usize {
        self.container.current_iteration()
    }
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// Handle to a node of a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in insertion order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

struct Node {
    op: Box<dyn Operator>,
    parent: Option<NodeId>,
    last_pass: Option<usize>,
}

/// A chain of operators sharing one container and one random generator.
///
/// Each node has at most one parent, which must be added before it, so the
/// graph is acyclic by construction.
pub struct Graph {
    container: Container,
    rng: fastrand::Rng,
    nodes: Vec<Node>,
    sources: Vec<Tag>,
}

impl Graph {
    /// An empty graph over `container`, seeded for reproducibility.
    #[must_use]
    pub fn new(container: Container, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self {
            container,
            rng,
            nodes: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Add a node downstream of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] if `parent` is not in this graph.
    pub fn add<O: Operator + 'static>(&mut self, op: O, parent: Option<NodeId>) -> Result<NodeId> {
        if let Some(p) = parent
            && p.0 >= self.nodes.len()
        {
            return Err(Error::UnknownNode(p.0));
        }
        self.nodes.push(Node {
            op: Box::new(op),
            parent,
            last_pass: None,
        });
        Ok(NodeId(self.nodes.len() - 1))
    }

    /// Declare that sets tagged `tag` are supplied from outside the graph.
    pub fn declare_source(&mut self, tag: Tag) {
        if !self.sources.contains(&tag) {
            self.sources.push(tag);
        }
    }

    /// Check that every input tag can be satisfied.
    ///
    /// A tag is bound when some node produces it, it was declared with
    /// [`declare_source`](Self::declare_source), or a set in the container
    /// already carries it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundPort`] for the first unbound input tag.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            for tag in &node.op.ports().inputs {
                let bound = self.sources.contains(tag)
                    || self.container.has_tag(tag)
                    || self.nodes.iter().any(|n| n.op.ports().produces(tag));
                if !bound {
                    return Err(Error::UnboundPort {
                        node: node.op.name(),
                        tag: tag.to_string(),
                    });
                }
            }
        }
        trace_debug!(nodes = self.nodes.len(), "graph validated");
        Ok(())
    }

    /// Evaluate `node` after its ancestors, root first.
    ///
    /// Nodes already evaluated during the current iteration are not run
    /// again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownNode`] for a foreign handle, or the first
    /// error raised by a node.
    pub fn evaluate(&mut self, node: NodeId) -> Result<()> {
        if node.0 >= self.nodes.len() {
            return Err(Error::UnknownNode(node.0));
        }
        let mut chain = vec![node];
        let mut current = node;
        while let Some(p) = self.nodes[current.0].parent {
            chain.push(p);
            current = p;
        }
        let pass = self.container.current_iteration();
        for id in chain.into_iter().rev() {
            if self.nodes[id.0].last_pass != Some(pass) {
                self.run_node(id.0)?;
            }
        }
        Ok(())
    }

    /// Evaluate `node` alone, even if it already ran this iteration.
    ///
    /// # Errors
    ///
    /// As [`evaluate`](Self::evaluate).
    pub fn evaluate_only(&mut self, node: NodeId) -> Result<()> {
        if node.0 >= self.nodes.len() {
            return Err(Error::UnknownNode(node.0));
        }
        self.run_node(node.0)
    }

    fn run_node(&mut self, idx: usize) -> Result<()> {
        let pass = self.container.current_iteration();
        let node = &mut self.nodes[idx];
        node.last_pass = Some(pass);
        let ports = node.op.ports().clone();
        if !ports.inputs.is_empty() && self.container.sets_with_tags(&ports.inputs).is_empty() {
            trace_debug!(node = node.op.name(), iteration = pass, "node skipped: no input");
            return Ok(());
        }
        let mut ctx = Context::resolve(&mut self.container, &mut self.rng, ports);
        node.op.evaluate_node(&mut ctx)?;
        trace_debug!(node = node.op.name(), iteration = pass, "node evaluated");
        Ok(())
    }

    /// Advance the iteration counter, opening a new evaluation pass.
    pub fn increment_iteration(&mut self) {
        self.container.increment_iteration();
    }

    /// The iteration counter.
    #[must_use]
    pub fn current_iteration(&self) -> usize {
        self.container.current_iteration()
    }

    /// Evaluations left, or `None` when unlimited.
    #[must_use]
    pub fn remaining_budget(&self) -> Option<usize> {
        self.container.remaining_budget()
    }

    /// Downcast node `id` to its concrete type.
    pub fn node_mut<T: Operator + 'static>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes
            .get_mut(id.0)
            .and_then(|n| n.op.as_any_mut().downcast_mut::<T>())
    }

    /// Mutable ports of node `id`.
    pub fn ports_mut(&mut self, id: NodeId) -> Option<&mut Ports> {
        self.nodes.get_mut(id.0).map(|n| n.op.ports_mut())
    }

    /// Name of node `id`.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<&'static str> {
        self.nodes.get(id.0).map(|n| n.op.name())
    }

    /// Parent of node `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The shared container.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Mutable access to the shared container.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    /// The graph's random generator.
    pub fn rng_mut(&mut self) -> &mut fastrand::Rng {
        &mut self.rng
    }

    /// Give up the graph and keep the container.
    #[must_use]
    pub fn into_container(self) -> Container {
        self.container
    }
}

impl core::fmt::Debug for Graph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Graph")
            .field(
                "nodes",
                &self.nodes.iter().map(|n| n.op.name()).collect::<Vec<_>>(),
            )
            .field("sources", &self.sources)
            .field("iteration", &self.container.current_iteration())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Bernoulli trial that short-circuits at 0 and 1.
pub(crate) fn happens(rng: &mut fastrand::Rng, probability: f64) -> bool {
    if probability >= 1.0 {
        true
    } else if probability <= 0.0 {
        false
    } else {
        probability > rng.f64()
    }
}

/// Indices of `values` in ascending order. Ties keep their relative order.
pub(crate) fn ascending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    order
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::container::Container;
    use crate::element::PropertiesFactory;
    use crate::problem::{FnFunction, FunctionMap, Problem};
    use crate::types::ElementType;

    /// Two-variable, two-objective problem on `[0, 1]^2`.
    pub(crate) fn container() -> Container {
        let mut p = Problem::new();
        p.append_function_auto(Arc::new(FnFunction::new("lin", 2, 2, |x| {
            vec![x[0], 1.0 - x[0] + x[1]]
        })));
        p.process();
        Container::new(p)
    }

    /// Same objectives as [`container`] plus `x0 + x1 <= 1`.
    pub(crate) fn constrained_container() -> Container {
        let mut p = Problem::new();
        for name in ["x0", "x1"] {
            p.append_decision_variable(PropertiesFactory::create(name, ElementType::Real), 0.0, 1.0);
        }
        for name in ["f0", "f1"] {
            p.append_objective(PropertiesFactory::create(name, ElementType::Real));
        }
        p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 1.0);
        let map = FunctionMap::new(2, 3)
            .decision(0, 0)
            .decision(1, 1)
            .objective(0, 0)
            .objective(1, 1)
            .constraint(2, 0);
        p.append_function(
            Arc::new(FnFunction::new("lin_g", 2, 3, |x| {
                vec![x[0], 1.0 - x[0] + x[1], x[0] + x[1]]
            })),
            map,
        );
        p.process();
        Container::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        ports: Ports,
        runs: usize,
    }

    impl Recorder {
        fn new(inputs: Vec<Tag>, outputs: Vec<Tag>) -> Self {
            Self {
                ports: Ports::new(inputs, outputs),
                runs: 0,
            }
        }
    }

    impl Operator for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }
        fn ports(&self) -> &Ports {
            &self.ports
        }
        fn ports_mut(&mut self) -> &mut Ports {
            &mut self.ports
        }
        fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
            self.runs += 1;
            if ctx.outputs().is_empty() {
                ctx.append_output_set();
            }
            Ok(())
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_ancestors_run_once_per_pass() {
        let mut g = Graph::new(test_support::container(), Some(1));
        let a = g.add(Recorder::new(vec![], vec![Tag::custom("a")]), None).unwrap();
        let b = g
            .add(Recorder::new(vec![Tag::custom("a")], vec![Tag::custom("b")]), Some(a))
            .unwrap();
        g.evaluate(b).unwrap();
        g.evaluate(b).unwrap();
        assert_eq!(g.node_mut::<Recorder>(a).unwrap().runs, 1);
        assert_eq!(g.node_mut::<Recorder>(b).unwrap().runs, 1);
        g.evaluate_only(b).unwrap();
        assert_eq!(g.node_mut::<Recorder>(b).unwrap().runs, 2);
        g.increment_iteration();
        g.evaluate(b).unwrap();
        assert_eq!(g.node_mut::<Recorder>(a).unwrap().runs, 2);
    }

    #[test]
    fn test_skip_without_input() {
        let mut g = Graph::new(test_support::container(), Some(1));
        let n = g
            .add(Recorder::new(vec![Tag::custom("missing")], vec![Tag::custom("out")]), None)
            .unwrap();
        g.evaluate(n).unwrap();
        assert_eq!(g.node_mut::<Recorder>(n).unwrap().runs, 0);
        assert_eq!(g.container().n_sets(), 0);
    }

    #[test]
    fn test_validate_reports_unbound_port() {
        let mut g = Graph::new(test_support::container(), None);
        g.add(Recorder::new(vec![Tag::custom("x")], vec![]), None).unwrap();
        assert!(matches!(g.validate(), Err(Error::UnboundPort { node: "recorder", .. })));
        g.declare_source(Tag::custom("x"));
        assert!(g.validate().is_ok());
    }

    #[test]
    fn test_unknown_parent() {
        let mut g = Graph::new(test_support::container(), None);
        let r = g.add(Recorder::new(vec![], vec![]), Some(NodeId(3)));
        assert!(matches!(r, Err(Error::UnknownNode(3))));
    }

    #[test]
    fn test_additional_tags_applied_to_existing_outputs() {
        let mut c = test_support::container();
        let s = c.append_set(vec![Tag::MainOptimization]);
        let mut rng = fastrand::Rng::with_seed(0);
        let mut ports = Ports::new(vec![], vec![Tag::MainOptimization]);
        ports.add_additional_output(Tag::Fitness);
        let mut ctx = Context::resolve(&mut c, &mut rng, ports);
        assert_eq!(ctx.outputs(), &[s]);
        let fresh = ctx.append_output_set();
        assert!(ctx.container.set(fresh).unwrap().has_tag(&Tag::Fitness));
        assert!(c.set(s).unwrap().has_tag(&Tag::Fitness));
    }

    #[test]
    fn test_happens_extremes() {
        let mut rng = fastrand::Rng::with_seed(2);
        assert!(happens(&mut rng, 1.0));
        assert!(!happens(&mut rng, 0.0));
        assert_eq!(ascending_order(&[3.0, 1.0, 2.0, 1.0]), vec![1, 3, 2, 0]);
    }
}
