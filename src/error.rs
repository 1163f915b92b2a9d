use crate::problem::ProblemStatus;
use crate::types::ElementType;

/// Errors raised by scalar arithmetic, problem wiring, graph assembly and
/// the numerical routines.
///
/// Structural absences (a node with no input, two candidates that cannot be
/// compared) are not errors and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when an element is divided by a zero-valued element.
    #[error("division by zero")]
    DivisionByZero,

    /// Returned when an operation is not defined for an element type.
    #[error("invalid operation '{op}' for element type {element_type:?}")]
    InvalidOperation {
        /// The offending operation.
        op: &'static str,
        /// The type that rejected the operation.
        element_type: ElementType,
    },

    /// Returned when two vectors that must agree in length do not.
    #[error("dimension mismatch: expected {expected} but got {got}")]
    DimensionMismatch {
        /// The expected length.
        expected: usize,
        /// The actual length.
        got: usize,
    },

    /// Returned when a problem is used before `process` reports it fully defined.
    #[error("problem is not fully defined: {0:?}")]
    ProblemNotReady(ProblemStatus),

    /// Returned when a lower bound exceeds its upper bound.
    #[error("invalid bounds for variable {index}: low ({low}) must not exceed high ({high})")]
    InvalidBounds {
        /// The decision variable index.
        index: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a problem record names a function the resolver does not know.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Returned when a node consumes a tag that nothing in the graph produces.
    #[error("node '{node}' consumes tag '{tag}' but no node or set provides it")]
    UnboundPort {
        /// The name of the consuming node.
        node: &'static str,
        /// The unbound tag.
        tag: String,
    },

    /// Returned when a node id does not belong to the graph.
    #[error("unknown node {0}")]
    UnknownNode(usize),

    /// Returned when a density estimate or model is built from no samples.
    #[error("at least one sample is required")]
    EmptySamples,

    /// Returned when a kernel bandwidth is not positive.
    #[error("invalid bandwidth: {0} must be positive")]
    InvalidBandwidth(f64),

    /// Returned when a kriging system cannot be solved.
    #[error("interpolation system is singular")]
    SingularSystem,

    /// Returned when a setter receives a value outside its domain.
    #[error("invalid value for '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

/// A convenience alias for `core::result::Result<T, evoflow::Error>`.
pub type Result<T> = core::result::Result<T, Error>;
