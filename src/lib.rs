#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Multi-objective evolutionary optimization built as a dataflow graph of
//! operators. Candidates live in one [`Container`]; operators exchange them
//! through tagged sets; algorithms such as MOEA/D, ParEGO and SMS-EMOA are
//! just particular chains of operators.
//!
//! # Getting Started
//!
//! ```
//! use std::sync::Arc;
//! use evoflow::algorithm::MoeadBuilder;
//! use evoflow::prelude::*;
//!
//! // Schaffer's two-objective problem on one variable in [0, 1].
//! let mut problem = Problem::new();
//! problem.append_function_auto(Arc::new(FnFunction::new("sch", 1, 2, |x| {
//!     vec![x[0] * x[0], (x[0] - 1.0).powi(2)]
//! })));
//! assert_eq!(problem.process(), ProblemStatus::FullyDefined);
//!
//! let mut moead = MoeadBuilder::new(problem)
//!     .population_size(11)
//!     .budget(110)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//! moead.run().unwrap();
//!
//! for id in moead.pareto_front() {
//!     let c = moead.container().candidate(id);
//!     println!("{:?} -> {:?}", c.decision_values(), c.objectives());
//! }
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Element`] | A typed scalar: real, integer, ordinal or nominal. |
//! | [`Problem`] | Decision variables, objectives, constraints and the functions that compute them. |
//! | [`Candidate`] | One solution: decisions plus evaluated outputs, cost and weights. |
//! | [`Container`] | Arena of candidates, tagged sets, reference points, archive and budget. |
//! | [`Operator`](operator::Operator) | A graph node transforming tagged sets. |
//! | [`Graph`](operator::Graph) | A chain of operators sharing one container and one RNG. |
//! | [`Algorithm`](algorithm::Algorithm) | A pre-wired graph with a run loop. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on value types and [`ProblemRecord`] | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key points of a run | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Tolerance used for float comparisons throughout the crate.
pub const EPSILON: f64 = 1e-6;

pub mod algorithm;
pub mod candidate;
pub mod container;
pub mod distribution;
pub mod element;
mod error;
pub mod kde;
pub mod normalisation;
pub mod operator;
pub mod pareto;
pub mod problem;
mod rng_util;
pub mod scalarizing;
pub mod set;
pub mod simplex_lattice;
pub mod surrogate;
pub mod tag;
mod types;

pub use candidate::Candidate;
pub use container::{ArchiveUpdate, Container};
pub use element::{Element, ElementProperties, PropertiesFactory};
pub use error::{Error, Result};
pub use problem::{
    BoxConstraints, FnFunction, Function, FunctionMap, Problem, ProblemRecord, ProblemStatus,
};
pub use set::{CandidateId, CandidateSet, SetId};
pub use tag::Tag;
pub use types::{Direction, ElementType, Tribool};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use evoflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algorithm::{Algorithm, MoeadBuilder, ParEgoBuilder, SmsEmoaBuilder};
    pub use crate::candidate::Candidate;
    pub use crate::container::{ArchiveUpdate, Container};
    pub use crate::element::{Element, ElementProperties, PropertiesFactory};
    pub use crate::error::{Error, Result};
    pub use crate::operator::{Graph, NodeId, Operator, Ports};
    pub use crate::problem::{FnFunction, Function, FunctionMap, Problem, ProblemStatus};
    pub use crate::scalarizing::ScalarisingFunction;
    pub use crate::set::{CandidateId, SetId};
    pub use crate::tag::Tag;
    pub use crate::types::{Direction, ElementType, Tribool};
}
