use core::fmt;

/// Role of a candidate set inside the operator graph.
///
/// Nodes declare the tags they consume and produce; a set matches a node's
/// input when it carries every declared input tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// The population carried across iterations.
    MainOptimization,
    /// Members awaiting evaluation on the true functions.
    ForEvaluation,
    /// Members eligible for selection.
    ForSelection,
    /// Members whose decision vectors may be changed.
    ForModification,
    /// Sets merged into the next population.
    ForNextIteration,
    /// Sets produced per search direction.
    ForDirection,
    /// Sets passed to mutation.
    ForPerturbation,
    /// Members whose fitness must be (re)computed.
    Fitness,
    /// Neighbourhoods consumed by the decomposition update.
    ForMoeadUpdate,
    /// Ranked fronts waiting to be reduced.
    ForReducePopulation,
    /// Sets truncated to a fixed size.
    ForResize,
    /// Members whose neighbourhoods are built.
    ForNeighbourhoods,
    /// Neighbourhoods eligible for whole-population replacement.
    ForSetReplacement,
    /// Neighbourhoods built around each member.
    Neighbourhoods,
    /// Training data selected for a surrogate model.
    Filtration,
    /// Candidates created during the current iteration.
    NewSolutions,
    /// A user-defined role.
    Custom(String),
}

impl Tag {
    /// Shorthand for a custom tag.
    #[must_use]
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(name) => f.write_str(name),
            other => write!(f, "{other:?}"),
        }
    }
}
