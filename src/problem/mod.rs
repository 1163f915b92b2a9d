//! Problem definition: what is optimized and how it is computed.
//!
//! A [`Problem`] declares decision variables, parameters, objectives,
//! constraints and unused outputs, bounds the decision space with
//! [`BoxConstraints`], and wires computational [`Function`]s to those
//! vectors through [`FunctionMap`]s. Optional uncertainty mappings and
//! preference vectors (goals, priorities, thresholds) complete the
//! definition.
//!
//! Correctness is tracked by a [`ProblemStatus`] rather than by errors.
//! Every mutation resets the status to
//! [`UnprocessedChanges`](ProblemStatus::UnprocessedChanges); only
//! [`Problem::process`] re-validates. Candidates can only be created from a
//! [`FullyDefined`](ProblemStatus::FullyDefined) problem.
//!
//! ```
//! use std::sync::Arc;
//! use evoflow::problem::{FnFunction, Problem, ProblemStatus};
//!
//! let mut problem = Problem::new();
//! assert_eq!(problem.status(), ProblemStatus::Undefined);
//!
//! let f = FnFunction::new("sq", 1, 1, |x| vec![x[0] * x[0]]);
//! problem.append_function_auto(Arc::new(f));
//! assert_eq!(problem.status(), ProblemStatus::UnprocessedChanges);
//! assert_eq!(problem.process(), ProblemStatus::FullyDefined);
//! ```

mod function;
mod record;

use core::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use self::function::{FnFunction, Function, FunctionMap};
pub use self::record::{FunctionRecord, ProblemRecord, PropertiesRecord};
use crate::distribution::UncertaintyMapping;
use crate::element::{Element, ElementProperties, PropertiesFactory};
use crate::error::{Error, Result};
use crate::types::{Direction, ElementType};

/// Definition status of a [`Problem`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProblemStatus {
    /// Nothing has been declared yet.
    Undefined,
    /// Something changed since the last [`Problem::process`].
    UnprocessedChanges,
    /// The problem can be used to create and evaluate candidates.
    FullyDefined,
    /// No decision variables.
    IllDefinedDVecProperties,
    /// No objectives.
    IllDefinedOVecProperties,
    /// No functions, or an input/output that is unmapped or doubly mapped.
    IllDefinedFunctionVec,
    /// A decision map entry is out of range or a variable feeds nothing.
    IllDefinedDVecMaps,
    /// A parameter map entry is out of range.
    IllDefinedPVecMaps,
    /// An objective map entry is out of range or an objective is never produced.
    IllDefinedOVecMaps,
    /// A constraint map entry is out of range or a constraint is never produced.
    IllDefinedCVecMaps,
    /// An unused map entry is out of range or an unused slot is never produced.
    IllDefinedUVecMaps,
    /// Bounds missing, mis-sized or inverted.
    IllDefinedBoxConstraints,
    /// Ideal vector length differs from the objective count.
    IllDefinedIdealVec,
    /// Anti-ideal vector length differs from the objective count.
    IllDefinedAntiIdealVec,
    /// Nadir vector length differs from the objective count.
    IllDefinedNadirVec,
    /// Goal vector length differs from the objective count.
    IllDefinedGoalVec,
    /// Priority vector length differs from the objective count.
    IllDefinedPriorityVec,
    /// Threshold vector length differs from the constraint count.
    IllDefinedThresholdVec,
    /// A decision variable uncertainty mapping is mis-sized or ill formed.
    IllDefinedUncertainty,
    /// A function output uncertainty mapping is mis-sized or ill formed.
    IllDefinedFuncOutUncertainty,
    /// Parameter values do not match the parameter declarations.
    IllDefinedParameterVec,
}

// ---------------------------------------------------------------------------
// Box constraints
// ---------------------------------------------------------------------------

/// Lower and upper bound per decision variable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoxConstraints {
    lower: Vec<Element>,
    upper: Vec<Element>,
}

impl BoxConstraints {
    /// Empty bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bounds for one more variable.
    pub fn push(&mut self, lower: Element, upper: Element) {
        self.lower.push(lower);
        self.upper.push(upper);
    }

    /// Number of bounded variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether no bounds are defined.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Lower bound of variable `i`.
    #[must_use]
    pub fn lower_bound(&self, i: usize) -> &Element {
        &self.lower[i]
    }

    /// Upper bound of variable `i`.
    #[must_use]
    pub fn upper_bound(&self, i: usize) -> &Element {
        &self.upper[i]
    }

    /// All lower bounds as plain values.
    #[must_use]
    pub fn lower_values(&self) -> Vec<f64> {
        self.lower.iter().map(Element::value).collect()
    }

    /// All upper bounds as plain values.
    #[must_use]
    pub fn upper_values(&self) -> Vec<f64> {
        self.upper.iter().map(Element::value).collect()
    }

    /// Replace the bounds of variable `i`.
    pub fn define_bounds(&mut self, i: usize, lower: Element, upper: Element) {
        self.lower[i] = lower;
        self.upper[i] = upper;
    }

    /// Whether both bound vectors agree in length and every `low <= high`.
    #[must_use]
    pub fn is_well_defined(&self) -> bool {
        self.lower.len() == self.upper.len()
            && self
                .lower
                .iter()
                .zip(&self.upper)
                .all(|(l, u)| l.value() <= u.value())
    }

    /// Truncate `value` into the bounds of variable `i`.
    #[must_use]
    pub fn clamp(&self, i: usize, value: f64) -> f64 {
        value.clamp(self.lower[i].value(), self.upper[i].value())
    }

    /// Reflect `value` back into the bounds of variable `i`.
    ///
    /// A value below the lower bound is mirrored around it (and likewise
    /// above the upper bound); anything still outside is then truncated.
    #[must_use]
    pub fn reflect(&self, i: usize, value: f64) -> f64 {
        let low = self.lower[i].value();
        let high = self.upper[i].value();
        if high <= low {
            return low;
        }
        let mirrored = if value < low {
            low + (low - value)
        } else if value > high {
            high - (value - high)
        } else {
            value
        };
        mirrored.clamp(low, high)
    }

    /// Midpoint of variable `i`, rounded for integral types.
    #[must_use]
    pub fn midpoint(&self, i: usize, element_type: ElementType) -> Element {
        let mid = 0.5 * (self.lower[i].value() + self.upper[i].value());
        Element::new(element_type, mid)
    }

    /// Whether the bounds of variable `i` enclose at least one integer.
    #[must_use]
    pub fn holds_integer(&self, i: usize) -> bool {
        self.lower[i].value().ceil() <= self.upper[i].value().floor()
    }

    /// A uniform random value for variable `i`. Integral types draw from
    /// the inclusive integer range; a box without an integer yields the
    /// integer nearest its midpoint.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn random_value(&self, i: usize, element_type: ElementType, rng: &mut fastrand::Rng) -> f64 {
        let low = self.lower[i].value();
        let high = self.upper[i].value();
        if element_type.is_integral() {
            if !self.holds_integer(i) {
                return (0.5 * (low + high)).round();
            }
            let lo = low.ceil() as i64;
            let hi = high.floor() as i64;
            rng.i64(lo..=hi) as f64
        } else {
            crate::rng_util::f64_range(rng, low, high)
        }
    }
}

// ---------------------------------------------------------------------------
// Function wiring
// ---------------------------------------------------------------------------

/// One function together with its wiring.
#[derive(Clone)]
pub struct FunctionEntry {
    function: Arc<dyn Function>,
    map: FunctionMap,
    output_uncertainty: Vec<Option<UncertaintyMapping>>,
}

impl FunctionEntry {
    /// The wired function.
    #[must_use]
    pub fn function(&self) -> &Arc<dyn Function> {
        &self.function
    }

    /// Its input/output maps.
    #[must_use]
    pub fn map(&self) -> &FunctionMap {
        &self.map
    }

    /// Uncertainty applied to each output after evaluation.
    #[must_use]
    pub fn output_uncertainty(&self) -> &[Option<UncertaintyMapping>] {
        &self.output_uncertainty
    }
}

impl fmt::Debug for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionEntry")
            .field("function", &self.function.name())
            .field("map", &self.map)
            .field("output_uncertainty", &self.output_uncertainty)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Problem
// ---------------------------------------------------------------------------

/// A complete optimization problem definition.
#[derive(Clone, Debug)]
pub struct Problem {
    decisions: Vec<ElementProperties>,
    parameters: Vec<ElementProperties>,
    objectives: Vec<ElementProperties>,
    constraints: Vec<ElementProperties>,
    unused: Vec<ElementProperties>,
    parameter_values: Vec<Element>,
    bounds: BoxConstraints,
    functions: Vec<FunctionEntry>,
    decision_uncertainty: Vec<Option<UncertaintyMapping>>,
    goals: Vec<Option<f64>>,
    priorities: Vec<f64>,
    thresholds: Vec<f64>,
    essential: Vec<bool>,
    ideal: Option<Vec<f64>>,
    anti_ideal: Option<Vec<f64>>,
    nadir: Option<Vec<f64>>,
    status: ProblemStatus,
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

impl Problem {
    /// An empty, [`Undefined`](ProblemStatus::Undefined) problem.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decisions: Vec::new(),
            parameters: Vec::new(),
            objectives: Vec::new(),
            constraints: Vec::new(),
            unused: Vec::new(),
            parameter_values: Vec::new(),
            bounds: BoxConstraints::new(),
            functions: Vec::new(),
            decision_uncertainty: Vec::new(),
            goals: Vec::new(),
            priorities: Vec::new(),
            thresholds: Vec::new(),
            essential: Vec::new(),
            ideal: None,
            anti_ideal: None,
            nadir: None,
            status: ProblemStatus::Undefined,
        }
    }

    fn touch(&mut self) {
        self.status = ProblemStatus::UnprocessedChanges;
    }

    /// The status computed by the last [`process`](Self::process) call, or
    /// `UnprocessedChanges` if the problem changed since.
    #[must_use]
    pub fn status(&self) -> ProblemStatus {
        self.status
    }

    /// Shorthand for `status() == FullyDefined`.
    #[must_use]
    pub fn is_fully_defined(&self) -> bool {
        self.status == ProblemStatus::FullyDefined
    }

    /// Fail with [`Error::ProblemNotReady`] unless fully defined.
    ///
    /// # Errors
    ///
    /// Returns the current status wrapped in [`Error::ProblemNotReady`].
    pub fn ensure_fully_defined(&self) -> Result<()> {
        if self.is_fully_defined() {
            Ok(())
        } else {
            Err(Error::ProblemNotReady(self.status))
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Declare a decision variable with bounds. Returns its index.
    pub fn append_decision_variable(&mut self, props: ElementProperties, low: f64, high: f64) -> usize {
        let idx = self.decisions.len();
        let ty = props.element_type();
        self.decisions.push(props.reindexed(idx));
        self.bounds.push(Element::new(ty, low), Element::new(ty, high));
        self.decision_uncertainty.push(None);
        self.touch();
        idx
    }

    /// Declare a parameter with its value. Returns its index.
    pub fn append_parameter(&mut self, props: ElementProperties, value: f64) -> usize {
        let idx = self.parameters.len();
        self.parameter_values.push(Element::new(props.element_type(), value));
        self.parameters.push(props.reindexed(idx));
        self.touch();
        idx
    }

    /// Declare an objective. Returns its index.
    pub fn append_objective(&mut self, props: ElementProperties) -> usize {
        let idx = self.objectives.len();
        self.objectives.push(props.reindexed(idx));
        self.goals.push(None);
        self.priorities.push(1.0);
        self.essential.push(true);
        self.touch();
        idx
    }

    /// Declare a constraint satisfied while its value is `<= threshold`.
    pub fn append_constraint(&mut self, props: ElementProperties, threshold: f64) -> usize {
        let idx = self.constraints.len();
        self.constraints.push(props.reindexed(idx));
        self.thresholds.push(threshold);
        self.touch();
        idx
    }

    /// Declare an output that is recorded but not optimized.
    pub fn append_unused(&mut self, props: ElementProperties) -> usize {
        let idx = self.unused.len();
        self.unused.push(props.reindexed(idx));
        self.touch();
        idx
    }

    /// Wire a function with an explicit map. Returns its index.
    pub fn append_function(&mut self, function: Arc<dyn Function>, map: FunctionMap) -> usize {
        let idx = self.functions.len();
        let n_out = function.n_outputs();
        self.functions.push(FunctionEntry {
            function,
            map,
            output_uncertainty: vec![None; n_out],
        });
        self.touch();
        idx
    }

    /// Wire a function by declaring a fresh real decision variable in
    /// `[0, 1]` for every input and a fresh objective for every output.
    pub fn append_function_auto(&mut self, function: Arc<dyn Function>) -> usize {
        let name = function.name().to_string();
        let n_in = function.n_inputs();
        let n_out = function.n_outputs();
        let directions = function.output_directions();
        let mut map = FunctionMap::new(n_in, n_out);
        for i in 0..n_in {
            let props = PropertiesFactory::builder(format!("{name}_x{i}")).build();
            let var = self.append_decision_variable(props, 0.0, 1.0);
            map = map.decision(i, var);
        }
        for o in 0..n_out {
            let direction = directions.get(o).copied().unwrap_or_default();
            let props = PropertiesFactory::builder(format!("{name}_f{o}"))
                .direction(direction)
                .build();
            let obj = self.append_objective(props);
            map = map.objective(o, obj);
        }
        self.append_function(function, map)
    }

    /// Replace all bounds.
    pub fn define_box_constraints(&mut self, bounds: BoxConstraints) {
        self.bounds = bounds;
        self.touch();
    }

    /// Replace the bounds of decision variable `i`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if `low > high`, or
    /// [`Error::DimensionMismatch`] if `i` is not a declared variable.
    pub fn define_bounds(&mut self, i: usize, low: f64, high: f64) -> Result<()> {
        if low > high {
            return Err(Error::InvalidBounds { index: i, low, high });
        }
        let Some(props) = self.decisions.get(i) else {
            return Err(Error::DimensionMismatch {
                expected: self.decisions.len(),
                got: i + 1,
            });
        };
        let ty = props.element_type();
        if i >= self.bounds.len() {
            return Err(Error::DimensionMismatch {
                expected: self.decisions.len(),
                got: self.bounds.len(),
            });
        }
        self.bounds.define_bounds(i, Element::new(ty, low), Element::new(ty, high));
        self.touch();
        Ok(())
    }

    /// Attach or clear the uncertainty of decision variable `i`.
    pub fn define_decision_uncertainty(&mut self, i: usize, mapping: Option<UncertaintyMapping>) {
        if i >= self.decision_uncertainty.len() {
            self.decision_uncertainty.resize(i + 1, None);
        }
        self.decision_uncertainty[i] = mapping;
        self.touch();
    }

    /// Attach or clear the uncertainty of one function output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `function` is not wired.
    pub fn define_output_uncertainty(
        &mut self,
        function: usize,
        output: usize,
        mapping: Option<UncertaintyMapping>,
    ) -> Result<()> {
        let n = self.functions.len();
        let entry = self.functions.get_mut(function).ok_or(Error::DimensionMismatch {
            expected: n,
            got: function + 1,
        })?;
        if output >= entry.output_uncertainty.len() {
            entry.output_uncertainty.resize(output + 1, None);
        }
        entry.output_uncertainty[output] = mapping;
        self.touch();
        Ok(())
    }

    /// Replace the goal vector (`None` = no goal for that objective).
    pub fn define_goals(&mut self, goals: Vec<Option<f64>>) {
        self.goals = goals;
        self.touch();
    }

    /// Replace the priority vector.
    pub fn define_priorities(&mut self, priorities: Vec<f64>) {
        self.priorities = priorities;
        self.touch();
    }

    /// Replace the constraint thresholds.
    pub fn define_thresholds(&mut self, thresholds: Vec<f64>) {
        self.thresholds = thresholds;
        self.touch();
    }

    /// Flag objectives as essential or reducible.
    pub fn define_essential(&mut self, essential: Vec<bool>) {
        self.essential = essential;
        self.touch();
    }

    /// Replace parameter values.
    pub fn define_parameter_values(&mut self, values: Vec<Element>) {
        self.parameter_values = values;
        self.touch();
    }

    /// Provide a known ideal vector.
    pub fn define_ideal(&mut self, ideal: Option<Vec<f64>>) {
        self.ideal = ideal;
        self.touch();
    }

    /// Provide a known anti-ideal vector.
    pub fn define_anti_ideal(&mut self, anti_ideal: Option<Vec<f64>>) {
        self.anti_ideal = anti_ideal;
        self.touch();
    }

    /// Provide a known nadir vector.
    pub fn define_nadir(&mut self, nadir: Option<Vec<f64>>) {
        self.nadir = nadir;
        self.touch();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Decision variable declarations.
    #[must_use]
    pub fn decision_properties(&self) -> &[ElementProperties] {
        &self.decisions
    }

    /// Parameter declarations.
    #[must_use]
    pub fn parameter_properties(&self) -> &[ElementProperties] {
        &self.parameters
    }

    /// Objective declarations.
    #[must_use]
    pub fn objective_properties(&self) -> &[ElementProperties] {
        &self.objectives
    }

    /// Constraint declarations.
    #[must_use]
    pub fn constraint_properties(&self) -> &[ElementProperties] {
        &self.constraints
    }

    /// Unused output declarations.
    #[must_use]
    pub fn unused_properties(&self) -> &[ElementProperties] {
        &self.unused
    }

    /// Parameter values.
    #[must_use]
    pub fn parameter_values(&self) -> &[Element] {
        &self.parameter_values
    }

    /// Decision space bounds.
    #[must_use]
    pub fn box_constraints(&self) -> &BoxConstraints {
        &self.bounds
    }

    /// Wired functions.
    #[must_use]
    pub fn functions(&self) -> &[FunctionEntry] {
        &self.functions
    }

    /// Uncertainty of each decision variable.
    #[must_use]
    pub fn decision_uncertainty(&self) -> &[Option<UncertaintyMapping>] {
        &self.decision_uncertainty
    }

    /// Goal per objective.
    #[must_use]
    pub fn goals(&self) -> &[Option<f64>] {
        &self.goals
    }

    /// Priority per objective.
    #[must_use]
    pub fn priorities(&self) -> &[f64] {
        &self.priorities
    }

    /// Threshold per constraint.
    #[must_use]
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Essential flag per objective.
    #[must_use]
    pub fn essential(&self) -> &[bool] {
        &self.essential
    }

    /// Known ideal vector.
    #[must_use]
    pub fn ideal(&self) -> Option<&[f64]> {
        self.ideal.as_deref()
    }

    /// Known anti-ideal vector.
    #[must_use]
    pub fn anti_ideal(&self) -> Option<&[f64]> {
        self.anti_ideal.as_deref()
    }

    /// Known nadir vector.
    #[must_use]
    pub fn nadir(&self) -> Option<&[f64]> {
        self.nadir.as_deref()
    }

    /// Number of decision variables.
    #[must_use]
    pub fn n_decisions(&self) -> usize {
        self.decisions.len()
    }

    /// Number of objectives.
    #[must_use]
    pub fn n_objectives(&self) -> usize {
        self.objectives.len()
    }

    /// Number of constraints.
    #[must_use]
    pub fn n_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Number of unused outputs.
    #[must_use]
    pub fn n_unused(&self) -> usize {
        self.unused.len()
    }

    /// Direction of each objective.
    #[must_use]
    pub fn objective_directions(&self) -> Vec<Direction> {
        self.objectives.iter().map(ElementProperties::direction).collect()
    }

    /// Type of each decision variable.
    #[must_use]
    pub fn decision_types(&self) -> Vec<ElementType> {
        self.decisions.iter().map(ElementProperties::element_type).collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Re-validate the definition and store the resulting status.
    ///
    /// Checks run in a fixed order and the first failure wins.
    pub fn process(&mut self) -> ProblemStatus {
        self.status = self.check();
        trace_info!(status = ?self.status, "problem processed");
        self.status
    }

    fn check(&self) -> ProblemStatus {
        if self.decisions.is_empty() {
            return ProblemStatus::IllDefinedDVecProperties;
        }
        if self.objectives.is_empty() {
            return ProblemStatus::IllDefinedOVecProperties;
        }
        if let Some(status) = self.check_functions() {
            return status;
        }
        if self.bounds.len() != self.decisions.len() || !self.bounds.is_well_defined() {
            return ProblemStatus::IllDefinedBoxConstraints;
        }
        let empty_integral = self
            .decisions
            .iter()
            .enumerate()
            .any(|(i, d)| d.element_type().is_integral() && !self.bounds.holds_integer(i));
        if empty_integral {
            return ProblemStatus::IllDefinedBoxConstraints;
        }
        if self.parameter_values.len() != self.parameters.len() {
            return ProblemStatus::IllDefinedParameterVec;
        }
        if self.decision_uncertainty.len() != self.decisions.len()
            || self
                .decision_uncertainty
                .iter()
                .flatten()
                .any(|m| !m.is_well_defined())
        {
            return ProblemStatus::IllDefinedUncertainty;
        }
        if self.functions.iter().any(|f| {
            f.output_uncertainty.len() != f.function.n_outputs()
                || f.output_uncertainty.iter().flatten().any(|m| !m.is_well_defined())
        }) {
            return ProblemStatus::IllDefinedFuncOutUncertainty;
        }
        let m = self.objectives.len();
        let checks = [
            (self.ideal.as_ref(), ProblemStatus::IllDefinedIdealVec),
            (self.anti_ideal.as_ref(), ProblemStatus::IllDefinedAntiIdealVec),
            (self.nadir.as_ref(), ProblemStatus::IllDefinedNadirVec),
        ];
        for (vec, status) in checks {
            if vec.is_some_and(|v| v.len() != m) {
                return status;
            }
        }
        if self.goals.len() != m {
            return ProblemStatus::IllDefinedGoalVec;
        }
        if self.priorities.len() != m || self.essential.len() != m {
            return ProblemStatus::IllDefinedPriorityVec;
        }
        if self.thresholds.len() != self.constraints.len() {
            return ProblemStatus::IllDefinedThresholdVec;
        }
        ProblemStatus::FullyDefined
    }

    fn check_functions(&self) -> Option<ProblemStatus> {
        if self.functions.is_empty() {
            return Some(ProblemStatus::IllDefinedFunctionVec);
        }
        let mut decision_used = vec![false; self.decisions.len()];
        let mut objective_produced = vec![false; self.objectives.len()];
        let mut constraint_produced = vec![false; self.constraints.len()];
        let mut unused_produced = vec![false; self.unused.len()];

        for entry in &self.functions {
            let n_in = entry.function.n_inputs();
            let n_out = entry.function.n_outputs();
            let map = &entry.map;
            if map.decisions.len() != n_in {
                return Some(ProblemStatus::IllDefinedDVecMaps);
            }
            if map.parameters.len() != n_in {
                return Some(ProblemStatus::IllDefinedPVecMaps);
            }
            if map.objectives.len() != n_out {
                return Some(ProblemStatus::IllDefinedOVecMaps);
            }
            if map.constraints.len() != n_out {
                return Some(ProblemStatus::IllDefinedCVecMaps);
            }
            if map.unused.len() != n_out {
                return Some(ProblemStatus::IllDefinedUVecMaps);
            }
            for (d, p) in map.decisions.iter().zip(&map.parameters) {
                match (d, p) {
                    (Some(d), None) => match decision_used.get_mut(*d) {
                        Some(slot) => *slot = true,
                        None => return Some(ProblemStatus::IllDefinedDVecMaps),
                    },
                    (None, Some(p)) => {
                        if *p >= self.parameters.len() {
                            return Some(ProblemStatus::IllDefinedPVecMaps);
                        }
                    }
                    _ => return Some(ProblemStatus::IllDefinedFunctionVec),
                }
            }
            for o in 0..n_out {
                let targets = [
                    (map.objectives[o], &mut objective_produced, ProblemStatus::IllDefinedOVecMaps),
                    (map.constraints[o], &mut constraint_produced, ProblemStatus::IllDefinedCVecMaps),
                    (map.unused[o], &mut unused_produced, ProblemStatus::IllDefinedUVecMaps),
                ];
                let mut hits = 0;
                for (target, produced, status) in targets {
                    if let Some(t) = target {
                        match produced.get_mut(t) {
                            Some(slot) => *slot = true,
                            None => return Some(status),
                        }
                        hits += 1;
                    }
                }
                if hits != 1 {
                    return Some(ProblemStatus::IllDefinedFunctionVec);
                }
            }
        }

        if decision_used.iter().any(|u| !u) {
            return Some(ProblemStatus::IllDefinedDVecMaps);
        }
        if objective_produced.iter().any(|p| !p) {
            return Some(ProblemStatus::IllDefinedOVecMaps);
        }
        if constraint_produced.iter().any(|p| !p) {
            return Some(ProblemStatus::IllDefinedCVecMaps);
        }
        if unused_produced.iter().any(|p| !p) {
            return Some(ProblemStatus::IllDefinedUVecMaps);
        }
        None
    }

    // -----------------------------------------------------------------------
    // Record conversion
    // -----------------------------------------------------------------------

    /// Convert to a plain record for external persistence.
    #[must_use]
    pub fn to_record(&self) -> ProblemRecord {
        record::to_record(self)
    }

    /// Rebuild a problem from a record, looking functions up by name.
    ///
    /// The returned problem has already been processed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFunction`] if `resolver` does not know a
    /// function named in the record.
    pub fn from_record<R>(record: &ProblemRecord, resolver: R) -> Result<Self>
    where
        R: Fn(&str) -> Option<Arc<dyn Function>>,
    {
        record::from_record(record, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_objective_problem() -> Problem {
        let mut p = Problem::new();
        let f = FnFunction::new("f", 2, 2, |x| vec![x[0], 1.0 - x[0] + x[1]]);
        p.append_function_auto(Arc::new(f));
        p
    }

    #[test]
    fn test_status_lifecycle() {
        let mut p = Problem::new();
        assert_eq!(p.status(), ProblemStatus::Undefined);
        assert_eq!(p.process(), ProblemStatus::IllDefinedDVecProperties);
        let mut p = two_objective_problem();
        assert_eq!(p.status(), ProblemStatus::UnprocessedChanges);
        assert_eq!(p.process(), ProblemStatus::FullyDefined);
        p.define_thresholds(vec![]);
        assert_eq!(p.status(), ProblemStatus::UnprocessedChanges);
        assert_eq!(p.process(), ProblemStatus::FullyDefined);
    }

    #[test]
    fn test_missing_function_is_ill_defined() {
        let mut p = Problem::new();
        p.append_decision_variable(PropertiesFactory::create("x", ElementType::Real), 0.0, 1.0);
        p.append_objective(PropertiesFactory::create("f", ElementType::Real));
        assert_eq!(p.process(), ProblemStatus::IllDefinedFunctionVec);
    }

    #[test]
    fn test_inverted_bounds_are_ill_defined() {
        let mut p = two_objective_problem();
        let mut b = BoxConstraints::new();
        b.push(Element::real(1.0), Element::real(0.0));
        b.push(Element::real(0.0), Element::real(1.0));
        p.define_box_constraints(b);
        assert_eq!(p.process(), ProblemStatus::IllDefinedBoxConstraints);
    }

    #[test]
    fn test_integer_box_without_integer() {
        let mut b = BoxConstraints::new();
        b.push(Element::real(0.2), Element::real(0.8));
        b.push(Element::real(-1.5), Element::real(2.5));
        assert!(!b.holds_integer(0));
        assert!(b.holds_integer(1));
        let mut rng = fastrand::Rng::with_seed(4);
        for _ in 0..50 {
            assert!((b.random_value(0, ElementType::Integer, &mut rng) - 1.0).abs() < f64::EPSILON);
            let v = b.random_value(1, ElementType::Integer, &mut rng);
            assert!((-1.0..=2.0).contains(&v) && v.fract().abs() < f64::EPSILON);
        }

        let mut p = Problem::new();
        p.append_decision_variable(PropertiesFactory::create("n", ElementType::Integer), 0.0, 3.0);
        p.append_objective(PropertiesFactory::create("f", ElementType::Real));
        p.append_function(
            Arc::new(FnFunction::new("id", 1, 1, |x| vec![x[0]])),
            FunctionMap::new(1, 1).decision(0, 0).objective(0, 0),
        );
        assert_eq!(p.process(), ProblemStatus::FullyDefined);
        let mut narrow = BoxConstraints::new();
        narrow.push(Element::real(0.2), Element::real(0.8));
        p.define_box_constraints(narrow);
        assert_eq!(p.process(), ProblemStatus::IllDefinedBoxConstraints);
    }

    #[test]
    fn test_unproduced_objective_is_ill_defined() {
        let mut p = two_objective_problem();
        p.append_objective(PropertiesFactory::create("orphan", ElementType::Real));
        assert_eq!(p.process(), ProblemStatus::IllDefinedOVecMaps);
    }

    #[test]
    fn test_doubly_mapped_output_is_ill_defined() {
        let mut p = Problem::new();
        let x = p.append_decision_variable(PropertiesFactory::create("x", ElementType::Real), 0.0, 1.0);
        let o = p.append_objective(PropertiesFactory::create("f", ElementType::Real));
        let c = p.append_constraint(PropertiesFactory::create("g", ElementType::Real), 0.0);
        let f = FnFunction::new("f", 1, 1, |x| vec![x[0]]);
        let map = FunctionMap::new(1, 1).decision(0, x).objective(0, o).constraint(0, c);
        p.append_function(Arc::new(f), map);
        assert_eq!(p.process(), ProblemStatus::IllDefinedFunctionVec);
    }

    #[test]
    fn test_bad_goal_vector() {
        let mut p = two_objective_problem();
        p.define_goals(vec![Some(0.0)]);
        assert_eq!(p.process(), ProblemStatus::IllDefinedGoalVec);
    }

    #[test]
    fn test_bad_uncertainty_mapping() {
        let mut p = two_objective_problem();
        p.define_decision_uncertainty(
            0,
            Some(UncertaintyMapping::new(
                crate::distribution::DistributionKind::Uniform,
                vec![0.0],
                vec![1.0],
            )),
        );
        assert_eq!(p.process(), ProblemStatus::IllDefinedUncertainty);
    }

    #[test]
    fn test_reflect_and_clamp() {
        let mut b = BoxConstraints::new();
        b.push(Element::real(0.0), Element::real(1.0));
        assert!((b.reflect(0, -0.25) - 0.25).abs() < 1e-12);
        assert!((b.reflect(0, 1.5) - 0.5).abs() < 1e-12);
        assert!((b.reflect(0, 7.0) - 0.0).abs() < 1e-12);
        assert!((b.clamp(0, 7.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_integer_random_value() {
        let mut b = BoxConstraints::new();
        b.push(Element::integer(1), Element::integer(3));
        let mut rng = fastrand::Rng::with_seed(2);
        for _ in 0..100 {
            let v = b.random_value(0, ElementType::Integer, &mut rng);
            assert!([1.0, 2.0, 3.0].contains(&v));
        }
    }

    #[test]
    fn test_define_bounds_rejects_inverted() {
        let mut p = two_objective_problem();
        assert!(matches!(
            p.define_bounds(0, 2.0, 1.0),
            Err(Error::InvalidBounds { index: 0, .. })
        ));
        assert!(p.define_bounds(1, -1.0, 1.0).is_ok());
        assert!((p.box_constraints().lower_bound(1).value() + 1.0).abs() < f64::EPSILON);
    }
}
