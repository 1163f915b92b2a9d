use core::fmt;

use crate::types::Direction;

/// A computational function wired into a [`Problem`](super::Problem).
///
/// Functions are pure: the same inputs must give the same outputs. Input
/// and output order is fixed by [`n_inputs`](Self::n_inputs) and
/// [`n_outputs`](Self::n_outputs).
pub trait Function: Send + Sync {
    /// A stable name used by problem records to find the function again.
    fn name(&self) -> &str;

    /// Number of scalar inputs.
    fn n_inputs(&self) -> usize;

    /// Number of scalar outputs.
    fn n_outputs(&self) -> usize;

    /// Evaluate the function. `inputs.len() == self.n_inputs()`.
    fn evaluate(&self, inputs: &[f64]) -> Vec<f64>;

    /// Direction of each output when the function is wired automatically.
    fn output_directions(&self) -> Vec<Direction> {
        vec![Direction::Minimize; self.n_outputs()]
    }
}

type Closure = Box<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

/// Adapts a closure into a [`Function`].
///
/// ```
/// use evoflow::problem::{FnFunction, Function};
///
/// let f = FnFunction::new("sphere", 2, 1, |x| vec![x[0] * x[0] + x[1] * x[1]]);
/// assert_eq!(f.evaluate(&[1.0, 2.0]), vec![5.0]);
/// ```
pub struct FnFunction {
    name: String,
    n_inputs: usize,
    n_outputs: usize,
    directions: Vec<Direction>,
    closure: Closure,
}

impl FnFunction {
    /// Wrap `closure` as a function with the given arity. Outputs are minimized.
    #[must_use]
    pub fn new<F>(name: impl Into<String>, n_inputs: usize, n_outputs: usize, closure: F) -> Self
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            n_inputs,
            n_outputs,
            directions: vec![Direction::Minimize; n_outputs],
            closure: Box::new(closure),
        }
    }

    /// Override the output directions.
    #[must_use]
    pub fn with_directions(mut self, directions: Vec<Direction>) -> Self {
        self.directions = directions;
        self
    }
}

impl fmt::Debug for FnFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFunction")
            .field("name", &self.name)
            .field("n_inputs", &self.n_inputs)
            .field("n_outputs", &self.n_outputs)
            .finish_non_exhaustive()
    }
}

impl Function for FnFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    fn evaluate(&self, inputs: &[f64]) -> Vec<f64> {
        (self.closure)(inputs)
    }

    fn output_directions(&self) -> Vec<Direction> {
        self.directions.clone()
    }
}

/// How one function's inputs and outputs connect to the problem vectors.
///
/// Every input is fed by exactly one decision variable or parameter. Every
/// output lands in exactly one objective, constraint or unused slot.
/// `None` marks an unmapped position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FunctionMap {
    /// Decision variable feeding each function input.
    pub decisions: Vec<Option<usize>>,
    /// Parameter feeding each function input.
    pub parameters: Vec<Option<usize>>,
    /// Objective receiving each function output.
    pub objectives: Vec<Option<usize>>,
    /// Constraint receiving each function output.
    pub constraints: Vec<Option<usize>>,
    /// Unused slot receiving each function output.
    pub unused: Vec<Option<usize>>,
}

impl FunctionMap {
    /// An all-unmapped map for the given arity.
    #[must_use]
    pub fn new(n_inputs: usize, n_outputs: usize) -> Self {
        Self {
            decisions: vec![None; n_inputs],
            parameters: vec![None; n_inputs],
            objectives: vec![None; n_outputs],
            constraints: vec![None; n_outputs],
            unused: vec![None; n_outputs],
        }
    }

    /// Feed `input` from decision variable `var`.
    #[must_use]
    pub fn decision(mut self, input: usize, var: usize) -> Self {
        set_slot(&mut self.decisions, input, var);
        self
    }

    /// Feed `input` from parameter `param`.
    #[must_use]
    pub fn parameter(mut self, input: usize, param: usize) -> Self {
        set_slot(&mut self.parameters, input, param);
        self
    }

    /// Route `output` to objective `obj`.
    #[must_use]
    pub fn objective(mut self, output: usize, obj: usize) -> Self {
        set_slot(&mut self.objectives, output, obj);
        self
    }

    /// Route `output` to constraint `c`.
    #[must_use]
    pub fn constraint(mut self, output: usize, c: usize) -> Self {
        set_slot(&mut self.constraints, output, c);
        self
    }

    /// Route `output` to unused slot `u`.
    #[must_use]
    pub fn unused(mut self, output: usize, u: usize) -> Self {
        set_slot(&mut self.unused, output, u);
        self
    }
}

fn set_slot(slots: &mut Vec<Option<usize>>, pos: usize, target: usize) {
    if pos >= slots.len() {
        slots.resize(pos + 1, None);
    }
    slots[pos] = Some(target);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_builder() {
        let m = FunctionMap::new(2, 2)
            .decision(0, 1)
            .parameter(1, 0)
            .objective(0, 0)
            .constraint(1, 0);
        assert_eq!(m.decisions, vec![Some(1), None]);
        assert_eq!(m.parameters, vec![None, Some(0)]);
        assert_eq!(m.objectives, vec![Some(0), None]);
        assert_eq!(m.constraints, vec![None, Some(0)]);
    }

    #[test]
    fn test_fn_function_directions() {
        let f = FnFunction::new("f", 1, 2, |x| vec![x[0], -x[0]])
            .with_directions(vec![Direction::Minimize, Direction::Maximize]);
        assert_eq!(f.output_directions()[1], Direction::Maximize);
        assert_eq!(f.evaluate(&[2.0]), vec![2.0, -2.0]);
    }
}
