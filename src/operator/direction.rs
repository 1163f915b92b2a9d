//! Reference direction iteration.

use core::any::Any;

use super::{Context, Operator, Ports};
use crate::container::Container;
use crate::error::Result;
use crate::simplex_lattice::{auto_divisions, preferred_simplex_lattice};

/// Objective goals normalized between the ideal and nadir. Objectives
/// without a goal, or without a usable range, map to 0.
fn normalised_goal(container: &Container) -> Vec<f64> {
    let m = container.problem().n_objectives();
    let goals = container.problem().goals();
    let ideal = container.ideal();
    let nadir = container.nadir();
    (0..m)
        .map(|i| {
            let (Some(Some(g)), Some(lo), Some(hi)) = (goals.get(i), ideal.get(i), nadir.get(i))
            else {
                return 0.0;
            };
            let range = hi - lo;
            if range.is_finite() && range > crate::EPSILON {
                ((g - lo) / range).max(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Sets a new reference direction on every pass.
///
/// The directions are a shuffled simplex lattice large enough to hold
/// `reference_set_size` vectors, concentrated on the normalized goal when
/// one is declared. The set is walked in order; at the end of a cycle it is
/// rebuilt if the goal moved and reshuffled otherwise. The node has no ports
/// and switches the archive on so that the nadir is tracked.
#[derive(Clone, Debug)]
pub struct SimplexLatticeDirectionIterator {
    ports: Ports,
    reference_set_size: usize,
    reference_set: Vec<Vec<f64>>,
    goal: Vec<f64>,
    current: Option<usize>,
}

impl Default for SimplexLatticeDirectionIterator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimplexLatticeDirectionIterator {
    /// Iterate the corner directions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ports: Ports::default(),
            reference_set_size: 1,
            reference_set: Vec::new(),
            goal: Vec::new(),
            current: None,
        }
    }

    /// Minimum number of directions per cycle.
    #[must_use]
    pub fn with_reference_set_size(mut self, n: usize) -> Self {
        self.define_reference_set_size(n);
        self
    }

    /// Change the minimum number of directions. Takes effect when the set
    /// is next rebuilt.
    pub fn define_reference_set_size(&mut self, n: usize) {
        self.reference_set_size = n.max(1);
    }

    /// Directions of the current cycle.
    #[must_use]
    pub fn reference_set(&self) -> &[Vec<f64>] {
        &self.reference_set
    }

    fn rebuild(&mut self, ctx: &mut Context<'_>) {
        let k = ctx.container.problem().n_objectives();
        let h = auto_divisions(k, self.reference_set_size);
        self.reference_set = preferred_simplex_lattice(h, k, &self.goal);
        ctx.rng.shuffle(&mut self.reference_set);
        trace_debug!(size = self.reference_set.len(), "direction set rebuilt");
    }
}

impl Operator for SimplexLatticeDirectionIterator {
    fn name(&self) -> &'static str {
        "Simplex Lattice Direction Iterator"
    }

    fn ports(&self) -> &Ports {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut Ports {
        &mut self.ports
    }

    fn evaluate_node(&mut self, ctx: &mut Context<'_>) -> Result<()> {
        ctx.container.define_keep_archive(true);
        if self.reference_set.is_empty() {
            self.goal = normalised_goal(ctx.container);
            self.rebuild(ctx);
            self.current = None;
        }
        let next = match self.current {
            Some(i) if i + 1 < self.reference_set.len() => i + 1,
            _ if self.current.is_none() => 0,
            _ => {
                let goal = normalised_goal(ctx.container);
                if goal == self.goal {
                    ctx.rng.shuffle(&mut self.reference_set);
                } else {
                    self.goal = goal;
                    self.rebuild(ctx);
                }
                0
            }
        };
        self.current = Some(next);
        if let Some(dir) = self.reference_set.get(next) {
            ctx.container.define_dir_vec(dir)?;
        }
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
