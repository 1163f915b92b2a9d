//! Dominance, non-dominance sorting and hypervolume.
//!
//! Values handled here are in minimization form.
//!
//! # Available functions
//!
//! | Function | Purpose |
//! |---|---|
//! | [`weak_dominance`], [`strong_dominance`] | Compare two objective vectors |
//! | [`non_dominance_sort_values`] | Rank raw vectors into successive layers |
//! | [`non_dominance_sort`] | Rank container candidates into successive layers |
//! | [`hypervolume_min`] | Hypervolume in minimization form, reference optional |
//! | [`hypervolume_of_set`] | Hypervolume of container candidates |
//! | [`hypervolume_contributions`] | Marginal hypervolume of every member |
//!
//! # Example
//!
//! ```
//! use evoflow::pareto::{DominanceMode, hypervolume_min, non_dominance_sort_values};
//!
//! let solutions = vec![
//!     vec![1.0, 5.0],
//!     vec![5.0, 1.0],
//!     vec![3.0, 3.0],
//!     vec![4.0, 4.0], // dominated by (3, 3)
//! ];
//! let layers = non_dominance_sort_values(&solutions, DominanceMode::Weak);
//! assert_eq!(layers, vec![vec![0, 1, 2], vec![3]]);
//!
//! let hv = hypervolume_min(&solutions[..3], Some(&[6.0, 6.0]));
//! assert!((hv - 13.0).abs() < 1e-10);
//! ```

use crate::container::Container;
use crate::set::CandidateId;

/// How layers are separated during non-dominance sorting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DominanceMode {
    /// Better-or-equal everywhere and better somewhere separates layers.
    /// Identical vectors share a layer.
    #[default]
    Weak,
    /// Only being better in every component separates layers.
    Strict,
}

/// `a` is no worse than `b` anywhere and better somewhere (minimization).
#[must_use]
pub fn weak_dominance(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    let mut strictly_better = false;
    for (&av, &bv) in a.iter().zip(b) {
        if av > bv {
            return false;
        }
        if av < bv {
            strictly_better = true;
        }
    }
    strictly_better
}

/// `a` is better than `b` in every component (minimization).
#[must_use]
pub fn strong_dominance(a: &[f64], b: &[f64]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    !a.is_empty() && a.iter().zip(b).all(|(av, bv)| av < bv)
}

fn mode_dominates(mode: DominanceMode, a: &[f64], b: &[f64]) -> bool {
    match mode {
        DominanceMode::Weak => weak_dominance(a, b),
        DominanceMode::Strict => strong_dominance(a, b),
    }
}

/// Split `values` into successive non-dominated layers.
///
/// Every index appears in exactly one layer. Each member of layer `k > 0`
/// is dominated by some member of layer `k - 1`. Within a layer, indices
/// keep their input order.
///
/// Uses domination counts (Deb et al., 2002), which yields the same layers
/// as repeatedly peeling off the non-dominated subset, in O(M * N^2).
#[must_use]
pub fn non_dominance_sort_values(values: &[Vec<f64>], mode: DominanceMode) -> Vec<Vec<usize>> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }

    // S_p: solutions dominated by p
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    // n_p: how many solutions dominate p
    let mut domination_count: Vec<usize> = vec![0; n];

    for i in 0..n {
        for j in (i + 1)..n {
            if mode_dominates(mode, &values[i], &values[j]) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if mode_dominates(mode, &values[j], &values[i]) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }

    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();

    while !current.is_empty() {
        let mut next: Vec<usize> = Vec::new();
        for &p in &current {
            for &q in &dominated_by[p] {
                domination_count[q] -= 1;
                if domination_count[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        fronts.push(current);
        current = next;
    }

    fronts
}

/// Split container candidates into successive non-dominated layers.
///
/// Unevaluated candidates have no objectives to compare; they are treated
/// as mutually incomparable with everything and land in the first layer.
#[must_use]
pub fn non_dominance_sort(
    container: &Container,
    ids: &[CandidateId],
    mode: DominanceMode,
) -> Vec<Vec<CandidateId>> {
    let values = container.objective_vectors(ids);
    let m = values.iter().map(Vec::len).max().unwrap_or(0);
    // Pad mismatched vectors with NaN so that every comparison fails.
    let values: Vec<Vec<f64>> = values
        .into_iter()
        .map(|mut v| {
            if v.len() != m {
                v = vec![f64::NAN; m];
            }
            v
        })
        .collect();
    non_dominance_sort_values(&values, mode)
        .into_iter()
        .map(|layer| layer.into_iter().map(|i| ids[i]).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Hypervolume
// ---------------------------------------------------------------------------

/// Hypervolume of a front in minimization form.
///
/// Without a reference point, the componentwise maximum of the front is
/// used; members on that boundary then contribute nothing in the
/// corresponding dimension.
#[must_use]
pub fn hypervolume_min(front: &[Vec<f64>], reference: Option<&[f64]>) -> f64 {
    if front.is_empty() {
        return 0.0;
    }
    let reference = match reference {
        Some(r) => r.to_vec(),
        None => componentwise_max(front),
    };
    let d = reference.len();
    if d == 0 {
        return 0.0;
    }

    let filtered: Vec<Vec<f64>> = front
        .iter()
        .filter(|p| p.len() == d && p.iter().zip(&reference).all(|(&pv, &rv)| pv < rv))
        .cloned()
        .collect();

    if filtered.is_empty() {
        return 0.0;
    }

    hv_recursive(&filtered, &reference)
}

/// Hypervolume of container candidates. See [`hypervolume_min`].
#[must_use]
pub fn hypervolume_of_set(container: &Container, ids: &[CandidateId], reference: Option<&[f64]>) -> f64 {
    let values: Vec<Vec<f64>> = ids
        .iter()
        .map(|&id| container.candidate(id))
        .filter(|c| c.is_evaluated())
        .map(|c| c.objectives().to_vec())
        .collect();
    hypervolume_min(&values, reference)
}

/// Hypervolume lost by removing each member of `front`, in order.
///
/// Each trial subset lives only for its own iteration.
#[must_use]
pub fn hypervolume_contributions(front: &[Vec<f64>], reference: &[f64]) -> Vec<f64> {
    let total = hypervolume_min(front, Some(reference));
    (0..front.len())
        .map(|skip| {
            let rest: Vec<Vec<f64>> = front
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != skip)
                .map(|(_, p)| p.clone())
                .collect();
            total - hypervolume_min(&rest, Some(reference))
        })
        .collect()
}

/// Componentwise maximum of a non-empty collection.
#[must_use]
pub fn componentwise_max(points: &[Vec<f64>]) -> Vec<f64> {
    let d = points.first().map_or(0, Vec::len);
    let mut out = vec![f64::NEG_INFINITY; d];
    for p in points {
        for (o, &v) in out.iter_mut().zip(p) {
            *o = o.max(v);
        }
    }
    out
}

/// Recursive hypervolume via slicing on the last objective.
///
/// All points are in minimize-space and dominated by `reference`.
fn hv_recursive(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let d = reference.len();

    // 1-D: gap from the best point to the reference.
    if d == 1 {
        let min_val = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - min_val).max(0.0);
    }

    if points.len() == 1 {
        return points[0]
            .iter()
            .zip(reference)
            .map(|(&p, &r)| (r - p).max(0.0))
            .product();
    }

    let mut sorted: Vec<&Vec<f64>> = points.iter().collect();
    sorted.sort_by(|a, b| {
        a[d - 1]
            .partial_cmp(&b[d - 1])
            .unwrap_or(core::cmp::Ordering::Equal)
    });

    let sub_ref = &reference[..d - 1];
    let mut result = 0.0;

    for i in 0..sorted.len() {
        let height = if i + 1 < sorted.len() {
            sorted[i + 1][d - 1] - sorted[i][d - 1]
        } else {
            reference[d - 1] - sorted[i][d - 1]
        };

        if height <= 0.0 {
            continue;
        }

        let projected: Vec<Vec<f64>> = sorted[..=i].iter().map(|p| p[..d - 1].to_vec()).collect();
        let non_dom = non_dominated_minimize(&projected);

        if !non_dom.is_empty() {
            result += height * hv_recursive(&non_dom, sub_ref);
        }
    }

    result
}

/// The non-dominated subset of `points` in minimize-space.
fn non_dominated_minimize(points: &[Vec<f64>]) -> Vec<Vec<f64>> {
    points
        .iter()
        .enumerate()
        .filter(|&(i, p)| {
            !points
                .iter()
                .enumerate()
                .any(|(j, q)| i != j && weak_dominance(q, p))
        })
        .map(|(_, p)| p.clone())
        .collect()
}
