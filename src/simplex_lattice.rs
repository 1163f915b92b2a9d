//! Simplex-lattice weight vectors.
//!
//! A lattice with `h` divisions in `k` dimensions holds every vector whose
//! components are multiples of `1/h` and sum to 1. There are
//! `C(h + k - 1, k - 1)` of them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::normalisation::{angle_distance, l2_distance, lp_distance};

/// Lattices larger than this stop the search for a preferred lattice.
const MAX_LATTICE_SIZE: usize = 10_000_000;

/// Distance used when ordering or pairing weight vectors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DistanceMeasure {
    /// L2 distance.
    Euclidean,
    /// L1 distance.
    Manhattan,
    /// Angle between the vectors seen from the origin.
    #[default]
    Angle,
}

impl DistanceMeasure {
    /// Distance between `a` and `b`.
    #[must_use]
    pub fn distance(self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Self::Euclidean => l2_distance(a, b),
            Self::Manhattan => lp_distance(a, b, 1.0),
            Self::Angle => angle_distance(a, b),
        }
    }
}

/// How weight vectors are associated with population members.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegularisationApproach {
    /// The i-th member gets the i-th vector.
    InitialOrder,
    /// Vectors closest to the centroid pick their nearest member first.
    #[default]
    CentroidBasedOrder,
}

/// `C(n, k)`.
fn n_combinations(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: usize = 1;
    for i in 0..k {
        result = result.saturating_mul(n - i) / (i + 1);
    }
    result
}

/// Number of vectors in the lattice with `h` divisions and `k` components.
#[must_use]
pub fn lattice_size(h: usize, k: usize) -> usize {
    if k == 0 {
        return 0;
    }
    n_combinations(h + k - 1, k - 1)
}

/// Every lattice vector, the first component varying slowest.
///
/// With `h == 0` the lattice degenerates to the single centroid.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn simplex_lattice(h: usize, k: usize) -> Vec<Vec<f64>> {
    if k == 0 {
        return Vec::new();
    }
    if h == 0 {
        return vec![vec![1.0 / k as f64; k]];
    }
    let mut points = Vec::with_capacity(lattice_size(h, k));
    let mut point = vec![0.0_f64; k];
    lattice_recursive(k, h, 0, h, &mut point, &mut points);
    points
}

#[allow(clippy::cast_precision_loss)]
fn lattice_recursive(
    k: usize,
    h: usize,
    depth: usize,
    remaining: usize,
    current: &mut Vec<f64>,
    result: &mut Vec<Vec<f64>>,
) {
    if depth == k - 1 {
        current[depth] = remaining as f64 / h as f64;
        result.push(current.clone());
        return;
    }
    for i in 0..=remaining {
        current[depth] = i as f64 / h as f64;
        lattice_recursive(k, h, depth + 1, remaining - i, current, result);
    }
}

/// Lattice vectors whose every component stays within `upper`.
#[must_use]
pub fn constrained_simplex_lattice(h: usize, k: usize, upper: &[f64]) -> Vec<Vec<f64>> {
    simplex_lattice(h, k)
        .into_iter()
        .filter(|w| w.iter().zip(upper).all(|(x, u)| x <= u))
        .collect()
}

/// Map each vector `w` to `w * (1 - sum(goal)) + goal`.
pub fn linear_transformation(set: &mut [Vec<f64>], goal: &[f64]) {
    let scale = 1.0 - goal.iter().sum::<f64>();
    for w in set {
        for (x, g) in w.iter_mut().zip(goal) {
            *x = *x * scale + g;
        }
    }
}

/// Lattice concentrated on the region a normalized `goal` points at.
///
/// A goal on the simplex yields just the goal. A goal below it shrinks the
/// full lattice towards the goal. A goal above it keeps increasing the
/// resolution of a lattice constrained beneath the goal until the region
/// holds at least as many vectors as the full lattice would; if that never
/// happens the full lattice is returned.
#[must_use]
pub fn preferred_simplex_lattice(h: usize, k: usize, goal: &[f64]) -> Vec<Vec<f64>> {
    let full = lattice_size(h, k);
    let sum: f64 = goal.iter().sum();

    if (sum - 1.0).abs() < crate::EPSILON {
        return vec![goal.to_vec()];
    }
    if sum < 1.0 {
        let mut w = simplex_lattice(h, k);
        linear_transformation(&mut w, goal);
        return w;
    }

    let upper: Vec<f64> = goal.iter().map(|g| g / (sum - 1.0)).collect();
    let mut hh = h;
    loop {
        let mut w = constrained_simplex_lattice(hh, k, &upper);
        linear_transformation(&mut w, goal);
        if w.len() >= full {
            return w;
        }
        hh += 1;
        if lattice_size(hh, k) > MAX_LATTICE_SIZE {
            return simplex_lattice(h, k);
        }
    }
}

/// Smallest `h >= 1` whose lattice holds at least `min_size` vectors.
#[must_use]
pub fn auto_divisions(k: usize, min_size: usize) -> usize {
    let mut h = 1;
    while lattice_size(h, k) < min_size && lattice_size(h, k) <= MAX_LATTICE_SIZE {
        h += 1;
    }
    h
}

/// Componentwise mean of `vectors`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn centroid(vectors: &[Vec<f64>]) -> Vec<f64> {
    let Some(first) = vectors.first() else {
        return Vec::new();
    };
    let mut c = vec![0.0; first.len()];
    for v in vectors {
        for (ci, x) in c.iter_mut().zip(v) {
            *ci += x;
        }
    }
    let n = vectors.len() as f64;
    c.iter_mut().for_each(|x| *x /= n);
    c
}

/// Indices of `vectors` in ascending distance to their centroid.
#[must_use]
pub fn centroid_order(vectors: &[Vec<f64>], measure: DistanceMeasure) -> Vec<usize> {
    let c = centroid(vectors);
    let dist: Vec<f64> = vectors.iter().map(|v| measure.distance(&c, v)).collect();
    let mut order: Vec<usize> = (0..vectors.len()).collect();
    order.sort_by(|&a, &b| {
        dist[a]
            .partial_cmp(&dist[b])
            .unwrap_or(core::cmp::Ordering::Equal)
    });
    order
}

/// Pair each point with a distinct vector.
///
/// Vectors are visited in [`centroid_order`]; each takes the nearest point
/// not yet taken. Returns `map` with `map[point] = vector`. Points beyond
/// the number of vectors (and vice versa) stay unpaired; unpaired points
/// map to their own index.
#[must_use]
pub fn assign_by_centroid(
    vectors: &[Vec<f64>],
    points: &[Vec<f64>],
    measure: DistanceMeasure,
) -> Vec<usize> {
    let mut map: Vec<usize> = (0..points.len()).collect();
    let mut free: Vec<usize> = (0..points.len()).collect();
    for v in centroid_order(vectors, measure) {
        let Some((pos, _)) = free
            .iter()
            .enumerate()
            .map(|(pos, &p)| (pos, measure.distance(&vectors[v], &points[p])))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(core::cmp::Ordering::Equal))
        else {
            break;
        };
        map[free[pos]] = v;
        free.remove(pos);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_size_and_sum() {
        for (h, k) in [(1, 2), (4, 2), (3, 3), (5, 4), (12, 3)] {
            let w = simplex_lattice(h, k);
            assert_eq!(w.len(), lattice_size(h, k), "h={h} k={k}");
            for v in &w {
                assert_eq!(v.len(), k);
                assert!(v.iter().all(|&x| x >= 0.0));
                assert!((v.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            }
        }
        assert_eq!(lattice_size(12, 3), 91);
        assert_eq!(lattice_size(4, 2), 5);
    }

    #[test]
    fn test_auto_divisions() {
        assert_eq!(auto_divisions(2, 10), 9);
        assert_eq!(auto_divisions(3, 91), 12);
        assert_eq!(auto_divisions(3, 2), 1);
    }

    #[test]
    fn test_constrained() {
        let w = constrained_simplex_lattice(4, 2, &[0.5, 1.0]);
        assert_eq!(w.len(), 3);
        assert!(w.iter().all(|v| v[0] <= 0.5));
    }

    #[test]
    fn test_preferred_below_simplex() {
        let goal = [0.2, 0.2];
        let w = preferred_simplex_lattice(3, 2, &goal);
        assert_eq!(w.len(), 4);
        for v in &w {
            assert!(v[0] >= 0.2 - 1e-12 && v[1] >= 0.2 - 1e-12);
            assert!((v.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_preferred_on_and_above_simplex() {
        assert_eq!(preferred_simplex_lattice(3, 2, &[0.5, 0.5]), vec![vec![0.5, 0.5]]);
        let w = preferred_simplex_lattice(3, 2, &[0.8, 0.8]);
        assert!(w.len() >= 4);
        for v in &w {
            assert!(v[0] <= 0.8 + 1e-9 && v[1] <= 0.8 + 1e-9);
        }
    }

    #[test]
    fn test_centroid_order() {
        let w = simplex_lattice(2, 2);
        // [0,1], [0.5,0.5], [1,0]: the middle one sits on the centroid.
        let order = centroid_order(&w, DistanceMeasure::Angle);
        assert_eq!(order[0], 1);
    }

    #[test]
    fn test_assign_is_permutation() {
        let w = simplex_lattice(3, 2);
        let points = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.4, 0.6], vec![0.7, 0.3]];
        let mut map = assign_by_centroid(&w, &points, DistanceMeasure::Euclidean);
        assert_eq!(map[0], 3);
        assert_eq!(map[1], 0);
        map.sort_unstable();
        assert_eq!(map, vec![0, 1, 2, 3]);
    }
}
