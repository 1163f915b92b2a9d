//! Scalarizing functions and generalized-decomposition projection.
//!
//! Every function takes a weighting vector `w` and a normalized objective
//! vector `f` of the same length, and returns 0 when the lengths differ.
//! Weights below [`EPSILON`](crate::EPSILON) are lifted to it so that zero
//! weights cannot hide weakly dominated points.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::EPSILON;

/// Multiple of the weighted sum added by the augmented Chebyshev function.
pub const AUGMENTATION_FACTOR: f64 = 0.05;

/// Offset added to a direction before inverting it into weights.
pub const GD_WEIGHT_OFFSET: f64 = 0.01;

/// Which scalarizing function reduces an objective vector to a cost.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScalarisingFunction {
    /// `w . f`.
    #[default]
    WeightedSum,
    /// `max_i w_i f_i`.
    WeightedChebyshev,
    /// Chebyshev plus a small multiple of the weighted sum.
    WeightedChebyshevAugmented,
    /// `(sum_i (w_i f_i)^p)^(1/p)`.
    WeightedLp(f64),
}

impl ScalarisingFunction {
    /// Evaluate the function.
    #[must_use]
    pub fn apply(self, w: &[f64], f: &[f64]) -> f64 {
        match self {
            Self::WeightedSum => weighted_sum(w, f),
            Self::WeightedChebyshev => weighted_chebyshev(w, f),
            Self::WeightedChebyshevAugmented => weighted_chebyshev_augmented(w, f),
            Self::WeightedLp(p) => weighted_lp(w, f, p),
        }
    }
}

#[inline]
fn lift(w: f64) -> f64 {
    w.max(EPSILON)
}

/// Weighted sum.
#[must_use]
pub fn weighted_sum(w: &[f64], f: &[f64]) -> f64 {
    if w.len() != f.len() {
        return 0.0;
    }
    w.iter().zip(f).map(|(&wi, &fi)| lift(wi) * fi).sum()
}

/// Weighted Chebyshev. The running maximum starts at 0.
#[must_use]
pub fn weighted_chebyshev(w: &[f64], f: &[f64]) -> f64 {
    if w.len() != f.len() {
        return 0.0;
    }
    w.iter()
        .zip(f)
        .fold(0.0, |m: f64, (&wi, &fi)| m.max(lift(wi) * fi))
}

/// Weighted Chebyshev augmented by [`AUGMENTATION_FACTOR`] times the weighted sum.
#[must_use]
pub fn weighted_chebyshev_augmented(w: &[f64], f: &[f64]) -> f64 {
    if w.len() != f.len() {
        return 0.0;
    }
    weighted_chebyshev(w, f) + AUGMENTATION_FACTOR * weighted_sum(w, f)
}

/// Weighted Lp norm. Returns 0 for `p <= 0`.
#[must_use]
pub fn weighted_lp(w: &[f64], f: &[f64], p: f64) -> f64 {
    if w.len() != f.len() || p <= 0.0 {
        return 0.0;
    }
    let sum: f64 = w
        .iter()
        .zip(f)
        .map(|(&wi, &fi)| (lift(wi) * fi).powf(p))
        .sum();
    sum.powf(1.0 / p)
}

/// Weights that make a scalarizing function prefer `direction`.
///
/// Each component is `1 / (d_i + 0.01)`, then the vector is normalized to
/// sum 1.
#[must_use]
pub fn gd_weights(direction: &[f64]) -> Vec<f64> {
    let inv: Vec<f64> = direction
        .iter()
        .map(|d| 1.0 / (d + GD_WEIGHT_OFFSET))
        .collect();
    to_unit_sum(inv)
}

fn to_unit_sum(mut v: Vec<f64>) -> Vec<f64> {
    let s: f64 = v.iter().sum();
    if s != 0.0 {
        for x in &mut v {
            *x /= s;
        }
    }
    v
}

/// A point on a direction ray together with its distance along the ray.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Projection {
    /// The projected point `direction * magnitude`.
    pub point: Vec<f64>,
    /// Scalarized value of `f` relative to that of the direction itself.
    pub magnitude: f64,
}

/// Project `f` onto the ray of `direction` as `function` sees it.
///
/// The direction is shifted by [`EPSILON`](crate::EPSILON) and normalized;
/// its inverse (normalized) gives the weighting vector. The magnitude is
/// `s(w, f) / s(w, direction)`. Mismatched lengths give an empty projection.
#[must_use]
pub fn project(function: ScalarisingFunction, direction: &[f64], f: &[f64]) -> Projection {
    if direction.len() != f.len() || f.is_empty() {
        return Projection::default();
    }
    let dir = to_unit_sum(direction.iter().map(|d| d + EPSILON).collect());
    let w = to_unit_sum(dir.iter().map(|d| 1.0 / d).collect());
    let denom = function.apply(&w, &dir);
    let magnitude = if denom == 0.0 {
        0.0
    } else {
        function.apply(&w, f) / denom
    };
    Projection {
        point: dir.iter().map(|d| d * magnitude).collect(),
        magnitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_sum() {
        assert!((weighted_sum(&[0.5, 0.5], &[2.0, 4.0]) - 3.0).abs() < 1e-12);
        assert!(weighted_sum(&[1.0], &[1.0, 2.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_weight_is_lifted() {
        let v = weighted_sum(&[1.0, 0.0], &[1.0, 1000.0]);
        assert!((v - (1.0 + EPSILON * 1000.0)).abs() < 1e-12);
    }

    #[test]
    fn test_chebyshev_max_starts_at_zero() {
        assert!((weighted_chebyshev(&[0.5, 0.5], &[2.0, 4.0]) - 2.0).abs() < 1e-12);
        assert!(weighted_chebyshev(&[0.5, 0.5], &[-2.0, -4.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_augmented() {
        let v = weighted_chebyshev_augmented(&[0.5, 0.5], &[2.0, 4.0]);
        assert!((v - (2.0 + 0.05 * 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_lp() {
        let v = weighted_lp(&[1.0, 1.0], &[3.0, 4.0], 2.0);
        assert!((v - 5.0).abs() < 1e-12);
        assert!(weighted_lp(&[1.0, 1.0], &[3.0, 4.0], 0.0).abs() < f64::EPSILON);
        let l1 = ScalarisingFunction::WeightedLp(1.0).apply(&[0.5, 0.5], &[2.0, 4.0]);
        assert!((l1 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_gd_weights_favour_small_components() {
        let w = gd_weights(&[0.0, 1.0]);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w[0] > w[1]);
    }

    #[test]
    fn test_projection_lies_on_ray() {
        let proj = project(ScalarisingFunction::WeightedChebyshev, &[1.0, 1.0], &[0.2, 0.6]);
        assert!((proj.point[0] - proj.point[1]).abs() < 1e-9);
        // Chebyshev with equal weights picks the larger component.
        assert!((proj.point[0] - 0.6).abs() < 1e-6);
        assert!((proj.magnitude - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_projection_mismatch_is_empty() {
        let proj = project(ScalarisingFunction::WeightedSum, &[1.0], &[0.2, 0.6]);
        assert!(proj.point.is_empty());
    }
}
