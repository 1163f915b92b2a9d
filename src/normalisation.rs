//! Normalization to the unit box and distance measures.

use crate::problem::BoxConstraints;
use crate::types::ElementType;

/// Map `v` into `[0, 1]^n` relative to `ideal` and `anti_ideal`.
///
/// Components at or below the ideal map to 0, at or above the anti-ideal
/// to 1. A degenerate range therefore maps to 0.
#[must_use]
pub fn normalise_to_unit_box(v: &[f64], ideal: &[f64], anti_ideal: &[f64]) -> Vec<f64> {
    v.iter()
        .zip(ideal.iter().zip(anti_ideal))
        .map(|(&x, (&lo, &hi))| {
            if x <= lo {
                0.0
            } else if x >= hi {
                1.0
            } else {
                (x - lo) / (hi - lo)
            }
        })
        .collect()
}

/// Inverse of [`normalise_to_unit_box`] for components inside the box.
///
/// Values outside `[0, 1]` are extrapolated linearly.
#[must_use]
pub fn scale_back_from_unit_box(v: &[f64], ideal: &[f64], anti_ideal: &[f64]) -> Vec<f64> {
    v.iter()
        .zip(ideal.iter().zip(anti_ideal))
        .map(|(&x, (&lo, &hi))| lo + x * (hi - lo))
        .collect()
}

/// Scale `v` in place to unit Lp norm and return the original norm.
///
/// A zero vector is left untouched.
pub fn to_unit_vec(v: &mut [f64], norm: f64) -> f64 {
    let magnitude = v.iter().map(|x| x.abs().powf(norm)).sum::<f64>().powf(1.0 / norm);
    if magnitude > 0.0 {
        for x in v.iter_mut() {
            *x /= magnitude;
        }
    }
    magnitude
}

/// Euclidean distance, or `f64::MAX` when lengths differ.
#[must_use]
pub fn l2_distance(a: &[f64], b: &[f64]) -> f64 {
    lp_distance(a, b, 2.0)
}

/// Minkowski distance of order `p`, or `f64::MAX` when lengths differ.
#[must_use]
pub fn lp_distance(a: &[f64], b: &[f64], p: f64) -> f64 {
    if a.len() != b.len() {
        return f64::MAX;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs().powf(p))
        .sum::<f64>()
        .powf(1.0 / p)
}

/// Angle in radians between `a` and `b` seen from the origin.
///
/// Returns `f64::MAX` when lengths differ and 0 when either vector is zero.
#[must_use]
pub fn angle_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::MAX;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na * nb)).clamp(-1.0, 1.0).acos()
}

/// Distance between two decision vectors with each component scaled by the
/// width of its box interval.
///
/// Nominal components contribute `1 / width` when they differ. Returns
/// `-1.0` when the lengths do not agree with the box.
#[must_use]
pub fn normalised_distance(
    x: &[f64],
    y: &[f64],
    bounds: &BoxConstraints,
    types: &[ElementType],
    p: f64,
) -> f64 {
    if x.len() != y.len() || bounds.len() != x.len() {
        return -1.0;
    }
    let lower = bounds.lower_values();
    let upper = bounds.upper_values();
    let mut diff: Vec<f64> = (0..x.len())
        .map(|i| {
            let width = upper[i] - lower[i];
            let width = if width == 0.0 { 1.0 } else { width };
            if types.get(i) == Some(&ElementType::Nominal) {
                #[allow(clippy::float_cmp)]
                let same = x[i] == y[i];
                if same { 0.0 } else { 1.0 / width }
            } else {
                (x[i] - y[i]).abs() / width
            }
        })
        .collect();
    to_unit_vec(&mut diff, p)
}
