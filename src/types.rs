//! Core value types shared across the engine.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The optimization direction of a problem output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Minimize the output value.
    #[default]
    Minimize,
    /// Maximize the output value. Evaluation negates it so that every
    /// downstream stage minimizes.
    Maximize,
    /// The output is carried along but never optimized.
    Ignore,
}

/// The kind of value an [`Element`](crate::Element) holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ElementType {
    /// Continuous value.
    #[default]
    Real,
    /// Integral value with full arithmetic.
    Integer,
    /// Integral value with an order but no scaling.
    Ordinal,
    /// Category label. Only equality is meaningful.
    Nominal,
}

impl ElementType {
    /// Whether values of this type are stored as whole numbers.
    #[must_use]
    pub fn is_integral(self) -> bool {
        !matches!(self, Self::Real)
    }
}

/// Three-valued comparison result.
///
/// Candidate comparisons are only defined when both sides are evaluated
/// and have the same dimensionality; otherwise the answer is
/// [`Tribool::Incomparable`], which is distinct from `False`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tribool {
    /// The relation holds.
    True,
    /// The relation does not hold.
    False,
    /// The relation is undefined for these operands.
    Incomparable,
}

impl Tribool {
    /// Returns `true` only for [`Tribool::True`].
    #[must_use]
    pub fn is_true(self) -> bool {
        self == Self::True
    }

    /// Returns `true` only for [`Tribool::False`].
    #[must_use]
    pub fn is_false(self) -> bool {
        self == Self::False
    }

    /// Returns `true` only for [`Tribool::Incomparable`].
    #[must_use]
    pub fn is_incomparable(self) -> bool {
        self == Self::Incomparable
    }
}

impl From<bool> for Tribool {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tribool_from_bool() {
        assert!(Tribool::from(true).is_true());
        assert!(Tribool::from(false).is_false());
        assert!(!Tribool::Incomparable.is_true());
        assert!(!Tribool::Incomparable.is_false());
    }

    #[test]
    fn test_integral_types() {
        assert!(!ElementType::Real.is_integral());
        assert!(ElementType::Integer.is_integral());
        assert!(ElementType::Ordinal.is_integral());
        assert!(ElementType::Nominal.is_integral());
    }
}
