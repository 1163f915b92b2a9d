//! Typed scalar values and their metadata.
//!
//! An [`Element`] carries a value together with its [`ElementType`]. The
//! type decides which arithmetic is legal:
//!
//! | Operation | Real / Integer | Ordinal | Nominal |
//! |-----------|----------------|---------|---------|
//! | `+`, `-` | yes | yes | no |
//! | `*`, `/` | yes | no | no |
//! | negation | yes | yes | no |
//! | `<`, `<=`, `>`, `>=` | yes | yes | no |
//! | `==`, `!=` | yes | yes | yes |
//!
//! Division by a zero-valued element fails regardless of type.

use core::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::types::{Direction, ElementType};

/// A typed scalar with an optional uncertainty distribution.
///
/// Integral types always hold whole-number values.
///
/// # Examples
///
/// ```
/// use evoflow::{Element, ElementType, Error};
///
/// let a = Element::new(ElementType::Integer, 7.0);
/// let b = Element::new(ElementType::Integer, 2.0);
/// assert_eq!(a.try_div(&b).unwrap().value(), 3.0);
///
/// let o = Element::new(ElementType::Ordinal, 2.0);
/// assert!(matches!(o.try_mul(&b), Err(Error::InvalidOperation { .. })));
/// ```
#[derive(Clone, Debug)]
pub struct Element {
    element_type: ElementType,
    value: f64,
    distribution: Option<Arc<Distribution>>,
}

impl Element {
    /// Create an element, rounding `value` for integral types.
    #[must_use]
    pub fn new(element_type: ElementType, value: f64) -> Self {
        Self {
            element_type,
            value: coerce(element_type, value),
            distribution: None,
        }
    }

    /// Shorthand for a real-valued element.
    #[must_use]
    pub fn real(value: f64) -> Self {
        Self::new(ElementType::Real, value)
    }

    /// Shorthand for an integer element.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn integer(value: i64) -> Self {
        Self::new(ElementType::Integer, value as f64)
    }

    /// The element type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// The nominal value.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// The nominal value truncated to an integer.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> i64 {
        self.value as i64
    }

    /// Replace the nominal value, rounding for integral types.
    pub fn define_value(&mut self, value: f64) {
        self.value = coerce(self.element_type, value);
    }

    /// The attached uncertainty distribution, if any.
    #[must_use]
    pub fn distribution(&self) -> Option<&Arc<Distribution>> {
        self.distribution.as_ref()
    }

    /// Attach an uncertainty distribution.
    pub fn define_distribution(&mut self, distribution: Arc<Distribution>) {
        self.distribution = Some(distribution);
    }

    /// Detach the uncertainty distribution. The value is kept.
    pub fn clear_distribution(&mut self) {
        self.distribution = None;
    }

    /// A sample from the attached distribution, or the nominal value.
    pub fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        match &self.distribution {
            Some(d) => coerce(self.element_type, d.sample(rng)),
            None => self.value,
        }
    }

    // -----------------------------------------------------------------------
    // Arithmetic
    // -----------------------------------------------------------------------

    /// `self + rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if either operand is nominal.
    pub fn try_add(&self, rhs: &Self) -> Result<Self> {
        let ty = additive_type("add", self.element_type, rhs.element_type)?;
        Ok(Self::new(ty, self.value + rhs.value))
    }

    /// `self - rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if either operand is nominal.
    pub fn try_sub(&self, rhs: &Self) -> Result<Self> {
        let ty = additive_type("sub", self.element_type, rhs.element_type)?;
        Ok(Self::new(ty, self.value - rhs.value))
    }

    /// `self * rhs`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if either operand is ordinal or nominal.
    pub fn try_mul(&self, rhs: &Self) -> Result<Self> {
        let ty = multiplicative_type("mul", self.element_type, rhs.element_type)?;
        Ok(Self::new(ty, self.value * rhs.value))
    }

    /// `self / rhs`. Integer by integer truncates toward zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DivisionByZero`] for a zero divisor of any type, and
    /// [`Error::InvalidOperation`] if either operand is ordinal or nominal.
    #[allow(clippy::float_cmp)]
    pub fn try_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.value == 0.0 {
            return Err(Error::DivisionByZero);
        }
        let ty = multiplicative_type("div", self.element_type, rhs.element_type)?;
        let value = if ty == ElementType::Integer {
            (self.value / rhs.value).trunc()
        } else {
            self.value / rhs.value
        };
        Ok(Self::new(ty, value))
    }

    /// `-self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] for nominal elements.
    pub fn try_neg(&self) -> Result<Self> {
        if self.element_type == ElementType::Nominal {
            return Err(Error::InvalidOperation {
                op: "neg",
                element_type: ElementType::Nominal,
            });
        }
        Ok(Self::new(self.element_type, -self.value))
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    /// Compare two elements by value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if either operand is nominal.
    pub fn try_cmp(&self, rhs: &Self) -> Result<Ordering> {
        for ty in [self.element_type, rhs.element_type] {
            if ty == ElementType::Nominal {
                return Err(Error::InvalidOperation {
                    op: "cmp",
                    element_type: ty,
                });
            }
        }
        Ok(self.value.partial_cmp(&rhs.value).unwrap_or(Ordering::Equal))
    }

    /// `self < rhs`.
    ///
    /// # Errors
    ///
    /// See [`Element::try_cmp`].
    pub fn try_lt(&self, rhs: &Self) -> Result<bool> {
        Ok(self.try_cmp(rhs)? == Ordering::Less)
    }

    /// `self <= rhs`.
    ///
    /// # Errors
    ///
    /// See [`Element::try_cmp`].
    pub fn try_le(&self, rhs: &Self) -> Result<bool> {
        Ok(self.try_cmp(rhs)? != Ordering::Greater)
    }

    /// `self > rhs`.
    ///
    /// # Errors
    ///
    /// See [`Element::try_cmp`].
    pub fn try_gt(&self, rhs: &Self) -> Result<bool> {
        Ok(self.try_cmp(rhs)? == Ordering::Greater)
    }

    /// `self >= rhs`.
    ///
    /// # Errors
    ///
    /// See [`Element::try_cmp`].
    pub fn try_ge(&self, rhs: &Self) -> Result<bool> {
        Ok(self.try_cmp(rhs)? != Ordering::Less)
    }
}

impl PartialEq for Element {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

fn coerce(ty: ElementType, value: f64) -> f64 {
    if ty.is_integral() { value.round() } else { value }
}

fn additive_type(op: &'static str, a: ElementType, b: ElementType) -> Result<ElementType> {
    use ElementType::{Integer, Nominal, Ordinal, Real};
    match (a, b) {
        (Nominal, _) | (_, Nominal) => Err(Error::InvalidOperation {
            op,
            element_type: Nominal,
        }),
        (Real, _) | (_, Real) => Ok(Real),
        (Ordinal, Ordinal) => Ok(Ordinal),
        (Integer | Ordinal, Integer | Ordinal) => Ok(Integer),
    }
}

fn multiplicative_type(op: &'static str, a: ElementType, b: ElementType) -> Result<ElementType> {
    use ElementType::{Integer, Nominal, Ordinal, Real};
    match (a, b) {
        (bad @ (Ordinal | Nominal), _) | (_, bad @ (Ordinal | Nominal)) => {
            Err(Error::InvalidOperation {
                op,
                element_type: bad,
            })
        }
        (Integer, Integer) => Ok(Integer),
        _ => Ok(Real),
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Immutable description of one problem variable or output.
///
/// Only [`PropertiesFactory`] can create these, which guarantees that every
/// instance carries a unique [`id`](Self::id).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementProperties {
    index: usize,
    id: String,
    name: String,
    description: String,
    units: String,
    element_type: ElementType,
    direction: Direction,
}

impl ElementProperties {
    /// Position of the element inside its owning vector.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Globally unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Free-form description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Units of measurement.
    #[must_use]
    pub fn units(&self) -> &str {
        &self.units
    }

    /// Value type.
    #[must_use]
    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    /// Optimization direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// A copy positioned at `index`. Identity is preserved.
    #[must_use]
    pub(crate) fn reindexed(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }
}

static PROPERTIES_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The single way to create [`ElementProperties`].
///
/// IDs are a hash of name and description followed by a process-wide
/// monotonic counter. The counter alone makes them unique, even for
/// concurrent creation with the same name.
#[derive(Debug, Clone, Default)]
pub struct PropertiesFactory {
    index: usize,
    name: String,
    description: String,
    units: String,
    element_type: ElementType,
    direction: Direction,
}

impl PropertiesFactory {
    /// Start describing an element called `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create real-valued, minimized properties in one call.
    #[must_use]
    pub fn create(name: impl Into<String>, element_type: ElementType) -> ElementProperties {
        Self::builder(name).element_type(element_type).build()
    }

    /// Set the index.
    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the units.
    #[must_use]
    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Set the value type.
    #[must_use]
    pub fn element_type(mut self, element_type: ElementType) -> Self {
        self.element_type = element_type;
        self
    }

    /// Set the optimization direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Finish and assign a fresh ID.
    #[must_use]
    pub fn build(self) -> ElementProperties {
        let counter = PROPERTIES_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        let hash = fnv1a(&self.name, &self.description, counter);
        let id = format!("{hash:016x}-{counter:x}");
        ElementProperties {
            index: self.index,
            id,
            name: self.name,
            description: self.description,
            units: self.units,
            element_type: self.element_type,
            direction: self.direction,
        }
    }

    /// Restore properties with a previously issued ID.
    pub(crate) fn restore(self, id: String) -> ElementProperties {
        ElementProperties {
            index: self.index,
            id,
            name: self.name,
            description: self.description,
            units: self.units,
            element_type: self.element_type,
            direction: self.direction,
        }
    }
}

fn fnv1a(name: &str, description: &str, counter: u64) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = OFFSET;
    let bytes = name
        .bytes()
        .chain([0u8])
        .chain(description.bytes())
        .chain([0u8])
        .chain(counter.to_le_bytes());
    for b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_integer_value_is_rounded() {
        let e = Element::new(ElementType::Integer, 2.6);
        assert!((e.value() - 3.0).abs() < f64::EPSILON);
        assert_eq!(e.as_i64(), 3);
    }

    #[test]
    fn test_mixed_promotion() {
        let i = Element::integer(3);
        let r = Element::real(0.5);
        let s = i.try_add(&r).unwrap();
        assert_eq!(s.element_type(), ElementType::Real);
        assert!((s.value() - 3.5).abs() < 1e-12);
        let p = i.try_mul(&Element::integer(4)).unwrap();
        assert_eq!(p.element_type(), ElementType::Integer);
        assert!((p.value() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_integer_division_truncates() {
        let q = Element::integer(-7).try_div(&Element::integer(2)).unwrap();
        assert!((q.value() + 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_ordinal_additive_results() {
        let o = Element::new(ElementType::Ordinal, 2.0);
        assert_eq!(o.try_add(&o).unwrap().element_type(), ElementType::Ordinal);
        assert_eq!(
            o.try_sub(&Element::integer(1)).unwrap().element_type(),
            ElementType::Integer
        );
        assert_eq!(
            o.try_add(&Element::real(1.0)).unwrap().element_type(),
            ElementType::Real
        );
    }

    #[test]
    fn test_nominal_equality_only() {
        let a = Element::new(ElementType::Nominal, 1.0);
        let b = Element::new(ElementType::Nominal, 1.0);
        assert_eq!(a, b);
        assert!(a.try_lt(&b).is_err());
        assert!(a.try_neg().is_err());
    }

    #[test]
    fn test_distribution_is_independent_of_value() {
        let mut e = Element::real(0.5);
        e.define_distribution(Arc::new(Distribution::Constant(4.0)));
        let mut rng = fastrand::Rng::with_seed(1);
        assert!((e.sample(&mut rng) - 4.0).abs() < f64::EPSILON);
        assert!((e.value() - 0.5).abs() < f64::EPSILON);
        e.clear_distribution();
        assert!((e.sample(&mut rng) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_property_ids_are_unique() {
        let ids: HashSet<String> = (0..1000)
            .map(|_| PropertiesFactory::create("x", ElementType::Real).id().to_string())
            .collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_property_ids_carry_the_counter() {
        let counter = |p: &ElementProperties| {
            let (hash, tail) = p.id().split_once('-').unwrap();
            assert_eq!(hash.len(), 16);
            u64::from_str_radix(tail, 16).unwrap()
        };
        let a = PropertiesFactory::create("same", ElementType::Real);
        let b = PropertiesFactory::create("same", ElementType::Real);
        assert!(counter(&b) > counter(&a));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_property_ids_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..250)
                        .map(|_| {
                            PropertiesFactory::builder("y")
                                .description("same")
                                .build()
                                .id()
                                .to_string()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut ids = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(ids.insert(id));
            }
        }
        assert_eq!(ids.len(), 1000);
    }
}
