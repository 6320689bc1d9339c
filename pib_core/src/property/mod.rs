//! Property value model.
//!
//! A [`Property`] is a single `(key, value)` fact carrying an authority
//! [`Level`] and a running preference score. Properties are merged with
//! [`Property::update`], which is the only operation that changes a score.

mod set;
mod value;

pub use set::PropertySet;
pub use value::{Range, Token, Value};

use crate::error::PropertyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assigned to a property whose update was refused.
pub const VIOLATION_SCORE: f64 = -9999.0;

/// Override authority of a property, ordered `Informational < Requested < Immutable`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Informational,
    #[default]
    Requested,
    Immutable,
}

impl Level {
    /// Numeric rank used by the scoring rule.
    pub fn rank(self) -> u8 {
        match self {
            Level::Informational => 0,
            Level::Requested => 1,
            Level::Immutable => 2,
        }
    }

    /// Score weight of a merge performed at this level.
    pub fn weight(self) -> f64 {
        1.0 + f64::from(self.rank())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Informational => write!(f, "informational"),
            Level::Requested => write!(f, "requested"),
            Level::Immutable => write!(f, "immutable"),
        }
    }
}

/// Outcome of merging one property into another.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// The key was absent and the property was stored as is.
    Inserted,
    /// The incoming value agreed with the held one.
    Confirmed { delta: f64 },
    /// The incoming value replaced the held one.
    Changed { previous: Value, delta: f64 },
    /// The keys differ; nothing was touched.
    KeyMismatch,
}

impl Update {
    /// Score change caused by the merge.
    pub fn delta(&self) -> f64 {
        match self {
            Update::Confirmed { delta } | Update::Changed { delta, .. } => *delta,
            Update::Inserted | Update::KeyMismatch => 0.0,
        }
    }
}

/// A single named fact with a value, an authority level and a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub key: String,
    pub value: Value,
    pub level: Level,
    #[serde(default)]
    pub score: f64,
}

impl Property {
    pub fn new(key: impl Into<String>, value: impl Into<Value>, level: Level) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            level,
            score: 0.0,
        }
    }

    pub fn immutable(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, value, Level::Immutable)
    }

    pub fn requested(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, value, Level::Requested)
    }

    pub fn informational(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, value, Level::Informational)
    }

    /// Matching equality.
    ///
    /// Two scalars are equal when keys and values match exactly. As soon as
    /// either side is a range, the values are equal when their numeric
    /// intervals overlap.
    pub fn equals(&self, other: &Property) -> bool {
        if self.key != other.key {
            return false;
        }
        match (&self.value, &other.value) {
            (Value::Scalar(a), Value::Scalar(b)) => a == b,
            (a, b) => a.overlap(b).is_some(),
        }
    }

    /// The value both properties agree on, if any: the overlap for numeric
    /// values, otherwise the shared scalar.
    pub fn common_value(&self, other: &Property) -> Option<Value> {
        if !self.equals(other) {
            return None;
        }
        self.value.overlap(&other.value).or_else(|| Some(self.value.clone()))
    }

    /// Merge `other` into this property.
    ///
    /// Fails with [`PropertyError::Immutable`] when `other` carries less
    /// authority than the held level, or when it would replace an immutable
    /// value with a disjoint one; the score is then pinned to
    /// [`VIOLATION_SCORE`] and nothing else changes. Otherwise the value is
    /// narrowed to the overlap (or replaced), the level is raised to
    /// `other.level`, and the score moves by `1 + rank`: up when the value
    /// was confirmed, down when it had to change.
    pub fn update(&mut self, other: &Property) -> Result<Update, PropertyError> {
        if self.key != other.key {
            return Ok(Update::KeyMismatch);
        }

        let changed = !self.equals(other);

        // an immutable value may be confirmed or narrowed, never replaced
        if other.level < self.level || (changed && self.level == Level::Immutable) {
            self.score = VIOLATION_SCORE;
            return Err(PropertyError::Immutable {
                key: self.key.clone(),
                current: self.level,
                incoming: other.level,
            });
        }

        let value = self
            .value
            .overlap(&other.value)
            .unwrap_or_else(|| other.value.clone());
        let previous = std::mem::replace(&mut self.value, value);
        self.level = other.level;

        let weight = self.level.weight();
        if changed {
            self.score -= weight;
            Ok(Update::Changed {
                previous,
                delta: -weight,
            })
        } else {
            self.score += weight;
            Ok(Update::Confirmed { delta: weight })
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.level {
            Level::Immutable => ('[', ']'),
            Level::Requested => ('(', ')'),
            Level::Informational => ('<', '>'),
        };
        write!(f, "{}{}|{}{}", open, self.key, self.value, close)?;
        if self.score > 0.0 {
            write!(f, "{:+.1}", self.score)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order() {
        assert!(Level::Immutable > Level::Requested);
        assert!(Level::Requested > Level::Informational);
        assert_eq!(Level::default(), Level::Requested);
    }

    #[test]
    fn test_scalar_equality() {
        assert!(Property::requested("k", "v").equals(&Property::requested("k", "v")));
        assert!(!Property::requested("k", "v1").equals(&Property::requested("k", "v2")));
        assert!(!Property::requested("k", "v").equals(&Property::requested("j", "v")));
        // level does not take part in equality
        assert!(Property::immutable("k", true).equals(&Property::informational("k", true)));
    }

    #[test]
    fn test_range_equality() {
        let r = Property::requested("fu", Value::range(10.0, 20.0).unwrap());
        assert!(r.equals(&Property::requested("fu", 13)));
        assert!(r.equals(&Property::requested("fu", Value::range(15.0, 30.0).unwrap())));
        assert!(!r.equals(&Property::requested("fu", 21)));
        assert!(!r.equals(&Property::requested("bar", 13)));
    }

    #[test]
    fn test_lower_level_update_fails() {
        let mut held = Property::requested("foo", "bar1");
        let err = held
            .update(&Property::informational("foo", "bar0"))
            .unwrap_err();
        assert_eq!(
            err,
            PropertyError::Immutable {
                key: "foo".into(),
                current: Level::Requested,
                incoming: Level::Informational,
            }
        );
        assert_eq!(held.value, Value::from("bar1"));
        assert_eq!(held.level, Level::Requested);
        assert_eq!(held.score, VIOLATION_SCORE);
    }

    #[test]
    fn test_higher_level_update_succeeds() {
        let mut held = Property::requested("foo", "bar1");
        let outcome = held.update(&Property::immutable("foo", "bar2")).unwrap();
        assert!(matches!(outcome, Update::Changed { .. }));
        assert_eq!(held.value, Value::from("bar2"));
        assert_eq!(held.level, Level::Immutable);
    }

    #[test]
    fn test_immutable_value_cannot_be_replaced() {
        let mut held = Property::immutable("MTU", 1500);
        assert!(held.update(&Property::immutable("MTU", 9600)).is_err());
        assert_eq!(held.value, Value::from(1500));
        assert_eq!(held.score, VIOLATION_SCORE);

        let mut held = Property::immutable("rate", Value::range(10.0, 20.0).unwrap());
        let outcome = held.update(&Property::immutable("rate", 12)).unwrap();
        assert_eq!(outcome, Update::Confirmed { delta: 3.0 });
        assert_eq!(held.value, Value::from(12));
    }

    #[test]
    fn test_unchanged_value_increases_score() {
        let mut held = Property::requested("mtu", 1500);
        let outcome = held.update(&Property::requested("mtu", 1500)).unwrap();
        assert_eq!(outcome, Update::Confirmed { delta: 2.0 });
        assert!(held.score > 0.0);
    }

    #[test]
    fn test_changed_value_decreases_score() {
        let mut held = Property::informational("mtu", 1500);
        let outcome = held.update(&Property::immutable("mtu", 9000)).unwrap();
        assert_eq!(outcome.delta(), -3.0);
        assert!(held.score < 0.0);
        assert_eq!(held.value, Value::from(9000));
    }

    #[test]
    fn test_update_narrows_range() {
        let mut held = Property::requested("rate", Value::range(10.0, 20.0).unwrap());
        held.update(&Property::requested("rate", Value::range(15.0, 30.0).unwrap()))
            .unwrap();
        assert_eq!(held.value, Value::range(15.0, 20.0).unwrap());

        held.update(&Property::requested("rate", 15)).unwrap();
        assert_eq!(held.value, Value::from(15));
        assert_eq!(held.score, 4.0);
    }

    #[test]
    fn test_key_mismatch_is_noop() {
        let mut held = Property::requested("a", 1);
        let outcome = held.update(&Property::immutable("b", 2)).unwrap();
        assert_eq!(outcome, Update::KeyMismatch);
        assert_eq!(held, Property::requested("a", 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Property::immutable("MTU", 9600).to_string(), "[MTU|9600]");
        assert_eq!(Property::requested("TCP", true).to_string(), "(TCP|true)");
        let mut p = Property::informational("rate", Value::range(1.0, 2.0).unwrap());
        assert_eq!(p.to_string(), "<rate|1-2>");
        p.score = 2.0;
        assert_eq!(p.to_string(), "<rate|1-2>+2.0");
    }
}
