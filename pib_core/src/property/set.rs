use super::{Level, Property, Update, Value};
use crate::error::PropertyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A mapping from key to [`Property`] that merges on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet {
    properties: BTreeMap<String, Property>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a property, merging it into an existing entry with the same key.
    ///
    /// An immutability violation from the merge is returned to the caller;
    /// the existing entry then keeps its value and level.
    pub fn insert(&mut self, property: Property) -> Result<Update, PropertyError> {
        match self.properties.get_mut(&property.key) {
            Some(existing) => existing.update(&property),
            None => {
                self.properties.insert(property.key.clone(), property);
                Ok(Update::Inserted)
            }
        }
    }

    /// Store a property, overwriting any existing entry without merging.
    pub fn put(&mut self, property: Property) -> Option<Property> {
        self.properties.insert(property.key.clone(), property)
    }

    /// Insert every `(key, value)` pair at the given level.
    pub fn extend_at<I, K, V>(&mut self, level: Level, pairs: I) -> Result<(), PropertyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in pairs {
            self.insert(Property::new(key, value, level))?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Property> {
        self.properties.remove(key)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Sum of all contained scores.
    pub fn score(&self) -> f64 {
        self.properties.values().map(|p| p.score).sum()
    }

    /// Properties present in both sets whose values match.
    ///
    /// Each entry keeps this set's level and carries the value both sides
    /// agree on (the overlap for numeric values).
    pub fn intersection(&self, other: &PropertySet) -> PropertySet {
        let mut result = PropertySet::new();
        for property in self.properties.values() {
            let Some(theirs) = other.get(&property.key) else {
                continue;
            };
            if let Some(value) = property.common_value(theirs) {
                result.put(Property::new(property.key.clone(), value, property.level));
            }
        }
        result
    }

    /// Whether both sets hold the same keys with identical values.
    /// Levels and scores are ignored.
    pub fn same_contents(&self, other: &PropertySet) -> bool {
        self.len() == other.len()
            && self.properties.iter().all(|(key, ours)| {
                other
                    .get(key)
                    .map(|theirs| ours.value == theirs.value)
                    .unwrap_or(false)
            })
    }
}

impl FromIterator<Property> for PropertySet {
    /// Collects by overwriting; use [`PropertySet::insert`] to merge.
    fn from_iter<T: IntoIterator<Item = Property>>(iter: T) -> Self {
        let mut set = PropertySet::new();
        for property in iter {
            set.put(property);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = &'a Property;
    type IntoIter = std::collections::btree_map::Values<'a, String, Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.properties.values()
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, property) in self.properties.values().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", property)?;
        }
        write!(f, "}}")
    }
}
