//! Policies: a match predicate paired with the properties to apply on match.

use crate::error::PropertyError;
use crate::id::PolicyId;
use crate::property::{Level, Property, PropertySet, Update, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many match keys must be satisfied for a policy to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// One satisfied key is enough.
    #[default]
    Any,
    /// Every key of the match set must be satisfied.
    All,
}

/// An administrator-defined policy.
#[derive(Debug, Clone)]
pub struct Policy {
    id: PolicyId,
    pub name: String,
    pub description: Option<String>,
    /// Advisory only; store order is decided by match specificity.
    pub priority: i64,
    pub match_set: PropertySet,
    pub action_set: PropertySet,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PolicyId::new(),
            name: name.into(),
            description: None,
            priority: 0,
            match_set: PropertySet::new(),
            action_set: PropertySet::new(),
        }
    }

    pub fn id(&self) -> PolicyId {
        self.id
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Add a match requirement, overwriting any previous one for the key.
    pub fn with_match(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        level: Level,
    ) -> Self {
        self.match_set.put(Property::new(key, value, level));
        self
    }

    /// Add an action property, overwriting any previous one for the key.
    pub fn with_action(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        level: Level,
    ) -> Self {
        self.action_set.put(Property::new(key, value, level));
        self
    }

    /// Match specificity: the number of constrained keys.
    pub fn match_len(&self) -> usize {
        self.match_set.len()
    }

    /// Whether the match set is satisfied by `properties`, any-of semantics.
    pub fn compare(&self, properties: &PropertySet, strict: bool) -> bool {
        self.compare_with(properties, strict, MatchMode::Any)
    }

    /// Whether the match set is satisfied by `properties`.
    ///
    /// An empty match set always matches. A match key counts when the
    /// candidate holds an equal property; under `strict` the candidate's
    /// property must also be at least as authoritative as the requirement.
    pub fn compare_with(&self, properties: &PropertySet, strict: bool, mode: MatchMode) -> bool {
        if self.match_set.is_empty() {
            return true;
        }

        let common = self.match_set.intersection(properties);
        let counts = |key: &str| {
            if !strict {
                return true;
            }
            match (properties.get(key), self.match_set.get(key)) {
                (Some(held), Some(required)) => held.level >= required.level,
                _ => false,
            }
        };

        match mode {
            MatchMode::Any => common.keys().any(counts),
            MatchMode::All => common.len() == self.match_len() && common.keys().all(counts),
        }
    }

    /// Insert every action property into `properties`.
    ///
    /// Stops at the first immutability violation; actions inserted before it
    /// stay applied.
    pub fn apply(
        &self,
        properties: &mut PropertySet,
    ) -> Result<Vec<(String, Update)>, PropertyError> {
        let mut updates = Vec::with_capacity(self.action_set.len());
        for action in &self.action_set {
            let outcome = properties.insert(action.clone())?;
            updates.push((action.key.clone(), outcome));
        }
        Ok(updates)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "POLICY {}: {}  ==>  {}",
            self.name, self.match_set, self.action_set
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wired_policy() -> Policy {
        Policy::new("bulk")
            .with_match("is_wired_interface", true, Level::Requested)
            .with_action("MTU", 9600, Level::Immutable)
    }

    #[test]
    fn test_wildcard_matches_everything() {
        let policy = Policy::new("default").with_action("TCP_CC", "cubic", Level::Requested);
        assert!(policy.compare(&PropertySet::new(), true));

        let props: PropertySet = [Property::informational("anything", 1)].into_iter().collect();
        assert!(policy.compare(&props, true));
        assert!(policy.compare_with(&props, true, MatchMode::All));
    }

    #[test]
    fn test_strict_compare_respects_level() {
        let policy = Policy::new("p").with_match("secure", true, Level::Immutable);

        let informational: PropertySet =
            [Property::informational("secure", true)].into_iter().collect();
        assert!(!policy.compare(&informational, true));
        assert!(policy.compare(&informational, false));

        let immutable: PropertySet = [Property::immutable("secure", true)].into_iter().collect();
        assert!(policy.compare(&immutable, true));
    }

    #[test]
    fn test_compare_value_mismatch() {
        let props: PropertySet = [Property::requested("is_wired_interface", false)]
            .into_iter()
            .collect();
        assert!(!wired_policy().compare(&props, false));
    }

    #[test]
    fn test_any_versus_all() {
        let policy = Policy::new("fast-wired")
            .with_match("is_wired_interface", true, Level::Requested)
            .with_match(
                "interface_speed",
                Value::range(1000.0, 100000.0).unwrap(),
                Level::Requested,
            );

        let props: PropertySet = [
            Property::requested("is_wired_interface", true),
            Property::requested("interface_speed", 100),
        ]
        .into_iter()
        .collect();

        assert!(policy.compare(&props, true));
        assert!(!policy.compare_with(&props, true, MatchMode::All));
    }

    #[test]
    fn test_apply_inserts_actions() {
        let mut props: PropertySet = [Property::requested("is_wired_interface", true)]
            .into_iter()
            .collect();
        let updates = wired_policy().apply(&mut props).unwrap();
        assert_eq!(updates, vec![("MTU".to_string(), Update::Inserted)]);

        let mtu = props.get("MTU").unwrap();
        assert_eq!(mtu.value, Value::from(9600));
        assert_eq!(mtu.level, Level::Immutable);
    }

    #[test]
    fn test_apply_keeps_prefix_on_violation() {
        let policy = Policy::new("p")
            .with_action("a_first", 1, Level::Requested)
            .with_action("b_second", 2, Level::Requested);
        let mut props: PropertySet = [Property::immutable("b_second", 3)].into_iter().collect();

        assert!(policy.apply(&mut props).is_err());
        assert!(props.contains_key("a_first"));
        assert_eq!(props.get("b_second").unwrap().value, Value::from(3));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            wired_policy().to_string(),
            "POLICY bulk: {(is_wired_interface|true)}  ==>  {[MTU|9600]}"
        );
    }
}
