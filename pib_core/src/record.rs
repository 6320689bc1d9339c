//! Decoded policy records.
//!
//! A record is the already-parsed shape of a policy definition: a name, a
//! priority, and match and action groups partitioned by level.

use crate::error::PibError;
use crate::policy::Policy;
use crate::property::{Level, Property, PropertySet, Token, Value};
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value maps partitioned by property level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelGroups {
    pub immutable: BTreeMap<String, serde_json::Value>,
    pub requested: BTreeMap<String, serde_json::Value>,
    pub informational: BTreeMap<String, serde_json::Value>,
}

impl LevelGroups {
    /// Groups from least to most authoritative.
    fn by_level(&self) -> [(Level, &BTreeMap<String, serde_json::Value>); 3] {
        [
            (Level::Informational, &self.informational),
            (Level::Requested, &self.requested),
            (Level::Immutable, &self.immutable),
        ]
    }

    /// Flatten into a property set. A key present in several groups keeps
    /// the most authoritative one; no scoring takes place.
    pub fn to_property_set(&self) -> Result<PropertySet, PibError> {
        let mut set = PropertySet::new();
        for (level, group) in self.by_level() {
            for (key, raw) in group {
                set.put(Property::new(key.clone(), decode_value(key, raw)?, level));
            }
        }
        Ok(set)
    }

    /// Merge the groups into a request, most authoritative first.
    pub fn to_request(&self) -> Result<Request, PibError> {
        let decode = |group: &BTreeMap<String, serde_json::Value>| {
            group
                .iter()
                .map(|(key, raw)| -> Result<(String, Value), PibError> {
                    Ok((key.clone(), decode_value(key, raw)?))
                })
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(Request::new(
            decode(&self.immutable)?,
            decode(&self.requested)?,
            decode(&self.informational)?,
        )?)
    }
}

/// Priority as found in policy files: an integer or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Number(i64),
    Text(String),
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Number(0)
    }
}

impl Priority {
    pub fn value(&self) -> Result<i64, PibError> {
        match self {
            Priority::Number(n) => Ok(*n),
            Priority::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| {
                    PibError::InvalidRecord(format!("priority is not an integer: {:?}", s))
                }),
        }
    }
}

fn default_name() -> String {
    "NA".to_string()
}

/// A policy definition as decoded from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, rename = "match")]
    pub match_groups: LevelGroups,

    #[serde(default, rename = "properties")]
    pub action_groups: LevelGroups,
}

impl PolicyRecord {
    pub fn from_json(json: &str) -> Result<Self, PibError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build a policy with a fresh identifier from this record.
    pub fn to_policy(&self) -> Result<Policy, PibError> {
        let mut policy = Policy::new(self.name.clone()).with_priority(self.priority.value()?);
        policy.description = self.description.clone();
        policy.match_set = self.match_groups.to_property_set()?;
        policy.action_set = self.action_groups.to_property_set()?;
        Ok(policy)
    }
}

impl TryFrom<PolicyRecord> for Policy {
    type Error = PibError;

    fn try_from(record: PolicyRecord) -> Result<Self, Self::Error> {
        record.to_policy()
    }
}

impl Policy {
    pub fn from_record(record: &PolicyRecord) -> Result<Self, PibError> {
        record.to_policy()
    }
}

/// Decode a JSON value into a property value.
///
/// Booleans, numbers and strings become scalars; a two-element numeric
/// array becomes a range.
pub fn decode_value(key: &str, raw: &serde_json::Value) -> Result<Value, PibError> {
    use serde_json::Value as Json;

    match raw {
        Json::Bool(b) => Ok(Value::Scalar(Token::Bool(*b))),
        Json::Number(n) => n
            .as_f64()
            .map(|n| Value::Scalar(Token::Number(n)))
            .ok_or_else(|| PibError::InvalidRecord(format!("{}: number out of range", key))),
        Json::String(s) => Ok(Value::Scalar(Token::Text(s.clone()))),
        Json::Array(items) => match items.as_slice() {
            [Json::Number(lo), Json::Number(hi)] => match (lo.as_f64(), hi.as_f64()) {
                (Some(lo), Some(hi)) => Ok(Value::range(lo, hi)?),
                _ => Err(PibError::InvalidRecord(format!("{}: range bound out of range", key))),
            },
            _ => Err(PibError::InvalidRecord(format!(
                "{}: a range must be two numbers, got {}",
                key, raw
            ))),
        },
        Json::Null | Json::Object(_) => Err(PibError::InvalidRecord(format!(
            "{}: unsupported value {}",
            key, raw
        ))),
    }
}
