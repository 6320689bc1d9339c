use crate::candidate::Candidate;
use crate::error::PropertyError;
use crate::property::{Level, PropertySet, Value};
use crate::store::{LookupReport, PolicyStore};
use std::fmt;

/// A bundle of seed properties and the candidates derived from them.
#[derive(Debug, Clone, Default)]
pub struct Request {
    properties: PropertySet,
    candidates: Vec<Candidate>,
}

impl Request {
    /// Build a request from properties partitioned by level.
    ///
    /// Immutable properties are inserted first, then requested, then
    /// informational; a lower group contradicting a higher one fails.
    pub fn new<I, K, V>(immutable: I, requested: I, informational: I) -> Result<Self, PropertyError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut properties = PropertySet::new();
        properties.extend_at(Level::Immutable, immutable)?;
        properties.extend_at(Level::Requested, requested)?;
        properties.extend_at(Level::Informational, informational)?;
        Ok(Self::from_properties(properties))
    }

    pub fn from_properties(properties: PropertySet) -> Self {
        Self {
            properties,
            candidates: Vec::new(),
        }
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// A fresh candidate seeded from a copy of the request properties.
    pub fn candidate(&self) -> Candidate {
        Candidate::new(&self.properties)
    }

    pub fn push_candidate(&mut self, candidate: Candidate) {
        self.candidates.push(candidate);
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Run the store's bulk lookup over this request's candidates.
    pub fn lookup_all(&mut self, store: &PolicyStore) -> LookupReport {
        store.lookup_all(&mut self.candidates)
    }

    /// Surviving candidates, best score first.
    pub fn ranked(&self) -> Vec<&Candidate> {
        let mut ranked: Vec<&Candidate> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));
        ranked
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Request: {} candidates, {} properties>",
            self.candidates.len(),
            self.properties.len()
        )
    }
}
