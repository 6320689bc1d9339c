use crate::error::PropertyError;
use crate::id::{CandidateId, PolicyId};
use crate::property::{Property, PropertySet, Update};
use std::fmt;

/// One hypothetical connection configuration under evaluation.
#[derive(Debug, Clone)]
pub struct Candidate {
    id: CandidateId,
    pub properties: PropertySet,
    applied_policies: Vec<PolicyId>,
    invalid: bool,
}

impl Candidate {
    /// Create a candidate from a copy of `seed`. Later changes to the
    /// candidate never reach the seed set.
    pub fn new(seed: &PropertySet) -> Self {
        Self {
            id: CandidateId::new(),
            properties: seed.clone(),
            applied_policies: Vec::new(),
            invalid: false,
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    /// Add a single property to the candidate.
    pub fn add(&mut self, property: Property) -> Result<Update, PropertyError> {
        self.properties.insert(property)
    }

    /// Identifiers of the applied policies, in application order.
    pub fn applied_policies(&self) -> &[PolicyId] {
        &self.applied_policies
    }

    pub fn has_applied(&self, policy_id: PolicyId) -> bool {
        self.applied_policies.contains(&policy_id)
    }

    pub(crate) fn record_policy(&mut self, policy_id: PolicyId) {
        if !self.has_applied(policy_id) {
            self.applied_policies.push(policy_id);
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub fn mark_invalid(&mut self) {
        self.invalid = true;
    }

    /// Preference score: the sum of all property scores.
    pub fn score(&self) -> f64 {
        self.properties.score()
    }
}

impl Default for Candidate {
    fn default() -> Self {
        Self::new(&PropertySet::new())
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let policies: Vec<String> = self.applied_policies.iter().map(|id| id.to_string()).collect();
        write!(
            f,
            "properties: {}, applied policies: [{}]",
            self.properties,
            policies.join(", ")
        )
    }
}
