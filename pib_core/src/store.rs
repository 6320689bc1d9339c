//! The Policy Information Base.
//!
//! Policies are kept ordered by match specificity: policies with fewer
//! match keys come first, so more specific policies are applied later and
//! may override what general ones set.

use crate::candidate::Candidate;
use crate::config::PibConfig;
use crate::error::{PibError, PropertyError};
use crate::events::{EventLog, PibEvent};
use crate::id::{CandidateId, PolicyId};
use crate::policy::{MatchMode, Policy};
use crate::property::{PropertySet, Update};
use crate::Result;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

/// Ordered collection of registered policies.
#[derive(Debug, Clone)]
pub struct PolicyStore {
    // Ids sorted ascending by match length, registration order within ties
    order: Vec<PolicyId>,
    index: HashMap<PolicyId, Policy>,
    match_mode: MatchMode,
    strict: bool,
    event_log: Option<EventLog>,
}

/// Result of a bulk lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupReport {
    /// Number of candidates processed.
    pub evaluated: usize,
    /// Candidates removed from the list.
    pub invalidated: Vec<CandidateId>,
}

impl LookupReport {
    pub fn retained(&self) -> usize {
        self.evaluated - self.invalidated.len()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            index: HashMap::new(),
            match_mode: MatchMode::Any,
            strict: true,
            event_log: None,
        }
    }

    /// Create a store that matches according to `config`.
    pub fn with_config(config: &PibConfig) -> Self {
        Self {
            match_mode: config.match_mode,
            strict: config.strict,
            ..Self::new()
        }
    }

    /// Attach a sink for registration and lookup events.
    pub fn with_event_log(mut self, event_log: EventLog) -> Self {
        self.event_log = Some(event_log);
        self
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    fn emit(&self, event: PibEvent) {
        if let Some(log) = &self.event_log {
            log.append(event);
        }
    }

    /// Register a policy.
    ///
    /// Fails with [`PibError::DuplicatePolicy`] when a policy with the same
    /// match set is already registered; the store is left unchanged.
    pub fn register(&mut self, policy: Policy) -> Result<PolicyId> {
        if self
            .index
            .values()
            .any(|existing| existing.match_set.same_contents(&policy.match_set))
        {
            warn!(
                "Policy match fields already registered. Skipping policy {}",
                policy.name
            );
            self.emit(PibEvent::PolicyRejected {
                name: policy.name.clone(),
            });
            return Err(PibError::DuplicatePolicy { name: policy.name });
        }

        let id = policy.id();
        let match_len = policy.match_len();
        let index = &self.index;
        let position = self.order.partition_point(|other| {
            index
                .get(other)
                .map(|p| p.match_len() <= match_len)
                .unwrap_or(true)
        });

        debug!("Registering policy {} at position {}", policy.name, position);
        self.emit(PibEvent::PolicyRegistered {
            policy_id: id,
            name: policy.name.clone(),
            match_len,
        });
        self.order.insert(position, id);
        self.index.insert(id, policy);
        Ok(id)
    }

    /// Remove a registered policy.
    pub fn unregister(&mut self, policy_id: PolicyId) -> Result<Policy> {
        let policy = self
            .index
            .remove(&policy_id)
            .ok_or(PibError::PolicyNotFound(policy_id))?;
        self.order.retain(|id| *id != policy_id);
        debug!("Unregistered policy {}", policy.name);
        self.emit(PibEvent::PolicyUnregistered { policy_id });
        Ok(policy)
    }

    pub fn get(&self, policy_id: PolicyId) -> Option<&Policy> {
        self.index.get(&policy_id)
    }

    /// Policies in match order.
    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.order.iter().filter_map(|id| self.index.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The match sets of all policies, in match order.
    pub fn matches(&self) -> Vec<&PropertySet> {
        self.iter().map(|policy| &policy.match_set).collect()
    }

    /// Policies whose match set is satisfied by `properties`, without
    /// applying anything.
    pub fn matching(&self, properties: &PropertySet) -> Vec<PolicyId> {
        self.iter()
            .filter(|policy| policy.compare_with(properties, self.strict, self.match_mode))
            .map(Policy::id)
            .collect()
    }

    /// Match every policy against the candidate, in specificity order.
    ///
    /// With `apply`, each matching policy's actions are inserted into the
    /// candidate and its id recorded; later policies see the updated
    /// properties. An immutability violation stops the lookup and is
    /// returned, leaving already applied actions in place.
    pub fn lookup(
        &self,
        candidate: &mut Candidate,
        apply: bool,
    ) -> std::result::Result<Vec<PolicyId>, PropertyError> {
        if !apply {
            return Ok(self.matching(&candidate.properties));
        }

        let candidate_id = candidate.id();
        let mut matched = Vec::new();

        for policy in self.iter() {
            if !policy.compare_with(&candidate.properties, self.strict, self.match_mode) {
                continue;
            }

            let policy_id = policy.id();
            info!("Candidate {} matched {}", candidate_id, policy);
            self.emit(PibEvent::PolicyMatched {
                candidate_id,
                policy_id,
            });
            matched.push(policy_id);

            let updates = match policy.apply(&mut candidate.properties) {
                Ok(updates) => updates,
                Err(e) => {
                    debug!(
                        "Applying {} to candidate {} failed: {}",
                        policy.name, candidate_id, e
                    );
                    self.emit(PibEvent::ImmutabilityViolation {
                        candidate_id,
                        policy_id,
                        reason: e.to_string(),
                    });
                    return Err(e);
                }
            };

            for (key, update) in updates {
                self.emit_update(candidate_id, policy_id, key, update);
            }
            candidate.record_policy(policy_id);
        }

        Ok(matched)
    }

    fn emit_update(
        &self,
        candidate_id: CandidateId,
        policy_id: PolicyId,
        key: String,
        update: Update,
    ) {
        let event = match update {
            Update::Inserted => PibEvent::PropertyInserted {
                candidate_id,
                policy_id,
                key,
            },
            Update::Confirmed { delta } => PibEvent::PropertyConfirmed {
                candidate_id,
                policy_id,
                key,
                delta,
            },
            Update::Changed { delta, .. } => PibEvent::PropertyChanged {
                candidate_id,
                policy_id,
                key,
                delta,
            },
            Update::KeyMismatch => {
                debug!(
                    "Policy {} produced a key mismatch for {} on candidate {}",
                    policy_id, key, candidate_id
                );
                return;
            }
        };
        self.emit(event);
    }

    /// Apply all policies to every candidate and drop the invalid ones.
    ///
    /// A candidate whose lookup hits an immutability violation is marked
    /// invalid. Once all candidates are processed, every invalid candidate
    /// is removed from `candidates`.
    pub fn lookup_all(&self, candidates: &mut Vec<Candidate>) -> LookupReport {
        for (i, candidate) in candidates.iter_mut().enumerate() {
            if let Err(e) = self.lookup(candidate, true) {
                warn!("Candidate {} is invalidated due to policy: {}", i, e);
                candidate.mark_invalid();
            }
        }

        let invalidated: Vec<CandidateId> = candidates
            .iter()
            .filter(|candidate| candidate.is_invalid())
            .map(Candidate::id)
            .collect();
        for candidate_id in &invalidated {
            self.emit(PibEvent::CandidateInvalidated {
                candidate_id: *candidate_id,
            });
        }

        let evaluated = candidates.len();
        candidates.retain(|candidate| !candidate.is_invalid());

        LookupReport {
            evaluated,
            invalidated,
        }
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PolicyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===== PIB START =====")?;
        for policy in self.iter() {
            writeln!(f, "{}", policy)?;
        }
        write!(f, "===== PIB END =====")
    }
}
