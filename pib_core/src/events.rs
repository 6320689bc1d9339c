//! Observable events of registration and lookup.
//!
//! The store reports what it did by appending [`PibEvent`]s to a
//! caller-supplied [`EventLog`]. The log can be folded into [`EventStats`].

use crate::id::{CandidateId, PolicyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PibEvent {
    PolicyRegistered {
        policy_id: PolicyId,
        name: String,
        match_len: usize,
    },
    PolicyRejected {
        name: String,
    },
    PolicyUnregistered {
        policy_id: PolicyId,
    },
    PolicyMatched {
        candidate_id: CandidateId,
        policy_id: PolicyId,
    },
    PropertyInserted {
        candidate_id: CandidateId,
        policy_id: PolicyId,
        key: String,
    },
    PropertyConfirmed {
        candidate_id: CandidateId,
        policy_id: PolicyId,
        key: String,
        delta: f64,
    },
    PropertyChanged {
        candidate_id: CandidateId,
        policy_id: PolicyId,
        key: String,
        delta: f64,
    },
    ImmutabilityViolation {
        candidate_id: CandidateId,
        policy_id: PolicyId,
        reason: String,
    },
    CandidateInvalidated {
        candidate_id: CandidateId,
    },
}

impl PibEvent {
    /// The candidate this event concerns, if any.
    pub fn candidate_id(&self) -> Option<CandidateId> {
        match self {
            PibEvent::PolicyMatched { candidate_id, .. }
            | PibEvent::PropertyInserted { candidate_id, .. }
            | PibEvent::PropertyConfirmed { candidate_id, .. }
            | PibEvent::PropertyChanged { candidate_id, .. }
            | PibEvent::ImmutabilityViolation { candidate_id, .. }
            | PibEvent::CandidateInvalidated { candidate_id } => Some(*candidate_id),
            PibEvent::PolicyRegistered { .. }
            | PibEvent::PolicyRejected { .. }
            | PibEvent::PolicyUnregistered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub event: PibEvent,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}", self.timestamp, self.event)
    }
}

/// Append-only event sink shared by clones.
#[derive(Debug, Clone)]
pub struct EventLog {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn append(&self, event: PibEvent) {
        let record = EventRecord {
            timestamp: Utc::now(),
            event,
        };
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }

    pub fn all(&self) -> Vec<EventRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn events(&self) -> Vec<PibEvent> {
        self.all().into_iter().map(|record| record.event).collect()
    }

    /// Events concerning one candidate, in order.
    pub fn for_candidate(&self, candidate_id: CandidateId) -> Vec<PibEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.candidate_id() == Some(candidate_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> EventStats {
        let mut stats = EventStats::new();
        for record in self.all() {
            stats.process_event(&record.event);
        }
        stats
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters over a sequence of events.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventStats {
    pub policies_registered: usize,
    pub policies_rejected: usize,
    pub matches: usize,
    pub insertions: usize,
    pub confirmations: usize,
    pub changes: usize,
    pub violations: usize,
    pub candidates_invalidated: usize,
    pub score_delta: f64,
}

impl EventStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &PibEvent) {
        match event {
            PibEvent::PolicyRegistered { .. } => self.policies_registered += 1,
            PibEvent::PolicyRejected { .. } => self.policies_rejected += 1,
            PibEvent::PolicyUnregistered { .. } => {}
            PibEvent::PolicyMatched { .. } => self.matches += 1,
            PibEvent::PropertyInserted { .. } => self.insertions += 1,
            PibEvent::PropertyConfirmed { delta, .. } => {
                self.confirmations += 1;
                self.score_delta += delta;
            }
            PibEvent::PropertyChanged { delta, .. } => {
                self.changes += 1;
                self.score_delta += delta;
            }
            PibEvent::ImmutabilityViolation { .. } => self.violations += 1,
            PibEvent::CandidateInvalidated { .. } => self.candidates_invalidated += 1,
        }
    }
}
