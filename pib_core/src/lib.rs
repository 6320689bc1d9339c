//! # PIB core
//!
//! `pib_core` is a Policy Information Base for property negotiation. It
//! decides which administrator-defined policies apply to a set of
//! connection candidates, rejects candidates whose immutable properties
//! would be overridden, and scores the survivors.
//!
//! Key concepts:
//!
//! 1. **Property**: a `(key, value)` fact with an authority [`Level`] and a
//!    preference score. Values are scalars or numeric ranges.
//!
//! 2. **Policy**: a match set used as a predicate and an action set that is
//!    merged into a candidate when the predicate holds.
//!
//! 3. **PolicyStore**: the PIB itself, holding policies ordered from the
//!    most general to the most specific and applying them to candidates.

pub mod candidate;
pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod loader;
pub mod policy;
pub mod property;
pub mod record;
pub mod request;
pub mod store;

pub use candidate::Candidate;
pub use config::PibConfig;
pub use error::{PibError, PropertyError};
pub use events::{EventLog, EventRecord, EventStats, PibEvent};
pub use id::{CandidateId, PolicyId};
pub use loader::{load_policies, load_policy, load_store, LoadReport};
pub use policy::{MatchMode, Policy};
pub use property::{Level, Property, PropertySet, Range, Token, Update, Value};
pub use record::{LevelGroups, PolicyRecord};
pub use request::Request;
pub use store::{LookupReport, PolicyStore};

pub type Result<T> = std::result::Result<T, PibError>;
