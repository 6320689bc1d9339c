use crate::id::PolicyId;
use crate::property::Level;
use thiserror::Error;

/// Failures raised by the property value model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropertyError {
    #[error("property {key} is {current}: won't update from {incoming}")]
    Immutable {
        key: String,
        current: Level,
        incoming: Level,
    },

    #[error("invalid property range: {lo}-{hi}")]
    MalformedRange { lo: f64, hi: f64 },
}

/// Errors surfaced by the policy information base.
#[derive(Debug, Error)]
pub enum PibError {
    #[error("Property error: {0}")]
    Property(#[from] PropertyError),

    #[error("Policy match fields already registered, skipping policy {name}")]
    DuplicatePolicy { name: String },

    #[error("Policy not found: {0}")]
    PolicyNotFound(PolicyId),

    #[error("Invalid policy record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PibError {
    /// Whether this error is an immutability violation raised while merging.
    pub fn is_immutability_violation(&self) -> bool {
        matches!(self, PibError::Property(PropertyError::Immutable { .. }))
    }
}
