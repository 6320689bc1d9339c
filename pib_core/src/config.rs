use crate::error::PibError;
use crate::policy::MatchMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_POLICY_DIR: &str = "policies";
pub const DEFAULT_POLICY_EXTENSION: &str = "policy";

/// Settings for loading policies and matching candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PibConfig {
    /// Directory scanned for policy files.
    pub policy_dir: PathBuf,

    /// File extension of policy files, without the dot.
    pub policy_extension: String,

    /// How many match keys a policy needs satisfied.
    pub match_mode: MatchMode,

    /// Whether a candidate property must be at least as authoritative as
    /// the match requirement it satisfies.
    pub strict: bool,
}

impl Default for PibConfig {
    fn default() -> Self {
        Self {
            policy_dir: PathBuf::from(DEFAULT_POLICY_DIR),
            policy_extension: DEFAULT_POLICY_EXTENSION.to_string(),
            match_mode: MatchMode::Any,
            strict: true,
        }
    }
}

impl PibConfig {
    /// Read a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PibError> {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }
}

impl FromStr for PibConfig {
    type Err = PibError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config: PibConfig = "".parse().unwrap();
        assert_eq!(config, PibConfig::default());
        assert!(config.strict);
        assert_eq!(config.match_mode, MatchMode::Any);
    }

    #[test]
    fn test_partial_config() {
        let config: PibConfig = r#"
            policy_dir = "/etc/pib"
            match_mode = "all"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.policy_dir, PathBuf::from("/etc/pib"));
        assert_eq!(config.match_mode, MatchMode::All);
        assert_eq!(config.policy_extension, "policy");
    }

    #[test]
    fn test_invalid_config() {
        let result: Result<PibConfig, _> = "match_mode = \"some\"".parse();
        assert!(matches!(result, Err(PibError::Toml(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "strict = false").unwrap();
        let config = PibConfig::from_file(file.path()).unwrap();
        assert!(!config.strict);
    }
}
