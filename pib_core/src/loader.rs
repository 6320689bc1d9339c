use crate::config::PibConfig;
use crate::error::PibError;
use crate::policy::Policy;
use crate::record::PolicyRecord;
use crate::store::PolicyStore;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Outcome of loading a policy directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<PathBuf>,
    /// Files whose match set duplicated an already registered policy.
    pub skipped: Vec<PathBuf>,
    /// Files that could not be read or decoded.
    pub failed: Vec<PathBuf>,
}

/// Read and decode a single policy file.
pub fn load_policy<P: AsRef<Path>>(path: P) -> Result<Policy> {
    let path = path.as_ref();
    debug!("Loading policy from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    PolicyRecord::from_json(&content)?.to_policy()
}

/// Register every policy file in `dir` with the given extension.
///
/// Files are visited in name order. A file that cannot be read or decoded
/// is logged and counted as failed; the remaining files are still loaded.
pub fn load_policies<P: AsRef<Path>>(
    store: &mut PolicyStore,
    dir: P,
    extension: &str,
) -> Result<LoadReport> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == extension))
        .collect();
    paths.sort();

    let mut report = LoadReport::default();
    for path in paths {
        info!("loading policy {}", path.display());
        let policy = match load_policy(&path) {
            Ok(policy) => policy,
            Err(e) => {
                error!("Error loading policy file {}: {}", path.display(), e);
                report.failed.push(path);
                continue;
            }
        };
        match store.register(policy) {
            Ok(_) => report.loaded.push(path),
            Err(PibError::DuplicatePolicy { .. }) => report.skipped.push(path),
            Err(e) => {
                warn!("Could not register {}: {}", path.display(), e);
                report.failed.push(path);
            }
        }
    }
    Ok(report)
}

/// Build a store configured by `config` and load its policy directory.
pub fn load_store(config: &PibConfig) -> Result<(PolicyStore, LoadReport)> {
    let mut store = PolicyStore::with_config(config);
    let report = load_policies(&mut store, &config.policy_dir, &config.policy_extension)?;
    Ok((store, report))
}
