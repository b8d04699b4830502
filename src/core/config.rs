use crate::builders::rules::DEFAULT_RESOLVER;
use crate::core::error::{PruneError, Result};
use crate::core::git::Backend;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Checkout directory of the upstream list, next to the executable.
pub const DEFAULT_LIST_DIR: &str = "dnsmasq-china-list";
/// File inside that checkout the tool edits.
pub const DEFAULT_LIST_FILE: &str = "accelerated-domains.china.conf";

/// Pause after each commit, in milliseconds.
pub const DEFAULT_COMMIT_DELAY_MS: u64 = 1000;
/// Longest wait for a foreign `index.lock`, in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;

pub const DEFAULT_COMMIT_DELAY: Duration = Duration::from_millis(DEFAULT_COMMIT_DELAY_MS);
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS);

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct PruneSettings {
    pub config_path: PathBuf,
    pub resolver: String,
    pub backend: Backend,
    /// Pause after every commit, so consecutive commits get distinct timestamps.
    pub commit_delay: Duration,
    pub lock_timeout: Duration,
    pub dry_run: bool,
}

impl PruneSettings {
    /// Settings with every default applied, targeting `config_path`.
    pub fn for_path(config_path: PathBuf) -> Self {
        Self {
            config_path,
            resolver: DEFAULT_RESOLVER.to_string(),
            backend: Backend::default(),
            commit_delay: DEFAULT_COMMIT_DELAY,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            dry_run: false,
        }
    }
}

/// Location of the list relative to a base directory.
pub fn config_path_in(base: &Path) -> PathBuf {
    base.join(DEFAULT_LIST_DIR).join(DEFAULT_LIST_FILE)
}

/// Resolves the target file: an explicit path wins, otherwise the list is
/// looked up next to the running executable.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let exe = std::env::current_exe().map_err(|e| PruneError::io("<current executable>", e))?;
    let base = exe.parent().unwrap_or_else(|| Path::new("."));
    Ok(config_path_in(base))
}
