//! Filesystem adapters for redline.
//!
//! Data directory resolution plus the artifact writer that stores finished
//! runs under `{data_dir}/runs/{run_id}/`.

pub mod artifacts;

use std::path::{Path, PathBuf};

use redline_types::run::RunId;

pub use artifacts::FsArtifactWriter;

pub const DATA_DIR_ENV: &str = "REDLINE_DATA_DIR";

/// Directory holding every artifact of one run: `{data_dir}/runs/{run_id}/`.
pub fn run_dir(data_dir: &Path, run_id: &RunId) -> PathBuf {
    data_dir.join("runs").join(run_id.to_string())
}

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `REDLINE_DATA_DIR` environment variable
/// 2. `~/.redline`
/// 3. `./.redline`
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var(DATA_DIR_ENV).ok().filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".redline");
    }

    PathBuf::from(".redline")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_layout() {
        let id = RunId::new();
        let dir = run_dir(Path::new("/data"), &id);
        assert_eq!(dir, PathBuf::from(format!("/data/runs/{id}")));
    }

    #[test]
    fn test_resolve_data_dir_is_not_empty() {
        assert!(!resolve_data_dir().as_os_str().is_empty());
    }
}
