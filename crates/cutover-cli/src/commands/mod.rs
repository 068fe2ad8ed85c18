pub mod deploy;
pub mod history;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use cutover_core::CutoverConfig;

/// Load the config and return it with its absolute path.
pub fn load_config(path: &Path) -> anyhow::Result<(CutoverConfig, PathBuf)> {
    let path = std::fs::canonicalize(path)
        .with_context(|| format!("config file {} not found", path.display()))?;
    let config = CutoverConfig::from_file(&path)?;
    debug!(path = %path.display(), service = %config.service.name, "config loaded");
    Ok((config, path))
}
