//! Rollback script generation.
//!
//! After a successful forward deployment a shell script is written that
//! re-invokes cutover with the previous version in rollback mode. Running
//! it is the whole rollback procedure.

use std::path::{Path, PathBuf};

use tracing::info;

use cutover_core::Slot;
use cutover_state::{StateError, StateResult, write_atomic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackArtifact {
    pub path: PathBuf,
    pub previous_version: String,
    pub previous_slot: Slot,
}

/// Render and write the rollback script, executable by the owner.
pub fn write_rollback_artifact(
    path: &Path,
    binary: &Path,
    config_path: &Path,
    previous_version: &str,
    previous_slot: Slot,
) -> StateResult<RollbackArtifact> {
    let script = render_script(binary, config_path, previous_version, previous_slot);
    write_atomic(path, script.as_bytes())?;
    make_executable(path)?;

    info!(
        path = %path.display(),
        version = %previous_version,
        slot = %previous_slot,
        "rollback script written"
    );
    Ok(RollbackArtifact {
        path: path.to_path_buf(),
        previous_version: previous_version.to_string(),
        previous_slot,
    })
}

fn render_script(binary: &Path, config_path: &Path, version: &str, slot: Slot) -> String {
    format!(
        "#!/bin/sh\n\
         # Generated by cutover. Restores {version} (previously live on slot {slot}).\n\
         set -eu\n\
         exec {} --config {} deploy {} --rollback\n",
        shell_quote(&binary.to_string_lossy()),
        shell_quote(&config_path.to_string_lossy()),
        shell_quote(version),
    )
}

/// Single-quote for POSIX sh.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> StateResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| StateError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> StateResult<()> {
    Ok(())
}
