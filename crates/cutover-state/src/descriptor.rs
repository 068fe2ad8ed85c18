//! Per-slot environment descriptor files.

use std::path::Path;

use tracing::debug;

use cutover_core::EnvDescriptor;

use crate::error::{StateError, StateResult};
use crate::fs::write_atomic;

/// Write a slot's descriptor, replacing the previous contents of that file only.
pub fn write_descriptor(path: &Path, descriptor: &EnvDescriptor) -> StateResult<()> {
    let body = format!(
        "# managed by cutover; do not edit\n{}",
        descriptor.render()
    );
    write_atomic(path, body.as_bytes())?;
    debug!(
        path = %path.display(),
        slot = %descriptor.slot,
        version = %descriptor.version,
        port = descriptor.port,
        "descriptor written"
    );
    Ok(())
}

/// Read a slot's descriptor. `Ok(None)` when the file does not exist.
pub fn read_descriptor(path: &Path) -> StateResult<Option<EnvDescriptor>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(EnvDescriptor::parse(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StateError::io(path, e)),
    }
}
