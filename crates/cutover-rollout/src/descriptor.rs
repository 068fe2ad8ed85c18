//! Deployment config builder.

use tracing::{info, warn};

use cutover_core::{CutoverConfig, DeployRequest, EnvDescriptor, Environment};
use cutover_state::{read_descriptor, write_descriptor};

use crate::error::{DeployError, DeployResult};

/// Materialize the descriptor for `target`. Only the target slot's file is
/// written; the live slot's descriptor is never opened for writing.
///
/// A rollback reuses the target slot's existing descriptor when it already
/// names the requested version.
pub fn prepare(
    config: &CutoverConfig,
    request: &DeployRequest,
    target: &Environment,
) -> DeployResult<EnvDescriptor> {
    let path = config.descriptor_path(target.slot);
    let desired = EnvDescriptor {
        slot: target.slot,
        version: request.version().to_string(),
        port: target.port,
    };

    if request.is_rollback() {
        match read_descriptor(&path) {
            Ok(Some(existing)) if existing == desired => {
                info!(slot = %target.slot, version = %existing.version, "rollback: reusing existing descriptor");
                return Ok(existing);
            }
            Ok(Some(existing)) => warn!(
                slot = %target.slot,
                found = %existing.version,
                wanted = %desired.version,
                "rollback: descriptor names a different version; rewriting"
            ),
            Ok(None) => warn!(slot = %target.slot, "rollback: no descriptor for target slot; writing one"),
            Err(e) => warn!(slot = %target.slot, error = %e, "rollback: unreadable descriptor; rewriting"),
        }
    }

    write_descriptor(&path, &desired).map_err(DeployError::Descriptor)?;
    info!(
        slot = %desired.slot,
        version = %desired.version,
        port = desired.port,
        "target descriptor prepared"
    );
    Ok(desired)
}
