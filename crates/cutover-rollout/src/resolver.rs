//! StackIdentity resolver.
//!
//! The persisted live record is authoritative. Without one (first run, or
//! state lost) the runtime is probed: slot B's project running means B is
//! live, anything else means A.

use tracing::{info, warn};

use cutover_core::{CutoverConfig, Environment, Slot};
use cutover_runtime::ContainerRuntime;
use cutover_state::{StateResult, StateStore, read_descriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Read from the state store.
    Record,
    /// Inferred from the runtime.
    RuntimeProbe,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub current: Environment,
    pub next: Environment,
    /// Version serving on `current`, when known.
    pub live_version: Option<String>,
    pub source: ResolutionSource,
}

pub async fn resolve<R: ContainerRuntime>(
    config: &CutoverConfig,
    store: &StateStore,
    runtime: &R,
) -> StateResult<Resolution> {
    if let Some(live) = store.live()? {
        let resolution = build(config, live.slot, Some(live.version), ResolutionSource::Record);
        info!(
            current = %resolution.current.slot,
            next = %resolution.next.slot,
            version = ?resolution.live_version,
            "resolved live slot from state"
        );
        return Ok(resolution);
    }

    let probe = config.environment(Slot::B);
    let current = match runtime.is_running(&probe.project).await {
        Ok(true) => Slot::B,
        Ok(false) => Slot::A,
        Err(e) => {
            warn!(project = %probe.project, error = %e, "runtime probe failed; assuming slot a is live");
            Slot::A
        }
    };

    // Best guess at what the inferred slot runs: its last descriptor.
    let live_version = match read_descriptor(&config.descriptor_path(current)) {
        Ok(desc) => desc.map(|d| d.version),
        Err(e) => {
            warn!(slot = %current, error = %e, "ignoring unreadable descriptor");
            None
        }
    };

    let resolution = build(config, current, live_version, ResolutionSource::RuntimeProbe);
    info!(
        current = %resolution.current.slot,
        next = %resolution.next.slot,
        version = ?resolution.live_version,
        "no live record; inferred live slot from runtime"
    );
    Ok(resolution)
}

fn build(
    config: &CutoverConfig,
    current: Slot,
    live_version: Option<String>,
    source: ResolutionSource,
) -> Resolution {
    Resolution {
        current: config.environment(current),
        next: config.environment(current.other()),
        live_version,
        source,
    }
}
