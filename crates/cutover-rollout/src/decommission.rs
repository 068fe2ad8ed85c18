//! Old-slot teardown after the grace window.

use std::time::Duration;

use tracing::{info, warn};

use cutover_core::Environment;
use cutover_runtime::ContainerRuntime;

pub struct Decommissioner<'a, R> {
    runtime: &'a R,
    grace: Duration,
}

impl<'a, R: ContainerRuntime> Decommissioner<'a, R> {
    pub fn new(runtime: &'a R, grace: Duration) -> Self {
        Self { runtime, grace }
    }

    /// Wait out the grace window so in-flight requests on the old slot
    /// finish. Always called before [`Decommissioner::remove`].
    pub async fn drain(&self, old: &Environment) {
        info!(slot = %old.slot, project = %old.project, grace = ?self.grace, "grace window started");
        tokio::time::sleep(self.grace).await;
    }

    /// Remove the old slot's containers. Never fails the run: the new slot
    /// is already serving. Failure is logged, not retried.
    pub async fn remove(&self, old: &Environment) -> bool {
        match self.runtime.remove(&old.project).await {
            Ok(()) => {
                info!(slot = %old.slot, project = %old.project, "old slot decommissioned");
                true
            }
            Err(e) => {
                warn!(
                    slot = %old.slot,
                    project = %old.project,
                    error = %e,
                    "failed to remove old slot; containers left running"
                );
                false
            }
        }
    }
}
