//! Stack launcher: pull, start, and wait for every container to be `running`.
//!
//! `running` is weaker than healthy; the health gate comes next.

use tracing::{error, info};

use cutover_health::{PollPolicy, poll_until};
use cutover_runtime::{ContainerRuntime, ContainerStatus, StackSpec};

use crate::error::{DeployError, DeployResult};

pub struct StackLauncher<'a, R> {
    runtime: &'a R,
    policy: PollPolicy,
}

impl<'a, R: ContainerRuntime> StackLauncher<'a, R> {
    pub fn new(runtime: &'a R, policy: PollPolicy) -> Self {
        Self { runtime, policy }
    }

    pub async fn launch(&self, stack: &StackSpec) -> DeployResult<Vec<ContainerStatus>> {
        if !stack.compose_file.is_file() {
            error!(path = %stack.compose_file.display(), "compose definition missing");
            return Err(DeployError::DefinitionMissing(stack.compose_file.clone()));
        }

        info!(project = %stack.project, "pulling images");
        self.runtime
            .pull(stack)
            .await
            .map_err(|source| DeployError::Launch {
                step: "pull",
                project: stack.project.clone(),
                source,
            })?;

        info!(project = %stack.project, "starting stack");
        self.runtime
            .start(stack)
            .await
            .map_err(|source| DeployError::Launch {
                step: "start",
                project: stack.project.clone(),
                source,
            })?;

        let runtime = self.runtime;
        let project = stack.project.as_str();
        let polled = poll_until("containers-running", self.policy, |_| async move {
            let containers = runtime
                .containers(project)
                .await
                .map_err(|e| format!("runtime query failed: {e}"))?;
            if containers.is_empty() {
                return Err("no containers yet".to_string());
            }
            let pending: Vec<&str> = containers
                .iter()
                .filter(|c| !c.is_running())
                .map(|c| c.name.as_str())
                .collect();
            if pending.is_empty() {
                Ok(containers)
            } else {
                Err(format!("not running: {}", pending.join(", ")))
            }
        })
        .await
        .map_err(|exhausted| DeployError::LaunchTimeout {
            project: stack.project.clone(),
            attempts: exhausted.attempts,
            last: exhausted.last,
        })?;

        info!(
            project = %stack.project,
            containers = polled.value.len(),
            "all containers running"
        );
        Ok(polled.value)
    }
}
