//! Container health verifier.
//!
//! `Polling → Healthy | TimedOut`. Each tick asks the runtime for every
//! container in the slot's project. The slot is healthy once at least one
//! container exists and none reports `unhealthy` or `starting`.

use tracing::{error, info};

use cutover_runtime::{ContainerRuntime, ContainerStatus};

use crate::error::{HealthError, HealthResult};
use crate::poll::{PollPolicy, poll_until};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    Polling,
    Healthy,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub containers: Vec<ContainerStatus>,
    pub attempts: u32,
}

pub struct HealthVerifier<'a, R> {
    runtime: &'a R,
    policy: PollPolicy,
    state: VerifierState,
}

impl<'a, R: ContainerRuntime> HealthVerifier<'a, R> {
    pub fn new(runtime: &'a R, policy: PollPolicy) -> Self {
        Self {
            runtime,
            policy,
            state: VerifierState::Polling,
        }
    }

    pub fn state(&self) -> VerifierState {
        self.state
    }

    /// Poll until the project is healthy or the ceiling is hit.
    ///
    /// On timeout the containers are left running for inspection.
    pub async fn verify(&mut self, project: &str) -> HealthResult<HealthReport> {
        self.state = VerifierState::Polling;
        let runtime = self.runtime;

        let outcome = poll_until("container-health", self.policy, |_| async move {
            let containers = runtime
                .containers(project)
                .await
                .map_err(|e| format!("runtime query failed: {e}"))?;
            evaluate(containers)
        })
        .await;

        match outcome {
            Ok(polled) => {
                self.state = VerifierState::Healthy;
                info!(
                    %project,
                    containers = polled.value.len(),
                    attempts = polled.attempts,
                    elapsed = ?polled.elapsed,
                    "all containers healthy"
                );
                Ok(HealthReport {
                    containers: polled.value,
                    attempts: polled.attempts,
                })
            }
            Err(exhausted) => {
                self.state = VerifierState::TimedOut;
                error!(
                    %project,
                    waited = ?exhausted.elapsed,
                    last = %exhausted.last,
                    "health check timed out"
                );
                Err(HealthError::TimedOut {
                    project: project.to_string(),
                    waited: exhausted.elapsed,
                    last: exhausted.last,
                })
            }
        }
    }
}

fn evaluate(containers: Vec<ContainerStatus>) -> Result<Vec<ContainerStatus>, String> {
    if containers.is_empty() {
        return Err("no containers found".to_string());
    }
    let blocking: Vec<String> = containers
        .iter()
        .filter(|c| c.health.is_blocking())
        .map(|c| format!("{}={:?}", c.name, c.health))
        .collect();
    if blocking.is_empty() {
        Ok(containers)
    } else {
        Err(format!("waiting on {}", blocking.join(", ")))
    }
}
