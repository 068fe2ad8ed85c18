//! Explicit per-run context threaded through every stage.

use std::path::PathBuf;
use std::time::Duration;

use cutover_core::{CutoverConfig, DeployRequest, Environment};
use cutover_health::PollPolicy;
use cutover_proxy::Backend;
use cutover_runtime::StackSpec;

const LAUNCH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Everything a run needs, resolved up front. No stage reads the working
/// directory or environment variables.
#[derive(Debug, Clone)]
pub struct DeployContext {
    pub config: CutoverConfig,
    /// Absolute path of the config file, embedded in the rollback script.
    pub config_path: PathBuf,
    /// Absolute path of the cutover binary, embedded in the rollback script.
    pub binary: PathBuf,
    pub request: DeployRequest,
}

impl DeployContext {
    pub fn new(
        config: CutoverConfig,
        config_path: PathBuf,
        binary: PathBuf,
        request: DeployRequest,
    ) -> Self {
        Self {
            config,
            config_path,
            binary,
            request,
        }
    }

    pub fn stack(&self, env: &Environment) -> StackSpec {
        StackSpec {
            project: env.project.clone(),
            compose_file: self.config.compose_file(),
            env_file: self.config.descriptor_path(env.slot),
        }
    }

    pub fn backend(&self, env: &Environment) -> Backend {
        Backend {
            slot: env.slot,
            host: self.config.proxy.upstream_host.clone(),
            port: env.port,
        }
    }

    /// Launch readiness is checked more often than health; containers
    /// reach `running` within seconds.
    pub fn launch_policy(&self) -> PollPolicy {
        let interval = self.config.health_interval().min(LAUNCH_POLL_INTERVAL);
        PollPolicy::ceiling(self.config.launch_timeout(), interval)
    }

    pub fn health_policy(&self) -> PollPolicy {
        PollPolicy::ceiling(self.config.health_timeout(), self.config.health_interval())
    }

    pub fn smoke_policy(&self) -> PollPolicy {
        PollPolicy::attempts(self.config.timing.smoke_attempts, self.config.smoke_interval())
    }

    pub fn production_policy(&self) -> PollPolicy {
        PollPolicy::attempts(
            self.config.timing.production_attempts,
            self.config.production_interval(),
        )
    }
}
