//! Fatal deployment errors. Anything here aborts the run with a non-zero exit.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type DeployResult<T> = Result<T, DeployError>;

/// Pipeline stage, used in logs and ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Configure,
    Launch,
    Health,
    Smoke,
    Switch,
    Production,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolve => "resolve",
            Stage::Configure => "configure",
            Stage::Launch => "launch",
            Stage::Health => "health",
            Stage::Smoke => "smoke",
            Stage::Switch => "switch",
            Stage::Production => "production",
        })
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    State(#[from] cutover_state::StateError),

    #[error("failed to prepare env descriptor: {0}")]
    Descriptor(#[source] cutover_state::StateError),

    #[error("compose definition not found at {0}")]
    DefinitionMissing(PathBuf),

    #[error("failed to {step} stack {project}: {source}")]
    Launch {
        step: &'static str,
        project: String,
        #[source]
        source: cutover_runtime::RuntimeError,
    },

    #[error("stack {project} not running after {attempts} check(s): {last}")]
    LaunchTimeout {
        project: String,
        attempts: u32,
        last: String,
    },

    #[error("health gate failed: {0}")]
    Health(#[source] cutover_health::HealthError),

    #[error("smoke test failed: {0}")]
    Smoke(#[source] cutover_health::HealthError),

    #[error("traffic switch failed: {0}")]
    Switch(#[source] cutover_proxy::ProxyError),

    #[error("production verification failed: {0}")]
    Production(#[source] cutover_health::HealthError),
}

impl DeployError {
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::State(_) => Stage::Resolve,
            DeployError::Descriptor(_) => Stage::Configure,
            DeployError::DefinitionMissing(_)
            | DeployError::Launch { .. }
            | DeployError::LaunchTimeout { .. } => Stage::Launch,
            DeployError::Health(_) => Stage::Health,
            DeployError::Smoke(_) => Stage::Smoke,
            DeployError::Switch(_) => Stage::Switch,
            DeployError::Production(_) => Stage::Production,
        }
    }
}
