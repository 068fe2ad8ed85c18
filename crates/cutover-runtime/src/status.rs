//! Container status as reported by `compose ps --format json`.

use serde::Deserialize;

use crate::error::{RuntimeError, RuntimeResult};

/// Health as reported by the container's healthcheck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerHealth {
    Healthy,
    Unhealthy,
    Starting,
    /// The container defines no healthcheck.
    None,
}

impl ContainerHealth {
    fn from_report(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => ContainerHealth::Healthy,
            "unhealthy" => ContainerHealth::Unhealthy,
            "starting" => ContainerHealth::Starting,
            _ => ContainerHealth::None,
        }
    }

    /// Whether this state blocks the slot from being considered healthy.
    pub fn is_blocking(self) -> bool {
        matches!(self, ContainerHealth::Unhealthy | ContainerHealth::Starting)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub name: String,
    pub service: String,
    /// Lifecycle state: `created`, `running`, `exited`, ...
    pub state: String,
    pub health: ContainerHealth,
}

impl ContainerStatus {
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PsEntry {
    name: String,
    #[serde(default)]
    service: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    health: String,
}

impl From<PsEntry> for ContainerStatus {
    fn from(e: PsEntry) -> Self {
        ContainerStatus {
            name: e.name,
            service: e.service,
            state: e.state,
            health: ContainerHealth::from_report(&e.health),
        }
    }
}

/// Parse `ps --format json` output.
///
/// Older compose releases print one JSON array; newer ones print one object
/// per line. Both are accepted.
pub fn parse_ps_output(output: &str) -> RuntimeResult<Vec<ContainerStatus>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let entries: Vec<PsEntry> = serde_json::from_str(trimmed)
            .map_err(|e| RuntimeError::Output(format!("ps json array: {e}")))?;
        return Ok(entries.into_iter().map(Into::into).collect());
    }

    trimmed
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            serde_json::from_str::<PsEntry>(line)
                .map(Into::into)
                .map_err(|e| RuntimeError::Output(format!("ps json line: {e}")))
        })
        .collect()
}
