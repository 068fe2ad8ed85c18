//! Shared types used across cutover crates.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._-]{0,127}$").expect("version regex"));

// ── Slots ──────────────────────────────────────────────────────────

/// One of the two interchangeable deployment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    A,
    B,
}

impl Slot {
    /// The opposite slot. Never returns `self`.
    pub fn other(self) -> Slot {
        match self {
            Slot::A => Slot::B,
            Slot::B => Slot::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::A => "a",
            Slot::B => "b",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "a" | "A" => Ok(Slot::A),
            "b" | "B" => Ok(Slot::B),
            other => Err(ConfigError::Invalid(format!("unknown slot '{other}'"))),
        }
    }
}

/// A slot bound to its port and container-set handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub slot: Slot,
    /// Externally reachable host port the stack binds.
    pub port: u16,
    /// Compose project name; unique per slot so both stacks can coexist.
    pub project: String,
}

impl Environment {
    pub fn new(service: &str, slot: Slot, port: u16) -> Self {
        Self {
            slot,
            port,
            project: format!("{service}-{slot}"),
        }
    }
}

// ── Requests and records ───────────────────────────────────────────

/// Whether an invocation is a forward deployment or a rollback re-invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployKind {
    Deploy,
    Rollback,
}

impl fmt::Display for DeployKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployKind::Deploy => f.write_str("deploy"),
            DeployKind::Rollback => f.write_str("rollback"),
        }
    }
}

/// A validated deployment request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    version: String,
    rollback: bool,
}

impl DeployRequest {
    pub fn new(version: &str, rollback: bool) -> ConfigResult<Self> {
        validate_version(version)?;
        Ok(Self {
            version: version.to_string(),
            rollback,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn is_rollback(&self) -> bool {
        self.rollback
    }

    pub fn kind(&self) -> DeployKind {
        if self.rollback {
            DeployKind::Rollback
        } else {
            DeployKind::Deploy
        }
    }
}

/// Check that a version identifier (commit hash or release tag) is safe to
/// embed in file names, env files and the rollback script.
pub fn validate_version(version: &str) -> ConfigResult<()> {
    if VERSION_RE.is_match(version) {
        Ok(())
    } else {
        Err(ConfigError::Version(version.to_string()))
    }
}

/// The outcome of one successful traffic switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub kind: DeployKind,
    /// `None` on the very first deployment.
    pub previous_version: Option<String>,
    pub new_version: String,
    pub previous_slot: Slot,
    pub new_slot: Slot,
    pub timestamp: DateTime<Utc>,
}

/// The persisted answer to "which slot is live, running what".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRecord {
    pub slot: Slot,
    pub version: String,
    pub updated_at: DateTime<Utc>,
}

// ── Environment descriptor ─────────────────────────────────────────

/// Versioned descriptor for one slot's stack.
///
/// Rendered to a `KEY=value` env file consumed by the container runtime.
/// Each slot owns its own file, so writing the target never touches the
/// live slot's descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvDescriptor {
    pub slot: Slot,
    pub version: String,
    pub port: u16,
}

impl EnvDescriptor {
    pub const VERSION_KEY: &'static str = "IMAGE_TAG";
    pub const PORT_KEY: &'static str = "HOST_PORT";
    pub const SLOT_KEY: &'static str = "DEPLOY_SLOT";

    /// Render as an env file.
    pub fn render(&self) -> String {
        format!(
            "{}={}\n{}={}\n{}={}\n",
            Self::SLOT_KEY,
            self.slot,
            Self::VERSION_KEY,
            self.version,
            Self::PORT_KEY,
            self.port
        )
    }

    /// Parse an env file produced by [`EnvDescriptor::render`].
    ///
    /// Blank lines and `#` comments are ignored; unknown keys are skipped.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let mut slot = None;
        let mut version = None;
        let mut port = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Invalid(format!("malformed descriptor line '{line}'")));
            };
            let value = value.trim();
            match key.trim() {
                Self::SLOT_KEY => slot = Some(value.parse::<Slot>()?),
                Self::VERSION_KEY => {
                    validate_version(value)?;
                    version = Some(value.to_string());
                }
                Self::PORT_KEY => {
                    port = Some(value.parse::<u16>().map_err(|_| {
                        ConfigError::Invalid(format!("invalid port '{value}' in descriptor"))
                    })?)
                }
                _ => {}
            }
        }

        match (slot, version, port) {
            (Some(slot), Some(version), Some(port)) => Ok(Self { slot, version, port }),
            _ => Err(ConfigError::Invalid(
                "descriptor is missing DEPLOY_SLOT, IMAGE_TAG or HOST_PORT".to_string(),
            )),
        }
    }
}
