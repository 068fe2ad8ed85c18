//! cutover.toml configuration parser.
//!
//! Every relative path in the file resolves against the directory holding
//! the config file, so a run never depends on the caller's working directory.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Environment, Slot};

// Compose project names are `<service>-<slot>`; compose only accepts
// lowercase names starting with a letter or digit.
static SERVICE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]{0,62}$").expect("service name regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CutoverConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub slots: SlotPorts,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Directory the config was loaded from.
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name; prefixes the per-slot compose project names.
    pub name: String,
    /// Public URL the production check hits, e.g. `https://api.example.com`.
    pub public_url: String,
    #[serde(default = "default_compose_file")]
    pub compose_file: PathBuf,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_docs_path")]
    pub docs_path: String,
    #[serde(default)]
    pub profile: Profile,
}

/// Deployment profile. Controls the default health ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Production,
    Staging,
}

impl Profile {
    pub fn default_health_timeout(self) -> Duration {
        match self {
            Profile::Production => Duration::from_secs(180),
            Profile::Staging => Duration::from_secs(90),
        }
    }
}

/// Host ports reserved for each slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotPorts {
    pub a: u16,
    pub b: u16,
}

impl Default for SlotPorts {
    fn default() -> Self {
        Self { a: 8001, b: 8002 }
    }
}

impl SlotPorts {
    pub fn port(&self, slot: Slot) -> u16 {
        match slot {
            Slot::A => self.a,
            Slot::B => self.b,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Compose invocation, e.g. `["docker", "compose"]` or `["podman-compose"]`.
    #[serde(default = "default_compose_command")]
    pub command: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: default_compose_command(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// File holding the managed `upstream` block.
    #[serde(default = "default_upstream_file")]
    pub upstream_file: PathBuf,
    #[serde(default = "default_upstream_name")]
    pub upstream_name: String,
    /// Host the upstream points at.
    #[serde(default = "default_upstream_host")]
    pub upstream_host: String,
    #[serde(default = "default_test_command")]
    pub test_command: Vec<String>,
    #[serde(default = "default_reload_command")]
    pub reload_command: Vec<String>,
    /// Abort the deployment when the proxy cannot be switched.
    #[serde(default)]
    pub strict: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            upstream_file: default_upstream_file(),
            upstream_name: default_upstream_name(),
            upstream_host: default_upstream_host(),
            test_command: default_test_command(),
            reload_command: default_reload_command(),
            strict: false,
        }
    }
}

/// Poll intervals, retry budgets and windows, as duration strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout: String,
    #[serde(default = "default_health_interval")]
    pub health_interval: String,
    /// Falls back to the profile default when unset.
    pub health_timeout: Option<String>,
    #[serde(default = "default_attempts")]
    pub smoke_attempts: u32,
    #[serde(default = "default_smoke_interval")]
    pub smoke_interval: String,
    #[serde(default = "default_attempts")]
    pub production_attempts: u32,
    #[serde(default = "default_production_interval")]
    pub production_interval: String,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: String,
    #[serde(default = "default_grace_period")]
    pub grace_period: String,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            launch_timeout: default_launch_timeout(),
            health_interval: default_health_interval(),
            health_timeout: None,
            smoke_attempts: default_attempts(),
            smoke_interval: default_smoke_interval(),
            production_attempts: default_attempts(),
            production_interval: default_production_interval(),
            probe_timeout: default_probe_timeout(),
            grace_period: default_grace_period(),
        }
    }
}

fn default_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".cutover")
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_docs_path() -> String {
    "/docs".to_string()
}
fn default_compose_command() -> Vec<String> {
    vec!["docker".to_string(), "compose".to_string()]
}
fn default_upstream_file() -> PathBuf {
    PathBuf::from("/etc/nginx/conf.d/cutover-upstream.conf")
}
fn default_upstream_name() -> String {
    "app_backend".to_string()
}
fn default_upstream_host() -> String {
    "127.0.0.1".to_string()
}
fn default_test_command() -> Vec<String> {
    vec!["nginx".to_string(), "-t".to_string()]
}
fn default_reload_command() -> Vec<String> {
    vec!["nginx".to_string(), "-s".to_string(), "reload".to_string()]
}
fn default_launch_timeout() -> String {
    "60s".to_string()
}
fn default_health_interval() -> String {
    "10s".to_string()
}
fn default_attempts() -> u32 {
    6
}
fn default_smoke_interval() -> String {
    "10s".to_string()
}
fn default_production_interval() -> String {
    "15s".to_string()
}
fn default_probe_timeout() -> String {
    "5s".to_string()
}
fn default_grace_period() -> String {
    "120s".to_string()
}

impl CutoverConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&content, &base_dir).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse config text, resolving relative paths against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> ConfigResult<Self> {
        let mut config: CutoverConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                message: e.to_string(),
            })?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    fn validate(&self) -> ConfigResult<()> {
        if !SERVICE_NAME_RE.is_match(&self.service.name) {
            return Err(ConfigError::Invalid(format!(
                "service.name '{}' must be lowercase [a-z0-9_-] and start with a letter or digit",
                self.service.name
            )));
        }
        let url = &self.service.public_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "service.public_url '{url}' must start with http:// or https://"
            )));
        }
        for path in [&self.service.health_path, &self.service.docs_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid(format!("endpoint path '{path}' must start with '/'")));
            }
        }
        if self.slots.a == 0 || self.slots.b == 0 {
            return Err(ConfigError::Invalid("slot ports must be non-zero".into()));
        }
        if self.slots.a == self.slots.b {
            return Err(ConfigError::Invalid(format!(
                "slots a and b share port {}",
                self.slots.a
            )));
        }
        if self.runtime.command.is_empty() {
            return Err(ConfigError::Invalid("runtime.command must not be empty".into()));
        }
        if self.proxy.reload_command.is_empty() {
            return Err(ConfigError::Invalid("proxy.reload_command must not be empty".into()));
        }
        if self.timing.smoke_attempts == 0 || self.timing.production_attempts == 0 {
            return Err(ConfigError::Invalid("retry attempts must be at least 1".into()));
        }

        // Surface bad duration strings at load time rather than mid-deploy.
        for interval in [
            &self.timing.health_interval,
            &self.timing.smoke_interval,
            &self.timing.production_interval,
            &self.timing.probe_timeout,
        ] {
            if parse_duration(interval)?.is_zero() {
                return Err(ConfigError::Invalid(format!("interval '{interval}' must be non-zero")));
            }
        }
        parse_duration(&self.timing.launch_timeout)?;
        parse_duration(&self.timing.grace_period)?;
        if let Some(t) = &self.timing.health_timeout {
            parse_duration(t)?;
        }
        Ok(())
    }

    // ── Resolved paths ─────────────────────────────────────────────

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn compose_file(&self) -> PathBuf {
        self.resolve(&self.service.compose_file)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.resolve(&self.service.state_dir)
    }

    /// Env descriptor file for one slot.
    pub fn descriptor_path(&self, slot: Slot) -> PathBuf {
        self.state_dir().join(format!("slot-{slot}.env"))
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.state_dir().join("state.redb")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("deployments.log")
    }

    pub fn rollback_path(&self) -> PathBuf {
        self.state_dir().join("rollback.sh")
    }

    pub fn upstream_file(&self) -> PathBuf {
        self.resolve(&self.proxy.upstream_file)
    }

    pub fn environment(&self, slot: Slot) -> Environment {
        Environment::new(&self.service.name, slot, self.slots.port(slot))
    }

    /// Full public health URL.
    pub fn public_health_url(&self) -> String {
        format!(
            "{}{}",
            self.service.public_url.trim_end_matches('/'),
            self.service.health_path
        )
    }

    // ── Durations (validated at load) ──────────────────────────────

    pub fn launch_timeout(&self) -> Duration {
        parse_duration(&self.timing.launch_timeout).unwrap_or(Duration::from_secs(60))
    }

    pub fn health_interval(&self) -> Duration {
        parse_duration(&self.timing.health_interval).unwrap_or(Duration::from_secs(10))
    }

    pub fn health_timeout(&self) -> Duration {
        self.timing
            .health_timeout
            .as_deref()
            .and_then(|t| parse_duration(t).ok())
            .unwrap_or_else(|| self.service.profile.default_health_timeout())
    }

    pub fn smoke_interval(&self) -> Duration {
        parse_duration(&self.timing.smoke_interval).unwrap_or(Duration::from_secs(10))
    }

    pub fn production_interval(&self) -> Duration {
        parse_duration(&self.timing.production_interval).unwrap_or(Duration::from_secs(15))
    }

    pub fn probe_timeout(&self) -> Duration {
        parse_duration(&self.timing.probe_timeout).unwrap_or(Duration::from_secs(5))
    }

    pub fn grace_period(&self) -> Duration {
        parse_duration(&self.timing.grace_period).unwrap_or(Duration::from_secs(120))
    }
}

/// Parse a duration string like "5s", "500ms", "2m". A bare number is seconds.
pub fn parse_duration(s: &str) -> ConfigResult<Duration> {
    let s = s.trim();
    let parsed = if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    };
    parsed.ok_or_else(|| ConfigError::Duration(s.to_string()))
}
