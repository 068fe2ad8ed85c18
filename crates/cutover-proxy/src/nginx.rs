//! nginx-style reverse proxy driver.
//!
//! Switching is: render the upstream include file, write it atomically,
//! validate with the test command (`nginx -t`), then hot-reload
//! (`nginx -s reload`). A rejected config is rolled back on disk before
//! returning, so the file never holds something the proxy refused.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use cutover_core::CutoverConfig;
use cutover_state::write_atomic;

use crate::error::{ProxyError, ProxyResult};
use crate::upstream::{Backend, render_upstream};
use crate::ReverseProxy;

#[derive(Debug, Clone)]
pub struct NginxProxy {
    upstream_file: PathBuf,
    upstream_name: String,
    test_command: Vec<String>,
    reload_command: Vec<String>,
}

enum CommandFailure {
    Spawn(String, std::io::Error),
    Exit(String),
}

impl NginxProxy {
    pub fn new(
        upstream_file: PathBuf,
        upstream_name: impl Into<String>,
        test_command: Vec<String>,
        reload_command: Vec<String>,
    ) -> Self {
        Self {
            upstream_file,
            upstream_name: upstream_name.into(),
            test_command,
            reload_command,
        }
    }

    pub fn from_config(config: &CutoverConfig) -> Self {
        Self::new(
            config.upstream_file(),
            config.proxy.upstream_name.clone(),
            config.proxy.test_command.clone(),
            config.proxy.reload_command.clone(),
        )
    }

    pub fn upstream_file(&self) -> &Path {
        &self.upstream_file
    }

    fn read_current(&self) -> ProxyResult<Option<Vec<u8>>> {
        match std::fs::read(&self.upstream_file) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProxyError::Io {
                path: self.upstream_file.display().to_string(),
                source,
            }),
        }
    }

    fn restore(&self, previous: Option<&[u8]>) {
        let result = match previous {
            Some(bytes) => write_atomic(&self.upstream_file, bytes).map_err(|e| e.to_string()),
            None => std::fs::remove_file(&self.upstream_file).map_err(|e| e.to_string()),
        };
        match result {
            Ok(()) => debug!(path = %self.upstream_file.display(), "upstream file restored"),
            Err(e) => warn!(path = %self.upstream_file.display(), error = %e, "failed to restore upstream file"),
        }
    }

    async fn run(command: &[String]) -> Result<(), CommandFailure> {
        let Some((program, args)) = command.split_first() else {
            return Ok(());
        };
        let rendered = command.join(" ");
        debug!(command = %rendered, "running proxy command");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CommandFailure::Spawn(rendered.clone(), e))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(CommandFailure::Exit(format!("`{rendered}` exited with {}: {stderr}", output.status)))
        }
    }
}

impl ReverseProxy for NginxProxy {
    async fn route_to(&self, backend: &Backend) -> ProxyResult<()> {
        let previous = self.read_current()?;
        let rendered = render_upstream(&self.upstream_name, backend);

        write_atomic(&self.upstream_file, rendered.as_bytes())?;

        if let Err(failure) = Self::run(&self.test_command).await {
            self.restore(previous.as_deref());
            return Err(match failure {
                CommandFailure::Spawn(command, source) => ProxyError::Unavailable { command, source },
                CommandFailure::Exit(msg) => ProxyError::Rejected(msg),
            });
        }

        Self::run(&self.reload_command).await.map_err(|failure| match failure {
            CommandFailure::Spawn(command, source) => ProxyError::Unavailable { command, source },
            CommandFailure::Exit(msg) => ProxyError::Reload(msg),
        })?;

        info!(
            upstream = %self.upstream_name,
            slot = %backend.slot,
            endpoint = %backend.endpoint(),
            "proxy reloaded"
        );
        Ok(())
    }
}
