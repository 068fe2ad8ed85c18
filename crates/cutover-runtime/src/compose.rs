//! Compose driver — runs `docker compose` (or a compatible CLI) per slot.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};
use crate::status::{ContainerStatus, parse_ps_output};
use crate::{ContainerRuntime, StackSpec};

/// Runs compose subcommands with a per-slot `-p <project>`.
#[derive(Debug, Clone)]
pub struct ComposeRuntime {
    /// Program and leading args, e.g. `["docker", "compose"]`.
    command: Vec<String>,
}

impl ComposeRuntime {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn stack_args<'a>(stack: &'a StackSpec, tail: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "-p",
            stack.project.as_str(),
            "-f",
            path_str(&stack.compose_file),
            "--env-file",
            path_str(&stack.env_file),
        ];
        args.extend_from_slice(tail);
        args
    }

    /// Run a compose subcommand and return its stdout.
    async fn run(&self, args: &[&str]) -> RuntimeResult<String> {
        let (program, leading) = self
            .command
            .split_first()
            .ok_or_else(|| RuntimeError::Output("empty compose command".to_string()))?;
        let rendered = format!("{} {}", self.command.join(" "), args.join(" "));
        debug!(command = %rendered, "running compose");

        let output = Command::new(program)
            .args(leading)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RuntimeError::Spawn {
                command: rendered.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Failed {
                command: rendered,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn path_str(path: &Path) -> &str {
    // Non-UTF-8 paths cannot be passed through the config file anyway.
    path.to_str().unwrap_or_default()
}

impl ContainerRuntime for ComposeRuntime {
    async fn is_running(&self, project: &str) -> RuntimeResult<bool> {
        let out = self
            .run(&["-p", project, "ps", "--status", "running", "-q"])
            .await?;
        Ok(out.lines().any(|l| !l.trim().is_empty()))
    }

    async fn pull(&self, stack: &StackSpec) -> RuntimeResult<()> {
        self.run(&Self::stack_args(stack, &["pull"])).await?;
        info!(project = %stack.project, "images pulled");
        Ok(())
    }

    async fn start(&self, stack: &StackSpec) -> RuntimeResult<()> {
        self.run(&Self::stack_args(stack, &["up", "-d", "--remove-orphans"]))
            .await?;
        info!(project = %stack.project, "stack started");
        Ok(())
    }

    async fn containers(&self, project: &str) -> RuntimeResult<Vec<ContainerStatus>> {
        let out = self
            .run(&["-p", project, "ps", "--all", "--format", "json"])
            .await?;
        parse_ps_output(&out)
    }

    async fn remove(&self, project: &str) -> RuntimeResult<()> {
        self.run(&["-p", project, "down", "--volumes", "--remove-orphans"])
            .await?;
        info!(%project, "stack removed");
        Ok(())
    }
}
