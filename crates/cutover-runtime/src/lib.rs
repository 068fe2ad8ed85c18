//! cutover-runtime — the container orchestration collaborator.
//!
//! # Components
//!
//! - **`status`** — per-container state and health as reported by the runtime
//! - **`compose`** — [`ContainerRuntime`] implementation shelling out to
//!   `docker compose` (or any compatible CLI)
//!
//! Each slot runs under its own compose project, so both slots' containers
//! coexist without name collisions during the overlap window.

use std::future::Future;
use std::path::PathBuf;

pub mod compose;
pub mod error;
pub mod status;

pub use compose::ComposeRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use status::{ContainerHealth, ContainerStatus, parse_ps_output};

/// Everything the runtime needs to bring up one slot's stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSpec {
    /// Compose project name (unique per slot).
    pub project: String,
    pub compose_file: PathBuf,
    /// Env file rendered from the slot's descriptor.
    pub env_file: PathBuf,
}

/// Start, inspect and remove named container sets.
pub trait ContainerRuntime {
    /// Whether the project has at least one running container.
    fn is_running(&self, project: &str) -> impl Future<Output = RuntimeResult<bool>> + Send;

    /// Pull the versioned images for a stack.
    fn pull(&self, stack: &StackSpec) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Create and start the stack's containers, detached.
    fn start(&self, stack: &StackSpec) -> impl Future<Output = RuntimeResult<()>> + Send;

    /// Per-container status for a project.
    fn containers(
        &self,
        project: &str,
    ) -> impl Future<Output = RuntimeResult<Vec<ContainerStatus>>> + Send;

    /// Stop and remove a project's containers and ephemeral volumes.
    fn remove(&self, project: &str) -> impl Future<Output = RuntimeResult<()>> + Send;
}
