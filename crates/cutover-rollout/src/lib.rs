//! cutover-rollout — the blue-green deployment pipeline.
//!
//! One invocation walks these stages strictly in order:
//!
//! ```text
//! resolve → configure → launch → health gate → smoke test → switch
//!         → production check → grace window → decommission → rollback script
//! ```
//!
//! Every fatal stage leaves the previously live slot serving traffic.
//!
//! # Components
//!
//! - **`context`** — `DeployContext`, the explicit per-run inputs
//! - **`resolver`** — which slot is live, which is the target
//! - **`descriptor`** — materializes the target slot's env descriptor
//! - **`launcher`** — pull + start + wait for `running`
//! - **`decommission`** — grace window, then teardown of the old slot
//! - **`artifact`** — rollback script generation
//! - **`controller`** — `Orchestrator`, the phase state machine

pub mod artifact;
pub mod context;
pub mod controller;
pub mod decommission;
pub mod descriptor;
pub mod error;
pub mod launcher;
pub mod resolver;

pub use artifact::{RollbackArtifact, write_rollback_artifact};
pub use context::DeployContext;
pub use controller::{DeployOutcome, DeployPhase, Orchestrator};
pub use decommission::Decommissioner;
pub use error::{DeployError, DeployResult, Stage};
pub use launcher::StackLauncher;
pub use resolver::{Resolution, ResolutionSource, resolve};
