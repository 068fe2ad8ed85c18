use std::path::Path;

use anyhow::Context;

use cutover_core::DeployRequest;
use cutover_health::HttpProber;
use cutover_proxy::{NginxProxy, SwitchOutcome};
use cutover_rollout::{DeployContext, DeployOutcome, Orchestrator};
use cutover_runtime::ComposeRuntime;
use cutover_state::StateStore;

pub async fn deploy(config_path: &Path, version: &str, rollback: bool) -> anyhow::Result<()> {
    // Reject bad versions before touching any state.
    let request = DeployRequest::new(version, rollback)?;
    let (config, config_path) = super::load_config(config_path)?;
    let binary = std::env::current_exe().context("cannot locate the cutover binary")?;

    let store = StateStore::open(&config.state_db_path())
        .with_context(|| format!("failed to open state at {}", config.state_db_path().display()))?;
    let runtime = ComposeRuntime::new(config.runtime.command.clone());
    let proxy = NginxProxy::from_config(&config);
    let prober = HttpProber::new(config.probe_timeout()).context("failed to build HTTP client")?;

    let ctx = DeployContext::new(config, config_path, binary, request);
    let mut orchestrator = Orchestrator::new(ctx, store, runtime, proxy, prober);

    match orchestrator.run().await? {
        DeployOutcome::Deployed {
            record,
            switch,
            decommissioned,
            rollback_artifact,
        } => {
            println!(
                "✓ {} {} live on slot {}",
                record.kind, record.new_version, record.new_slot
            );
            if let SwitchOutcome::Degraded { reason } = switch {
                println!("  ! proxy was not switched, fix it by hand: {reason}");
            }
            if !decommissioned {
                println!("  ! slot {} was not removed", record.previous_slot);
            }
            if let Some(artifact) = rollback_artifact {
                println!(
                    "  Rollback: {} (restores {} on slot {})",
                    artifact.path.display(),
                    artifact.previous_version,
                    artifact.previous_slot
                );
            }
        }
        DeployOutcome::AlreadyLive { slot, version } => {
            println!("✓ {version} is already live on slot {slot}; nothing to do");
        }
    }
    Ok(())
}
