//! Deployment controller, drives one invocation through the pipeline.
//!
//! The controller owns the collaborators (runtime, proxy, prober) and the
//! persisted state handles. It records every phase it enters so callers and
//! tests can see exactly how far a run got.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use cutover_core::{DeploymentRecord, Slot};
use cutover_health::{HealthVerifier, ProductionVerifier, Prober, SmokeTester};
use cutover_proxy::{ReverseProxy, SwitchOutcome, TrafficSwitch};
use cutover_runtime::ContainerRuntime;
use cutover_state::{Ledger, LedgerEntry, LedgerStatus, StateStore};

use crate::artifact::{RollbackArtifact, write_rollback_artifact};
use crate::context::DeployContext;
use crate::decommission::Decommissioner;
use crate::descriptor;
use crate::error::{DeployError, DeployResult, Stage};
use crate::launcher::StackLauncher;
use crate::resolver::{Resolution, resolve};

/// Current phase of a deployment run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DeployPhase {
    /// Run not started.
    Pending,
    Resolving,
    /// Writing the target slot's descriptor.
    Configuring,
    Launching,
    /// Waiting for container health.
    HealthGate,
    SmokeTest,
    Switching,
    /// Verifying through the public URL.
    ProductionCheck,
    /// Draining the old slot.
    GracePeriod,
    Decommissioning,
    /// Completed successfully.
    Completed,
    /// Requested version was already live; nothing was done.
    AlreadyLive,
    /// Aborted at a fatal stage. The previous slot keeps serving.
    Aborted { stage: Stage, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    Deployed {
        record: DeploymentRecord,
        switch: SwitchOutcome,
        /// Whether the old slot's containers were removed.
        decommissioned: bool,
        rollback_artifact: Option<RollbackArtifact>,
    },
    AlreadyLive {
        slot: Slot,
        version: String,
    },
}

pub struct Orchestrator<R, P, H> {
    ctx: DeployContext,
    store: StateStore,
    ledger: Ledger,
    runtime: R,
    proxy: P,
    prober: H,
    phase: DeployPhase,
    history: Vec<DeployPhase>,
}

impl<R, P, H> Orchestrator<R, P, H>
where
    R: ContainerRuntime,
    P: ReverseProxy,
    H: Prober,
{
    pub fn new(ctx: DeployContext, store: StateStore, runtime: R, proxy: P, prober: H) -> Self {
        let ledger = Ledger::new(ctx.config.ledger_path());
        Self {
            ctx,
            store,
            ledger,
            runtime,
            proxy,
            prober,
            phase: DeployPhase::Pending,
            history: vec![DeployPhase::Pending],
        }
    }

    pub fn phase(&self) -> &DeployPhase {
        &self.phase
    }

    /// Every phase entered so far, in order.
    pub fn phase_history(&self) -> &[DeployPhase] {
        &self.history
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn proxy(&self) -> &P {
        &self.proxy
    }

    /// Run the pipeline once.
    ///
    /// Every fatal stage appends an `aborted` ledger entry and returns the
    /// error; the previously live slot is left serving.
    pub async fn run(&mut self) -> DeployResult<DeployOutcome> {
        info!(
            version = %self.ctx.request.version(),
            kind = %self.ctx.request.kind(),
            service = %self.ctx.config.service.name,
            "deployment started"
        );

        self.enter(DeployPhase::Resolving);
        let resolution = match resolve(&self.ctx.config, &self.store, &self.runtime).await {
            Ok(r) => r,
            Err(e) => {
                let err = DeployError::from(e);
                error!(error = %err, "could not determine live slot");
                self.enter(DeployPhase::Aborted {
                    stage: err.stage(),
                    reason: err.to_string(),
                });
                return Err(err);
            }
        };

        if resolution.live_version.as_deref() == Some(self.ctx.request.version()) {
            return Ok(self.already_live(&resolution));
        }

        match self.pipeline(&resolution).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => Err(self.abort(&resolution, err)),
        }
    }

    async fn pipeline(&mut self, resolution: &Resolution) -> DeployResult<DeployOutcome> {
        let current = &resolution.current;
        let next = &resolution.next;
        let request = self.ctx.request.clone();

        self.enter(DeployPhase::Configuring);
        descriptor::prepare(&self.ctx.config, &request, next)?;

        self.enter(DeployPhase::Launching);
        let stack = self.ctx.stack(next);
        StackLauncher::new(&self.runtime, self.ctx.launch_policy())
            .launch(&stack)
            .await?;

        self.enter(DeployPhase::HealthGate);
        let report = HealthVerifier::new(&self.runtime, self.ctx.health_policy())
            .verify(&next.project)
            .await
            .map_err(DeployError::Health)?;
        info!(slot = %next.slot, attempts = report.attempts, "health gate passed");

        self.enter(DeployPhase::SmokeTest);
        let service = &self.ctx.config.service;
        SmokeTester::new(
            &self.prober,
            &service.health_path,
            &service.docs_path,
            self.ctx.smoke_policy(),
        )
        .run(next.port)
        .await
        .map_err(DeployError::Smoke)?;

        self.enter(DeployPhase::Switching);
        let target = self.ctx.backend(next);
        let previous = self.ctx.backend(current);
        let switch = TrafficSwitch::new(&self.proxy, self.ctx.config.proxy.strict);
        let switched = match switch.switch(&target).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Strict abort: whichever command failed, the file on disk
                // must point at the previous slot again before returning.
                switch.revert(&previous).await;
                return Err(DeployError::Switch(e));
            }
        };

        self.enter(DeployPhase::ProductionCheck);
        let url = self.ctx.config.public_health_url();
        let verified = ProductionVerifier::new(&self.prober, url, self.ctx.production_policy())
            .verify()
            .await;
        if let Err(e) = verified {
            if switched == SwitchOutcome::Switched {
                TrafficSwitch::new(&self.proxy, false).revert(&previous).await;
            }
            return Err(DeployError::Production(e));
        }

        let record = DeploymentRecord {
            kind: request.kind(),
            previous_version: resolution.live_version.clone(),
            new_version: request.version().to_string(),
            previous_slot: current.slot,
            new_slot: next.slot,
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.record_switch(&record) {
            error!(
                slot = %next.slot,
                error = %e,
                "failed to persist live record; next run falls back to the runtime probe"
            );
        }

        self.enter(DeployPhase::GracePeriod);
        Decommissioner::new(&self.runtime, self.ctx.config.grace_period())
            .drain(current)
            .await;
        self.enter(DeployPhase::Decommissioning);
        let decommissioned = Decommissioner::new(&self.runtime, self.ctx.config.grace_period())
            .remove(current)
            .await;

        let rollback_artifact = self.rollback_artifact(resolution);

        self.append_ledger(LedgerEntry {
            timestamp: record.timestamp,
            kind: record.kind,
            status: LedgerStatus::Ok,
            version: record.new_version.clone(),
            previous: record.previous_version.clone(),
            from: current.slot,
            to: next.slot,
            stage: None,
            reason: None,
        });

        self.enter(DeployPhase::Completed);
        info!(
            version = %record.new_version,
            live = %next.slot,
            previous = ?record.previous_version,
            decommissioned,
            "deployment completed"
        );

        Ok(DeployOutcome::Deployed {
            record,
            switch: switched,
            decommissioned,
            rollback_artifact,
        })
    }

    fn rollback_artifact(&self, resolution: &Resolution) -> Option<RollbackArtifact> {
        if self.ctx.request.is_rollback() {
            return None;
        }
        let Some(previous_version) = resolution.live_version.as_deref() else {
            info!("first deployment; no rollback script written");
            return None;
        };
        match write_rollback_artifact(
            &self.ctx.config.rollback_path(),
            &self.ctx.binary,
            &self.ctx.config_path,
            previous_version,
            resolution.current.slot,
        ) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(error = %e, "failed to write rollback script");
                None
            }
        }
    }

    fn already_live(&mut self, resolution: &Resolution) -> DeployOutcome {
        let version = self.ctx.request.version().to_string();
        let slot = resolution.current.slot;
        info!(%version, %slot, "version already live; nothing to do");

        self.append_ledger(LedgerEntry {
            timestamp: Utc::now(),
            kind: self.ctx.request.kind(),
            status: LedgerStatus::Noop,
            version: version.clone(),
            previous: resolution.live_version.clone(),
            from: slot,
            to: slot,
            stage: None,
            reason: None,
        });
        self.enter(DeployPhase::AlreadyLive);
        DeployOutcome::AlreadyLive { slot, version }
    }

    fn abort(&mut self, resolution: &Resolution, err: DeployError) -> DeployError {
        let stage = err.stage();
        error!(
            %stage,
            error = %err,
            live = %resolution.current.slot,
            "deployment aborted; previous slot still live"
        );

        self.append_ledger(LedgerEntry {
            timestamp: Utc::now(),
            kind: self.ctx.request.kind(),
            status: LedgerStatus::Aborted,
            version: self.ctx.request.version().to_string(),
            previous: resolution.live_version.clone(),
            from: resolution.current.slot,
            to: resolution.next.slot,
            stage: Some(stage.to_string()),
            reason: Some(err.to_string()),
        });
        self.enter(DeployPhase::Aborted {
            stage,
            reason: err.to_string(),
        });
        err
    }

    fn append_ledger(&self, entry: LedgerEntry) {
        if let Err(e) = self.ledger.append(&entry) {
            warn!(path = %self.ledger.path().display(), error = %e, "failed to append ledger entry");
        }
    }

    fn enter(&mut self, phase: DeployPhase) {
        debug!(from = ?self.phase, to = ?phase, "phase transition");
        self.phase = phase.clone();
        self.history.push(phase);
    }
}
