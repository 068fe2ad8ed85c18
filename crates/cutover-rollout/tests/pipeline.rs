//! End-to-end pipeline scenarios against in-process fakes.
//!
//! The runtime, proxy and prober are fakes; descriptors, the redb state
//! store, the ledger, the upstream file and the rollback script are real
//! files under a temp dir. Timers run on tokio's paused clock.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use cutover_core::{
    CutoverConfig, DeployKind, DeployRequest, DeploymentRecord, EnvDescriptor, Slot,
};
use cutover_health::{ProbeResult, ProbeTarget, Prober};
use cutover_proxy::{
    Backend, NginxProxy, ProxyError, ProxyResult, ReverseProxy, SwitchOutcome, render_upstream,
};
use cutover_rollout::{DeployContext, DeployError, DeployOutcome, DeployPhase, Orchestrator, Stage};
use cutover_runtime::{ContainerHealth, ContainerRuntime, ContainerStatus, RuntimeResult, StackSpec};
use cutover_state::{StateStore, write_atomic, write_descriptor};

// ── Fakes ──────────────────────────────────────────────────────────

#[derive(Default)]
struct RuntimeState {
    /// project -> version read from its env file at start.
    running: HashMap<String, String>,
    never_healthy: HashSet<String>,
    removed: Vec<(String, Instant)>,
}

#[derive(Clone, Default)]
struct FakeRuntime {
    state: Arc<Mutex<RuntimeState>>,
}

impl FakeRuntime {
    fn with_running(project: &str, version: &str) -> Self {
        let runtime = Self::default();
        runtime
            .state
            .lock()
            .unwrap()
            .running
            .insert(project.to_string(), version.to_string());
        runtime
    }

    fn never_healthy(&self, project: &str) {
        self.state.lock().unwrap().never_healthy.insert(project.to_string());
    }

    fn version_of(&self, project: &str) -> Option<String> {
        self.state.lock().unwrap().running.get(project).cloned()
    }

    fn removed(&self) -> Vec<(String, Instant)> {
        self.state.lock().unwrap().removed.clone()
    }
}

impl ContainerRuntime for FakeRuntime {
    async fn is_running(&self, project: &str) -> RuntimeResult<bool> {
        Ok(self.state.lock().unwrap().running.contains_key(project))
    }

    async fn pull(&self, _stack: &StackSpec) -> RuntimeResult<()> {
        Ok(())
    }

    async fn start(&self, stack: &StackSpec) -> RuntimeResult<()> {
        let text = std::fs::read_to_string(&stack.env_file).unwrap();
        let desc = EnvDescriptor::parse(&text).unwrap();
        self.state
            .lock()
            .unwrap()
            .running
            .insert(stack.project.clone(), desc.version);
        Ok(())
    }

    async fn containers(&self, project: &str) -> RuntimeResult<Vec<ContainerStatus>> {
        let state = self.state.lock().unwrap();
        if !state.running.contains_key(project) {
            return Ok(Vec::new());
        }
        let health = if state.never_healthy.contains(project) {
            ContainerHealth::Starting
        } else {
            ContainerHealth::Healthy
        };
        Ok(vec![ContainerStatus {
            name: format!("{project}-web-1"),
            service: "web".to_string(),
            state: "running".to_string(),
            health,
        }])
    }

    async fn remove(&self, project: &str) -> RuntimeResult<()> {
        let mut state = self.state.lock().unwrap();
        state.running.remove(project);
        state.removed.push((project.to_string(), Instant::now()));
        Ok(())
    }
}

/// Writes the real upstream block, skips test and reload.
#[derive(Clone)]
struct FileProxy {
    file: PathBuf,
    routes: Arc<Mutex<Vec<(u16, Instant)>>>,
}

impl FileProxy {
    fn new(file: PathBuf) -> Self {
        Self {
            file,
            routes: Arc::default(),
        }
    }

    fn routes(&self) -> Vec<(u16, Instant)> {
        self.routes.lock().unwrap().clone()
    }
}

impl ReverseProxy for FileProxy {
    async fn route_to(&self, backend: &Backend) -> ProxyResult<()> {
        write_atomic(&self.file, render_upstream("app_backend", backend).as_bytes())?;
        self.routes.lock().unwrap().push((backend.port, Instant::now()));
        Ok(())
    }
}

/// A proxy whose reload always fails. Records every port it was asked for.
#[derive(Clone, Default)]
struct BrokenProxy {
    attempts: Arc<Mutex<Vec<u16>>>,
}

impl BrokenProxy {
    fn attempts(&self) -> Vec<u16> {
        self.attempts.lock().unwrap().clone()
    }
}

impl ReverseProxy for BrokenProxy {
    async fn route_to(&self, backend: &Backend) -> ProxyResult<()> {
        self.attempts.lock().unwrap().push(backend.port);
        Err(ProxyError::Reload("nginx: [alert] kill(1234, 1) failed".to_string()))
    }
}

#[derive(Clone, Copy)]
struct FakeProber {
    public: ProbeResult,
}

impl Prober for FakeProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        match target {
            ProbeTarget::Local { .. } => ProbeResult::Healthy,
            ProbeTarget::Url(_) => self.public,
        }
    }
}

// ── Fixture ────────────────────────────────────────────────────────

struct Fixture {
    _dir: tempfile::TempDir,
    config: CutoverConfig,
    config_path: PathBuf,
    store: StateStore,
    runtime: FakeRuntime,
    proxy: FileProxy,
}

impl Fixture {
    fn new(runtime: FakeRuntime) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        let config_path = dir.path().join("cutover.toml");
        let content = "[service]\n\
                       name = \"api\"\n\
                       public_url = \"https://api.example.com\"\n\
                       \n\
                       [proxy]\n\
                       upstream_file = \"upstream.conf\"\n";
        std::fs::write(&config_path, content).unwrap();
        let config = CutoverConfig::from_file(&config_path).unwrap();
        let store = StateStore::open(&config.state_db_path()).unwrap();
        let proxy = FileProxy::new(config.upstream_file());

        Self {
            _dir: dir,
            config,
            config_path,
            store,
            runtime,
            proxy,
        }
    }

    /// Slot a live with v1, as left by an earlier run.
    fn with_a_live_v1() -> Self {
        let fx = Self::new(FakeRuntime::with_running("api-a", "v1"));
        write_descriptor(
            &fx.config.descriptor_path(Slot::A),
            &EnvDescriptor {
                slot: Slot::A,
                version: "v1".to_string(),
                port: 8001,
            },
        )
        .unwrap();
        fx.store
            .record_switch(&DeploymentRecord {
                kind: DeployKind::Deploy,
                previous_version: None,
                new_version: "v1".to_string(),
                previous_slot: Slot::B,
                new_slot: Slot::A,
                timestamp: Utc::now(),
            })
            .unwrap();
        let backend = Backend {
            slot: Slot::A,
            host: "127.0.0.1".to_string(),
            port: 8001,
        };
        write_atomic(
            &fx.config.upstream_file(),
            render_upstream("app_backend", &backend).as_bytes(),
        )
        .unwrap();
        fx
    }

    fn strict(mut self) -> Self {
        self.config.proxy.strict = true;
        self
    }

    fn orchestrator(
        &self,
        version: &str,
        rollback: bool,
        public: ProbeResult,
    ) -> Orchestrator<FakeRuntime, FileProxy, FakeProber> {
        self.orchestrator_with(version, rollback, public, self.proxy.clone())
    }

    fn orchestrator_with<P: ReverseProxy>(
        &self,
        version: &str,
        rollback: bool,
        public: ProbeResult,
        proxy: P,
    ) -> Orchestrator<FakeRuntime, P, FakeProber> {
        let ctx = DeployContext::new(
            self.config.clone(),
            self.config_path.clone(),
            PathBuf::from("/usr/local/bin/cutover"),
            DeployRequest::new(version, rollback).unwrap(),
        );
        Orchestrator::new(
            ctx,
            self.store.clone(),
            self.runtime.clone(),
            proxy,
            FakeProber { public },
        )
    }

    fn upstream(&self) -> String {
        std::fs::read_to_string(self.config.upstream_file()).unwrap()
    }

    fn ledger(&self) -> String {
        std::fs::read_to_string(self.config.ledger_path()).unwrap_or_default()
    }

    fn live(&self) -> (Slot, String) {
        let live = self.store.live().unwrap().unwrap();
        (live.slot, live.version)
    }
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn deploy_v2_over_live_a() {
    let fx = Fixture::with_a_live_v1();
    let mut orch = fx.orchestrator("v2", false, ProbeResult::Healthy);

    let outcome = orch.run().await.unwrap();

    let DeployOutcome::Deployed {
        record,
        decommissioned,
        rollback_artifact,
        ..
    } = outcome
    else {
        panic!("expected a deployment, got {outcome:?}");
    };
    assert_eq!(record.previous_slot, Slot::A);
    assert_eq!(record.new_slot, Slot::B);
    assert_eq!(record.previous_version.as_deref(), Some("v1"));
    assert!(decommissioned);

    // New slot runs v2, proxy points at its port.
    assert_eq!(fx.runtime.version_of("api-b").as_deref(), Some("v2"));
    assert!(fx.upstream().contains("server 127.0.0.1:8002;"));
    assert_eq!(fx.live(), (Slot::B, "v2".to_string()));

    // Exactly one slot left running.
    assert!(fx.runtime.version_of("api-a").is_none());

    // Old slot removed no earlier than the grace window after the switch.
    let routes = fx.proxy.routes();
    let removed = fx.runtime.removed();
    assert_eq!(routes.len(), 1);
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].0, "api-a");
    assert!(removed[0].1 - routes[0].1 >= Duration::from_secs(120));

    // Rollback script restores v1 on a.
    let artifact = rollback_artifact.unwrap();
    assert_eq!(artifact.previous_version, "v1");
    assert_eq!(artifact.previous_slot, Slot::A);
    let script = std::fs::read_to_string(&artifact.path).unwrap();
    assert!(script.contains("deploy 'v1' --rollback"));
    assert!(script.contains("slot a"));

    assert!(fx.ledger().contains("kind=deploy status=ok version=v2 previous=v1 from=a to=b"));
}

#[tokio::test(start_paused = true)]
async fn health_timeout_leaves_proxy_untouched() {
    let fx = Fixture::with_a_live_v1();
    fx.runtime.never_healthy("api-b");
    let upstream_before = read(&fx.config.upstream_file());
    let mut orch = fx.orchestrator("v3", false, ProbeResult::Healthy);
    let started = Instant::now();

    let err = orch.run().await.unwrap_err();

    assert_eq!(err.stage(), Stage::Health);
    assert!(started.elapsed() >= Duration::from_secs(180));
    assert_eq!(read(&fx.config.upstream_file()), upstream_before);
    assert!(fx.proxy.routes().is_empty());
    assert_eq!(fx.live(), (Slot::A, "v1".to_string()));

    // Target left running for inspection; live slot untouched.
    assert_eq!(fx.runtime.version_of("api-b").as_deref(), Some("v3"));
    assert_eq!(fx.runtime.version_of("api-a").as_deref(), Some("v1"));
    assert!(fx.runtime.removed().is_empty());

    assert!(matches!(orch.phase(), DeployPhase::Aborted { stage: Stage::Health, .. }));
    let ledger = fx.ledger();
    assert!(ledger.contains("status=aborted version=v3 previous=v1 from=a to=b stage=health"));
    assert!(!fx.config.rollback_path().exists());
}

#[tokio::test(start_paused = true)]
async fn production_failure_keeps_previous_slot_serving() {
    let fx = Fixture::with_a_live_v1();
    let mut orch = fx.orchestrator("v2", false, ProbeResult::Unhealthy(503));

    let err = orch.run().await.unwrap_err();

    assert_eq!(err.stage(), Stage::Production);
    assert_eq!(fx.runtime.version_of("api-a").as_deref(), Some("v1"));
    assert!(fx.runtime.removed().is_empty());
    assert!(fx.upstream().contains("server 127.0.0.1:8001;"));
    assert_eq!(fx.live(), (Slot::A, "v1".to_string()));
    assert!(fx.ledger().contains("stage=production"));
}

#[tokio::test(start_paused = true)]
async fn same_version_twice_is_idempotent() {
    let fx = Fixture::with_a_live_v1();

    fx.orchestrator("v2", false, ProbeResult::Healthy)
        .run()
        .await
        .unwrap();
    let upstream_after_first = fx.upstream();

    let mut second = fx.orchestrator("v2", false, ProbeResult::Healthy);
    let outcome = second.run().await.unwrap();

    assert_eq!(
        outcome,
        DeployOutcome::AlreadyLive {
            slot: Slot::B,
            version: "v2".to_string()
        }
    );
    assert_eq!(fx.live(), (Slot::B, "v2".to_string()));
    assert_eq!(fx.upstream(), upstream_after_first);
    assert_eq!(fx.proxy.routes().len(), 1);
    assert!(fx.ledger().contains("status=noop version=v2"));
}

#[tokio::test(start_paused = true)]
async fn rollback_invocation_restores_previous_slot() {
    let fx = Fixture::with_a_live_v1();
    fx.orchestrator("v2", false, ProbeResult::Healthy)
        .run()
        .await
        .unwrap();
    let script_before = read(&fx.config.rollback_path());

    // What rollback.sh executes.
    let mut rollback = fx.orchestrator("v1", true, ProbeResult::Healthy);
    let outcome = rollback.run().await.unwrap();

    let DeployOutcome::Deployed {
        record,
        rollback_artifact,
        ..
    } = outcome
    else {
        panic!("expected a deployment, got {outcome:?}");
    };
    assert_eq!(record.kind, DeployKind::Rollback);
    assert_eq!(record.new_slot, Slot::A);
    assert_eq!(fx.live(), (Slot::A, "v1".to_string()));
    assert!(fx.upstream().contains("server 127.0.0.1:8001;"));
    assert_eq!(fx.runtime.version_of("api-a").as_deref(), Some("v1"));
    assert!(fx.runtime.version_of("api-b").is_none());

    // Rollback runs do not rewrite the script.
    assert!(rollback_artifact.is_none());
    assert_eq!(read(&fx.config.rollback_path()), script_before);
    assert!(fx.ledger().contains("kind=rollback status=ok version=v1 previous=v2 from=b to=a"));
}

#[tokio::test(start_paused = true)]
async fn proxy_failure_is_a_warning_by_default() {
    let fx = Fixture::with_a_live_v1();
    let upstream_before = read(&fx.config.upstream_file());
    let proxy = BrokenProxy::default();
    let mut orch = fx.orchestrator_with("v2", false, ProbeResult::Healthy, proxy.clone());

    let outcome = orch.run().await.unwrap();

    let DeployOutcome::Deployed { switch, record, .. } = outcome else {
        panic!("expected a deployment, got {outcome:?}");
    };
    assert!(matches!(switch, SwitchOutcome::Degraded { ref reason } if reason.contains("kill")));
    assert_eq!(record.new_slot, Slot::B);
    assert_eq!(proxy.attempts(), vec![8002]);
    assert_eq!(read(&fx.config.upstream_file()), upstream_before);

    // The run carried on through every later stage.
    let history = orch.phase_history();
    assert!(history.contains(&DeployPhase::ProductionCheck));
    assert!(history.contains(&DeployPhase::Decommissioning));
    assert_eq!(orch.phase(), &DeployPhase::Completed);
    assert_eq!(fx.live(), (Slot::B, "v2".to_string()));
    assert!(fx.ledger().contains("status=ok version=v2 previous=v1 from=a to=b"));
}

#[tokio::test(start_paused = true)]
async fn strict_proxy_failure_aborts_and_reverts() {
    let fx = Fixture::with_a_live_v1().strict();
    let proxy = BrokenProxy::default();
    let mut orch = fx.orchestrator_with("v2", false, ProbeResult::Healthy, proxy.clone());

    let err = orch.run().await.unwrap_err();

    assert_eq!(err.stage(), Stage::Switch);
    // Switch attempt, then the revert to slot a.
    assert_eq!(proxy.attempts(), vec![8002, 8001]);
    assert!(!orch.phase_history().contains(&DeployPhase::ProductionCheck));
    assert_eq!(fx.live(), (Slot::A, "v1".to_string()));
    assert_eq!(fx.runtime.version_of("api-a").as_deref(), Some("v1"));
    assert!(fx.runtime.removed().is_empty());
    assert!(!fx.config.rollback_path().exists());
    assert!(fx.ledger().contains("status=aborted version=v2 previous=v1 from=a to=b stage=switch"));
}

#[cfg(unix)]
#[tokio::test]
async fn strict_reload_spawn_failure_restores_upstream_file() {
    let fx = Fixture::with_a_live_v1().strict();
    let upstream_before = read(&fx.config.upstream_file());
    let nginx = NginxProxy::new(
        fx.config.upstream_file(),
        "app_backend",
        vec!["true".to_string()],
        vec!["/nonexistent/nginx".to_string(), "-s".to_string(), "reload".to_string()],
    );
    let mut orch = fx.orchestrator_with("v2", false, ProbeResult::Healthy, nginx);

    let err = orch.run().await.unwrap_err();

    assert!(matches!(err, DeployError::Switch(ProxyError::Unavailable { .. })));
    assert_eq!(read(&fx.config.upstream_file()), upstream_before);
    assert!(!fx.upstream().contains(":8002;"));
    assert_eq!(fx.live(), (Slot::A, "v1".to_string()));
    assert!(fx.runtime.removed().is_empty());
}
