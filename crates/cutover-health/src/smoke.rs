//! Smoke tests against a slot's port and against the public URL.

use tracing::{error, info, warn};

use crate::error::{HealthError, HealthResult};
use crate::poll::{PollPolicy, poll_until};
use crate::probe::{ProbeResult, ProbeTarget, Prober};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeReport {
    /// Attempts the health endpoint needed.
    pub health_attempts: u32,
    /// Outcome of the single docs request. Informational only.
    pub docs: ProbeResult,
}

/// Probes a slot directly on its host port, bypassing the proxy.
pub struct SmokeTester<'a, P> {
    prober: &'a P,
    health_path: &'a str,
    docs_path: &'a str,
    policy: PollPolicy,
}

impl<'a, P: Prober> SmokeTester<'a, P> {
    pub fn new(prober: &'a P, health_path: &'a str, docs_path: &'a str, policy: PollPolicy) -> Self {
        Self {
            prober,
            health_path,
            docs_path,
            policy,
        }
    }

    /// Health endpoint with retries (fatal on exhaustion), then the docs
    /// endpoint once (warning on failure).
    pub async fn run(&self, port: u16) -> HealthResult<SmokeReport> {
        let health = ProbeTarget::Local {
            port,
            path: self.health_path.to_string(),
        };
        let health_attempts = probe_with_retries(self.prober, &health, self.policy, "smoke-health").await?;

        let docs = ProbeTarget::Local {
            port,
            path: self.docs_path.to_string(),
        };
        let docs_result = self.prober.probe(&docs).await;
        if docs_result.is_healthy() {
            info!(target = %docs, "docs endpoint reachable");
        } else {
            warn!(target = %docs, result = %docs_result, "docs endpoint check failed; continuing");
        }

        Ok(SmokeReport {
            health_attempts,
            docs: docs_result,
        })
    }
}

/// Re-runs the health smoke test through the public URL after cutover.
pub struct ProductionVerifier<'a, P> {
    prober: &'a P,
    url: String,
    policy: PollPolicy,
}

impl<'a, P: Prober> ProductionVerifier<'a, P> {
    pub fn new(prober: &'a P, url: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            prober,
            url: url.into(),
            policy,
        }
    }

    /// Returns the number of attempts needed.
    pub async fn verify(&self) -> HealthResult<u32> {
        let target = ProbeTarget::Url(self.url.clone());
        probe_with_retries(self.prober, &target, self.policy, "production-health").await
    }
}

async fn probe_with_retries<P: Prober>(
    prober: &P,
    target: &ProbeTarget,
    policy: PollPolicy,
    label: &str,
) -> HealthResult<u32> {
    let outcome = poll_until(label, policy, |_| async move {
        match prober.probe(target).await {
            ProbeResult::Healthy => Ok(()),
            other => Err(other),
        }
    })
    .await;

    match outcome {
        Ok(polled) => {
            info!(%target, attempts = polled.attempts, "smoke test passed");
            Ok(polled.attempts)
        }
        Err(exhausted) => {
            error!(%target, attempts = exhausted.attempts, last = %exhausted.last, "smoke test failed");
            Err(HealthError::SmokeFailed {
                target: target.to_string(),
                attempts: exhausted.attempts,
                last: exhausted.last.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Prober answering per-target from a script; unknown targets fail.
    #[derive(Default)]
    struct FakeProber {
        /// Number of failures before a target turns healthy; `u32::MAX` never does.
        fail_first: HashMap<String, u32>,
        calls: Mutex<HashMap<String, u32>>,
    }

    impl FakeProber {
        fn with(mut self, target: &str, failures: u32) -> Self {
            self.fail_first.insert(target.to_string(), failures);
            self
        }

        fn calls(&self, target: &str) -> u32 {
            self.calls.lock().unwrap().get(target).copied().unwrap_or(0)
        }
    }

    impl Prober for FakeProber {
        async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
            let key = target.to_string();
            let n = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(key.clone()).or_insert(0);
                *n += 1;
                *n
            };
            match self.fail_first.get(&key) {
                Some(&failures) if n > failures => ProbeResult::Healthy,
                Some(_) => ProbeResult::Unhealthy(503),
                None => ProbeResult::Failed,
            }
        }
    }

    fn local_policy() -> PollPolicy {
        PollPolicy::attempts(6, Duration::from_secs(10))
    }

    #[tokio::test(start_paused = true)]
    async fn health_retries_then_docs_once() {
        let prober = FakeProber::default()
            .with("http://127.0.0.1:8002/health", 2)
            .with("http://127.0.0.1:8002/docs", 0);
        let tester = SmokeTester::new(&prober, "/health", "/docs", local_policy());

        let report = tester.run(8002).await.unwrap();
        assert_eq!(report.health_attempts, 3);
        assert_eq!(report.docs, ProbeResult::Healthy);
        assert_eq!(prober.calls("http://127.0.0.1:8002/docs"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn docs_failure_is_not_fatal() {
        let prober = FakeProber::default().with("http://127.0.0.1:8002/health", 0);
        let tester = SmokeTester::new(&prober, "/health", "/docs", local_policy());

        let report = tester.run(8002).await.unwrap();
        assert_eq!(report.docs, ProbeResult::Failed);
        assert_eq!(prober.calls("http://127.0.0.1:8002/docs"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn health_exhaustion_is_fatal_after_six_attempts() {
        let prober = FakeProber::default().with("http://127.0.0.1:8002/health", u32::MAX);
        let tester = SmokeTester::new(&prober, "/health", "/docs", local_policy());

        let started = tokio::time::Instant::now();
        let err = tester.run(8002).await.unwrap_err();
        assert!(matches!(err, HealthError::SmokeFailed { attempts: 6, .. }));
        assert_eq!(started.elapsed(), Duration::from_secs(50));
        // Docs are never probed when health fails.
        assert_eq!(prober.calls("http://127.0.0.1:8002/docs"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn production_verifier_uses_public_url() {
        let prober = FakeProber::default().with("https://api.example.com/health", 1);
        let verifier = ProductionVerifier::new(
            &prober,
            "https://api.example.com/health",
            PollPolicy::attempts(6, Duration::from_secs(15)),
        );
        assert_eq!(verifier.verify().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn production_verifier_exhaustion() {
        let prober = FakeProber::default();
        let verifier = ProductionVerifier::new(
            &prober,
            "https://api.example.com/health",
            PollPolicy::attempts(6, Duration::from_secs(15)),
        );
        let started = tokio::time::Instant::now();
        assert!(verifier.verify().await.is_err());
        assert_eq!(started.elapsed(), Duration::from_secs(75));
        assert_eq!(prober.calls("https://api.example.com/health"), 6);
    }
}
