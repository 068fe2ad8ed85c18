//! Traffic switch coordinator.
//!
//! By default a proxy failure after the new slot has passed its local gates
//! is logged and the deployment carries on; an operator is expected to fix
//! the proxy by hand. With `strict` set the failure aborts the run instead.

use tracing::{error, info, warn};

use crate::error::ProxyResult;
use crate::upstream::Backend;
use crate::ReverseProxy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The proxy now routes to the target.
    Switched,
    /// The proxy could not be switched; the run continues.
    Degraded { reason: String },
}

pub struct TrafficSwitch<'a, P> {
    proxy: &'a P,
    strict: bool,
}

impl<'a, P: ReverseProxy> TrafficSwitch<'a, P> {
    pub fn new(proxy: &'a P, strict: bool) -> Self {
        Self { proxy, strict }
    }

    /// Point public traffic at `target`.
    ///
    /// Returns `Err` only in strict mode.
    pub async fn switch(&self, target: &Backend) -> ProxyResult<SwitchOutcome> {
        match self.proxy.route_to(target).await {
            Ok(()) => {
                info!(slot = %target.slot, endpoint = %target.endpoint(), "traffic switched");
                Ok(SwitchOutcome::Switched)
            }
            Err(e) if self.strict => {
                error!(slot = %target.slot, error = %e, "traffic switch failed (strict)");
                Err(e)
            }
            Err(e) => {
                warn!(
                    slot = %target.slot,
                    error = %e,
                    "traffic switch failed; continuing, proxy needs manual attention"
                );
                Ok(SwitchOutcome::Degraded {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Best-effort move back to `previous` after a later gate failed.
    pub async fn revert(&self, previous: &Backend) -> SwitchOutcome {
        match self.proxy.route_to(previous).await {
            Ok(()) => {
                info!(slot = %previous.slot, "traffic reverted to previous slot");
                SwitchOutcome::Switched
            }
            Err(e) => {
                error!(slot = %previous.slot, error = %e, "failed to revert traffic; proxy needs manual attention");
                SwitchOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}
