//! cutover-proxy — tells the reverse proxy which slot gets public traffic.
//!
//! # Components
//!
//! - **`upstream`** — `Backend` and the managed upstream block it renders to
//! - **`nginx`** — [`ReverseProxy`] implementation: write, test, hot-reload
//! - **`switch`** — coordinator applying the warning/strict failure policy
//!
//! The upstream file is written by exactly one coordinator per run.

use std::future::Future;

pub mod error;
pub mod nginx;
pub mod switch;
pub mod upstream;

pub use error::{ProxyError, ProxyResult};
pub use nginx::NginxProxy;
pub use switch::{SwitchOutcome, TrafficSwitch};
pub use upstream::{Backend, render_upstream};

/// A reverse proxy whose upstream can be repointed without dropping
/// in-flight connections.
pub trait ReverseProxy {
    /// Route all traffic to `backend` and hot-reload.
    fn route_to(&self, backend: &Backend) -> impl Future<Output = ProxyResult<()>> + Send;
}
