//! cutover-health — the gates a new slot must pass before and after cutover.
//!
//! # Architecture
//!
//! ```text
//! poll_until(policy, check)            shared bounded retry loop
//!   ├── HealthVerifier                 container health via the runtime
//!   ├── SmokeTester                    GET /health (retried) + docs (once)
//!   └── ProductionVerifier             GET <public_url>/health (retried)
//! Prober
//!   └── HttpProber                     hyper for local ports, reqwest for URLs
//! ```
//!
//! Every loop is bounded only by its own policy; nothing cancels it early.

pub mod error;
pub mod poll;
pub mod probe;
pub mod smoke;
pub mod verifier;

pub use error::{HealthError, HealthResult};
pub use poll::{Exhausted, PollPolicy, Polled, poll_until};
pub use probe::{HttpProber, ProbeResult, ProbeTarget, Prober, local_probe};
pub use smoke::{ProductionVerifier, SmokeReport, SmokeTester};
pub use verifier::{HealthReport, HealthVerifier, VerifierState};
