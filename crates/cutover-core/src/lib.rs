//! cutover-core — shared types and configuration for the cutover workspace.
//!
//! Holds the two-slot model (`Slot`, `Environment`), the request and record
//! types that flow through a deployment, and the `cutover.toml` parser.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    CutoverConfig, Profile, ProxyConfig, RuntimeConfig, ServiceConfig, SlotPorts, TimingConfig,
    parse_duration,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
