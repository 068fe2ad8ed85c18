//! cutover-state — persisted state for cutover deployments.
//!
//! Three kinds of state live under the configured state directory:
//!
//! - **`store`** — redb database holding the live-slot record and the
//!   history of successful switches. Read at the start of every run.
//! - **`descriptor`** — one `KEY=value` env file per slot, rendered from a
//!   typed `EnvDescriptor`.
//! - **`ledger`** — append-only, line-oriented audit log of every attempt.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).

pub mod descriptor;
pub mod error;
pub mod fs;
pub mod ledger;
pub mod store;
pub mod tables;

pub use descriptor::{read_descriptor, write_descriptor};
pub use error::{StateError, StateResult};
pub use fs::write_atomic;
pub use ledger::{Ledger, LedgerEntry, LedgerStatus};
pub use store::StateStore;
