//! redb table definitions for the cutover state store.
//!
//! Values are JSON-serialized domain types.

use redb::TableDefinition;

/// Live-slot record under the single key [`LIVE_KEY`].
pub const LIVE: TableDefinition<&str, &[u8]> = TableDefinition::new("live");

/// Deployment records keyed by zero-padded epoch milliseconds, so key order
/// is chronological.
pub const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

pub const LIVE_KEY: &str = "live";
