//! Managed upstream block.

use cutover_core::Slot;

/// The backend a slot exposes to the proxy.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Backend {
    pub slot: Slot,
    pub host: String,
    pub port: u16,
}

impl Backend {
    /// Full address string.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Render the upstream include file pointing `name` at `backend`.
pub fn render_upstream(name: &str, backend: &Backend) -> String {
    format!(
        "# managed by cutover; live slot {slot}\nupstream {name} {{\n    server {endpoint};\n}}\n",
        slot = backend.slot,
        endpoint = backend.endpoint(),
    )
}
