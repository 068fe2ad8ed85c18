//! Errors from the reverse proxy.

use thiserror::Error;

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy tool unavailable (`{command}`): {source}")]
    Unavailable {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("proxy rejected the new configuration: {0}")]
    Rejected(String),

    #[error("proxy reload failed: {0}")]
    Reload(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] cutover_state::StateError),
}
