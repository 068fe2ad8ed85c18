//! HTTP probes.
//!
//! Local probes talk plain HTTP/1.1 straight to the slot's host port,
//! bypassing the reverse proxy. Public probes go through the real URL
//! (usually HTTPS) with reqwest.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// Result of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The endpoint returned 2xx.
    Healthy,
    /// The endpoint returned non-2xx.
    Unhealthy(u16),
    /// The probe could not be executed (connection error or timeout).
    Failed,
}

impl ProbeResult {
    pub fn is_healthy(self) -> bool {
        self == ProbeResult::Healthy
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Healthy => f.write_str("healthy"),
            ProbeResult::Unhealthy(status) => write!(f, "HTTP {status}"),
            ProbeResult::Failed => f.write_str("connection failed or timed out"),
        }
    }
}

/// What to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// `http://127.0.0.1:<port><path>`.
    Local { port: u16, path: String },
    /// A full URL, typically the public domain.
    Url(String),
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeTarget::Local { port, path } => write!(f, "http://127.0.0.1:{port}{path}"),
            ProbeTarget::Url(url) => f.write_str(url),
        }
    }
}

/// Issues a single GET against a target.
pub trait Prober {
    fn probe(&self, target: &ProbeTarget) -> impl Future<Output = ProbeResult> + Send;
}

/// Real HTTP prober.
#[derive(Debug, Clone)]
pub struct HttpProber {
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cutover/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { timeout, client })
    }

    async fn url_probe(&self, url: &str) -> ProbeResult {
        match self.client.get(url).send().await {
            Ok(resp) if resp.status().is_success() => ProbeResult::Healthy,
            Ok(resp) => {
                debug!(status = %resp.status(), %url, "probe non-2xx");
                ProbeResult::Unhealthy(resp.status().as_u16())
            }
            Err(e) => {
                debug!(error = %e, %url, "probe request failed");
                ProbeResult::Failed
            }
        }
    }
}

impl Prober for HttpProber {
    async fn probe(&self, target: &ProbeTarget) -> ProbeResult {
        match target {
            ProbeTarget::Local { port, path } => {
                local_probe(*port, path, self.timeout).await
            }
            ProbeTarget::Url(url) => self.url_probe(url).await,
        }
    }
}

/// GET `path` on a slot's host port over a fresh HTTP/1.1 connection.
///
/// Any transport error or an expired `timeout` counts as `Failed`.
pub async fn local_probe(port: u16, path: &str, timeout: Duration) -> ProbeResult {
    match tokio::time::timeout(timeout, local_get(port, path)).await {
        Ok(Ok(status)) if status.is_success() => ProbeResult::Healthy,
        Ok(Ok(status)) => {
            debug!(port, path, %status, "slot answered with an error status");
            ProbeResult::Unhealthy(status.as_u16())
        }
        Ok(Err(reason)) => {
            debug!(port, path, %reason, "slot unreachable");
            ProbeResult::Failed
        }
        Err(_) => {
            debug!(port, path, ?timeout, "slot did not answer in time");
            ProbeResult::Failed
        }
    }
}

async fn local_get(port: u16, path: &str) -> Result<http::StatusCode, String> {
    let authority = format!("127.0.0.1:{port}");
    let stream = tokio::net::TcpStream::connect(&authority)
        .await
        .map_err(|e| format!("connect: {e}"))?;
    let (mut sender, connection) =
        hyper::client::conn::http1::handshake(hyper_util::rt::TokioIo::new(stream))
            .await
            .map_err(|e| format!("handshake: {e}"))?;
    tokio::spawn(connection);

    let request = http::Request::get(path)
        .header(http::header::HOST, authority.as_str())
        .header(http::header::USER_AGENT, concat!("cutover/", env!("CARGO_PKG_VERSION")))
        .body(http_body_util::Empty::<bytes::Bytes>::new())
        .map_err(|e| format!("request: {e}"))?;
    let response = sender
        .send_request(request)
        .await
        .map_err(|e| format!("send: {e}"))?;
    Ok(response.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response with the given status line.
    async fn one_shot_server(status_line: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let resp = format!("HTTP/1.1 {status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok");
            let _ = sock.write_all(resp.as_bytes()).await;
        });
        port
    }

    #[tokio::test]
    async fn probe_to_closed_port_returns_failed() {
        let result = local_probe(1, "/health", Duration::from_millis(200)).await;
        assert_eq!(result, ProbeResult::Failed);
    }

    #[tokio::test]
    async fn probe_2xx_is_healthy() {
        let port = one_shot_server("200 OK").await;
        let result = local_probe(port, "/health", Duration::from_secs(2)).await;
        assert_eq!(result, ProbeResult::Healthy);
    }

    #[tokio::test]
    async fn probe_5xx_is_unhealthy() {
        let port = one_shot_server("503 Service Unavailable").await;
        let result = local_probe(port, "/health", Duration::from_secs(2)).await;
        assert_eq!(result, ProbeResult::Unhealthy(503));
    }

    #[tokio::test]
    async fn http_prober_dispatches_local_and_url_targets() {
        let prober = HttpProber::new(Duration::from_secs(2)).unwrap();

        let port = one_shot_server("200 OK").await;
        let local = ProbeTarget::Local { port, path: "/health".to_string() };
        assert!(prober.probe(&local).await.is_healthy());

        let port = one_shot_server("404 Not Found").await;
        let url = ProbeTarget::Url(format!("http://127.0.0.1:{port}/docs"));
        assert_eq!(prober.probe(&url).await, ProbeResult::Unhealthy(404));
    }

    #[test]
    fn target_display() {
        let t = ProbeTarget::Local { port: 8002, path: "/health".to_string() };
        assert_eq!(t.to_string(), "http://127.0.0.1:8002/health");
    }
}
