//! Connectivity checks.
//!
//! The quote repository asks a `Connectivity` before touching the network.
//! `NetworkMonitor` answers by opening a TCP connection to the quote API host,
//! and can be switched to offline mode by the user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tokio::net::TcpStream;
use tracing::debug;

/// How long a reachability probe may take before the network counts as down.
const PROBE_TIMEOUT_MS: u64 = 3000;

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

#[derive(Debug)]
pub struct NetworkMonitor {
    probe_addr: String,
    timeout: Duration,
    offline_mode: AtomicBool,
}

impl NetworkMonitor {
    /// Probe `host:port`.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            probe_addr: format!("{}:{}", host, port),
            timeout: Duration::from_millis(PROBE_TIMEOUT_MS),
            offline_mode: AtomicBool::new(false),
        }
    }

    /// Probe the host and port `url` points at.
    pub fn for_url(url: &Url) -> Self {
        let host = url.host_str().unwrap_or("localhost");
        let port = url.port_or_known_default().unwrap_or(443);
        Self::new(host, port)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Force every check to report offline until cleared.
    pub fn set_offline_mode(&self, offline: bool) {
        self.offline_mode.store(offline, Ordering::Relaxed);
    }

    pub fn offline_mode(&self) -> bool {
        self.offline_mode.load(Ordering::Relaxed)
    }

    pub fn probe_addr(&self) -> &str {
        &self.probe_addr
    }
}

#[async_trait]
impl Connectivity for NetworkMonitor {
    async fn is_online(&self) -> bool {
        if self.offline_mode() {
            return false;
        }
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.probe_addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!(addr = %self.probe_addr, error = %e, "Network probe failed");
                false
            }
            Err(_) => {
                debug!(addr = %self.probe_addr, "Network probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_for_url_uses_default_port() {
        let url = Url::parse("https://get-quotes-api.p.rapidapi.com/").expect("url");
        assert_eq!(NetworkMonitor::for_url(&url).probe_addr(), "get-quotes-api.p.rapidapi.com:443");

        let url = Url::parse("http://127.0.0.1:8080/v1/").expect("url");
        assert_eq!(NetworkMonitor::for_url(&url).probe_addr(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_reachable_listener_is_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let monitor = NetworkMonitor::new("127.0.0.1", port);
        assert!(monitor.is_online().await);

        monitor.set_offline_mode(true);
        assert!(!monitor.is_online().await);
        monitor.set_offline_mode(false);
        assert!(monitor.is_online().await);
    }

    #[tokio::test]
    async fn test_closed_port_is_offline() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let monitor = NetworkMonitor::new("127.0.0.1", port).with_timeout(Duration::from_millis(500));
        assert!(!monitor.is_online().await);
    }
}
