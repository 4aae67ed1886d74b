//! Gateway host reachability

use iofog_config::service::gateway::LOOPBACK_HOST;
use iofog_config::ClientConfig;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Whether a TCP connection to `host:port` succeeds within `limit`
pub async fn host_reachable(host: &str, port: u16, limit: Duration) -> bool {
    match timeout(limit, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            debug!("Connect to {}:{} failed: {}", host, port, e);
            false
        }
        Err(_) => {
            debug!("Connect to {}:{} timed out after {:?}", host, port, limit);
            false
        }
    }
}

/// Keep the configured host when reachable, otherwise switch to loopback
pub async fn resolve_host(config: ClientConfig, limit: Duration) -> ClientConfig {
    if host_reachable(&config.host, config.port, limit).await {
        return config;
    }
    warn!(
        "Host: '{}' is not reachable. Changing to '{}'",
        config.host, LOOPBACK_HOST
    );
    config.with_host(LOOPBACK_HOST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_listening_host_is_kept() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(host_reachable("127.0.0.1", port, Duration::from_secs(1)).await);

        let config = ClientConfig {
            host: "localhost".to_string(),
            port,
            ..ClientConfig::default()
        };
        assert_eq!(resolve_host(config, Duration::from_secs(1)).await.host, "localhost");
    }

    #[tokio::test]
    async fn test_resolvable_host_without_listener_falls_back() {
        // Reserve a port, then free it so connects are refused
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        assert!(!host_reachable("127.0.0.1", port, Duration::from_secs(1)).await);

        let config = ClientConfig {
            host: "localhost".to_string(),
            port,
            ..ClientConfig::default()
        };
        let resolved = resolve_host(config, Duration::from_secs(1)).await;
        assert_eq!(resolved.host, "127.0.0.1");
        assert_eq!(resolved.port, port);
    }

    #[tokio::test]
    async fn test_unresolvable_host_falls_back() {
        let config = ClientConfig::default().with_host("no-such-host.invalid");
        let resolved = resolve_host(config, Duration::from_secs(3)).await;
        assert_eq!(resolved.host, "127.0.0.1");
        assert_eq!(resolved.port, 54321);
    }
}
