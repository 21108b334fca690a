//! Reachability checks for the tool host and other network collaborators.

use std::{net::TcpStream, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

/// Check if a service is running by attempting to connect to its port
pub fn is_service_running(host: &str, port: u16) -> bool {
    TcpStream::connect(format!("{}:{}", host, port)).is_ok()
}

/// Split `http://host:port/...` into host and port. Missing ports default by scheme.
pub fn host_and_port(base_url: &str) -> Option<(String, u16)> {
    let (scheme, rest) = base_url.split_once("://")?;
    let authority = rest.split('/').next()?;
    if authority.is_empty() {
        return None;
    }
    match authority.rsplit_once(':') {
        Some((host, port)) => Some((host.to_string(), port.parse().ok()?)),
        None => {
            let port = match scheme {
                "https" => 443,
                _ => 80,
            };
            Some((authority.to_string(), port))
        }
    }
}

/// Poll until the service accepts connections or `attempts` run out.
pub async fn wait_for_service(host: &str, port: u16, attempts: u32, interval: Duration) -> bool {
    for _ in 0..attempts {
        if is_service_running(host, port) {
            info!("[EXTERNAL] {}:{} is accepting connections", host, port);
            return true;
        }
        sleep(interval).await;
    }
    warn!(
        "[EXTERNAL] {}:{} not responding after {:?}",
        host,
        port,
        interval * attempts
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        assert_eq!(
            host_and_port("http://127.0.0.1:8000"),
            Some(("127.0.0.1".to_string(), 8000))
        );
        assert_eq!(
            host_and_port("https://tools.internal/api"),
            Some(("tools.internal".to_string(), 443))
        );
        assert_eq!(host_and_port("not a url"), None);
    }

    #[tokio::test]
    async fn detects_listening_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        assert!(wait_for_service("127.0.0.1", port, 3, Duration::from_millis(10)).await);
        drop(listener);
        assert!(!wait_for_service("127.0.0.1", port, 2, Duration::from_millis(10)).await);
    }
}
