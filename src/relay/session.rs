//! Relay Session

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One accepted inbound connection paired with one dialed outbound
/// connection. Lives exactly as long as the relay loop for that pair.
#[derive(Debug)]
pub struct RelaySession {
    pub session_id: String,
    pub client_addr: Option<SocketAddr>,
    pub target: String,
    pub start_time: Instant,
    bytes_up: AtomicU64,
    bytes_down: AtomicU64,
}

/// Statistics snapshot for a relay session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionStats {
    pub session_id: String,
    pub client_addr: Option<SocketAddr>,
    pub target: String,
    pub duration_ms: u64,
    pub bytes_up: u64,
    pub bytes_down: u64,
    pub total_bytes: u64,
}

impl RelaySession {
    pub fn new(session_id: String, client_addr: Option<SocketAddr>, target: String) -> Self {
        debug!(
            "creating relay session {} ({:?} -> {})",
            session_id, client_addr, target
        );
        Self {
            session_id,
            client_addr,
            target,
            start_time: Instant::now(),
            bytes_up: AtomicU64::new(0),
            bytes_down: AtomicU64::new(0),
        }
    }

    /// Bytes relayed client-to-tunnel.
    pub fn bytes_up(&self) -> u64 {
        self.bytes_up.load(Ordering::Relaxed)
    }

    /// Bytes relayed tunnel-to-client.
    pub fn bytes_down(&self) -> u64 {
        self.bytes_down.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.bytes_up() + self.bytes_down()
    }

    pub fn duration(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    pub fn add_bytes_up(&self, bytes: u64) {
        self.bytes_up.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_bytes_down(&self, bytes: u64) {
        self.bytes_down.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn to_stats(&self) -> ConnectionStats {
        ConnectionStats {
            session_id: self.session_id.clone(),
            client_addr: self.client_addr,
            target: self.target.clone(),
            duration_ms: self.duration().as_millis() as u64,
            bytes_up: self.bytes_up(),
            bytes_down: self.bytes_down(),
            total_bytes: self.total_bytes(),
        }
    }

    pub fn log_stats(&self) {
        info!(
            session_id = %self.session_id,
            target = %self.target,
            duration_ms = self.duration().as_millis() as u64,
            bytes_up = self.bytes_up(),
            bytes_down = self.bytes_down(),
            total_bytes = self.total_bytes(),
            "relay session closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_accounting() {
        let session = RelaySession::new(
            "relay_test_1".to_string(),
            Some("127.0.0.1:12345".parse().unwrap()),
            "example.com:443".to_string(),
        );

        assert_eq!(session.total_bytes(), 0);
        session.add_bytes_up(1024);
        session.add_bytes_down(2048);
        session.add_bytes_up(1);

        assert_eq!(session.bytes_up(), 1025);
        assert_eq!(session.bytes_down(), 2048);
        assert_eq!(session.total_bytes(), 3073);

        let stats = session.to_stats();
        assert_eq!(stats.session_id, "relay_test_1");
        assert_eq!(stats.target, "example.com:443");
        assert_eq!(stats.total_bytes, 3073);
    }
}
