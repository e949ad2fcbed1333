//! IPC Request Serializer
//!
//! Renders a [`DeviceConfig`] into the newline-terminated `key=value` control
//! protocol consumed by the tunnel engine. This string is the sole hand-off
//! artifact configuring the engine, so the format must be reproduced byte for
//! byte: deterministic and peer-order-stable.

use std::fmt::Write;

use crate::config::DeviceConfig;

impl DeviceConfig {
    /// Serialize the device configuration into the control-protocol request.
    ///
    /// `private_key=` first, then per peer: `public_key=`, optional
    /// `preshared_key=`, `endpoint=`, optional
    /// `persistent_keepalive_interval=`, and one `allowed_ip=` line per
    /// prefix in input order. A peer with no allowed IPs routes everything:
    /// exactly `allowed_ip=0.0.0.0/0` and `allowed_ip=::0/0`.
    pub fn ipc_request(&self) -> String {
        let mut request = String::new();
        let _ = writeln!(request, "private_key={}", self.secret_key);
        for peer in &self.peers {
            let _ = writeln!(request, "public_key={}", peer.public_key);
            if let Some(psk) = &peer.preshared_key {
                let _ = writeln!(request, "preshared_key={}", psk);
            }
            if let Some(endpoint) = &peer.endpoint {
                let _ = writeln!(request, "endpoint={}", endpoint);
            }
            if peer.keepalive > 0 {
                let _ = writeln!(
                    request,
                    "persistent_keepalive_interval={}",
                    peer.keepalive
                );
            }
            if peer.allowed_ips.is_empty() {
                request.push_str("allowed_ip=0.0.0.0/0\nallowed_ip=::0/0\n");
            } else {
                for prefix in &peer.allowed_ips {
                    let _ = writeln!(request, "allowed_ip={}", prefix);
                }
            }
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{DeviceConfig, PeerConfig};

    fn device_with_peer(peer: PeerConfig) -> DeviceConfig {
        DeviceConfig {
            secret_key: "aa".repeat(32),
            peers: vec![peer],
            ..Default::default()
        }
    }

    #[test]
    fn test_route_everything_default() {
        let device = device_with_peer(PeerConfig {
            public_key: "bb".repeat(32),
            endpoint: Some("192.0.2.1:51820".to_string()),
            ..Default::default()
        });

        let request = device.ipc_request();
        let lines: Vec<&str> = request.lines().collect();
        assert_eq!(lines[lines.len() - 2], "allowed_ip=0.0.0.0/0");
        assert_eq!(lines[lines.len() - 1], "allowed_ip=::0/0");
    }

    #[test]
    fn test_full_request_ordering() {
        let device = device_with_peer(PeerConfig {
            public_key: "bb".repeat(32),
            preshared_key: Some("cc".repeat(32)),
            endpoint: Some("192.0.2.1:51820".to_string()),
            keepalive: 25,
            allowed_ips: vec!["10.0.0.0/24".parse().unwrap(), "::/0".parse().unwrap()],
        });

        let expected = format!(
            "private_key={}\n\
             public_key={}\n\
             preshared_key={}\n\
             endpoint=192.0.2.1:51820\n\
             persistent_keepalive_interval=25\n\
             allowed_ip=10.0.0.0/24\n\
             allowed_ip=::/0\n",
            "aa".repeat(32),
            "bb".repeat(32),
            "cc".repeat(32),
        );
        assert_eq!(device.ipc_request(), expected);
    }

    #[test]
    fn test_no_peers_only_private_key() {
        let device = DeviceConfig {
            secret_key: "aa".repeat(32),
            ..Default::default()
        };
        assert_eq!(device.ipc_request(), format!("private_key={}\n", "aa".repeat(32)));
    }
}
