//! Typed device and peer configuration.

use std::net::IpAddr;

use anyhow::bail;
use ipnet::IpNet;

use crate::Result;

/// Default interface MTU when the configuration does not set one.
pub const DEFAULT_MTU: usize = 1280;

/// One remote tunnel peer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeerConfig {
    /// Peer public key as lowercase hex of 32 bytes.
    pub public_key: String,
    /// Optional symmetric key, same encoding as `public_key`.
    pub preshared_key: Option<String>,
    /// Resolved `ip:port` endpoint; DNS is resolved once at parse time.
    pub endpoint: Option<String>,
    /// Persistent keepalive interval in seconds, 0 = disabled.
    pub keepalive: usize,
    /// Network prefixes this peer routes. Empty means "route everything"
    /// at serialization time.
    pub allowed_ips: Vec<IpNet>,
}

/// The local tunnel interface plus its peers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    /// Local private key as lowercase hex of 32 bytes.
    pub secret_key: String,
    /// Host addresses assigned to the interface, each sourced from a
    /// full-bit-length CIDR entry.
    pub local_addresses: Vec<IpAddr>,
    /// Resolver addresses handed to the virtual network stack.
    pub dns_servers: Vec<IpAddr>,
    pub mtu: usize,
    pub peers: Vec<PeerConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            local_addresses: Vec::new(),
            dns_servers: Vec::new(),
            mtu: DEFAULT_MTU,
            peers: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// Derive the local tunnel address: the first IPv4 entry among the
    /// interface addresses, or `None` when the interface is IPv6-only or
    /// unset.
    pub fn tunnel_addr(&self) -> Option<IpAddr> {
        self.local_addresses.iter().copied().find(IpAddr::is_ipv4)
    }

    /// Reject configurations that must not be activated: a device needs a
    /// secret key and at least one peer with a public key.
    pub fn validate(&self) -> Result<()> {
        if self.secret_key.is_empty() {
            bail!("device has no PrivateKey");
        }
        if !self.peers.iter().any(|p| !p.public_key.is_empty()) {
            bail!("device has no peer with a PublicKey");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tunnel_addr_prefers_first_ipv4() {
        let config = DeviceConfig {
            local_addresses: vec![
                "fd00::2".parse().unwrap(),
                "10.0.0.2".parse().unwrap(),
                "10.0.0.3".parse().unwrap(),
            ],
            ..Default::default()
        };
        assert_eq!(config.tunnel_addr(), Some("10.0.0.2".parse().unwrap()));
    }

    #[test]
    fn test_tunnel_addr_none_when_ipv6_only() {
        let config = DeviceConfig {
            local_addresses: vec!["fd00::2".parse().unwrap()],
            ..Default::default()
        };
        assert_eq!(config.tunnel_addr(), None);
    }

    #[test]
    fn test_validate_requires_key_and_peer() {
        let mut config = DeviceConfig::default();
        assert!(config.validate().is_err());

        config.secret_key = "ab".repeat(32);
        assert!(config.validate().is_err());

        config.peers.push(PeerConfig::default());
        assert!(config.validate().is_err());

        config.peers[0].public_key = "cd".repeat(32);
        assert!(config.validate().is_ok());
    }
}
