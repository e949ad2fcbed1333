//! Config Model Builder
//!
//! Consumes tokenized sections plus the field parsers to produce a validated
//! [`DeviceConfig`]. The first field-level parse failure aborts the whole
//! build and surfaces that field's error.

use std::path::Path;

use anyhow::{bail, Context};

use super::fields;
use super::tokenizer::{split_pair, SectionKind, Sections};
use super::types::{DeviceConfig, PeerConfig};
use crate::Result;

impl DeviceConfig {
    /// Load and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_bytes(&raw)
    }

    /// Parse raw configuration bytes.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        Self::from_sections(&Sections::tokenize(raw, SectionKind::Preamble))
    }

    /// Build the device model from already-tokenized sections.
    ///
    /// Both the `[Interface]` and the `[Peer]` section must be present; their
    /// absence fails with a distinct error before any field parsing. Exactly
    /// one peer is built, from the merged `[Peer]` lines — repeated `[Peer]`
    /// sections do not produce additional peers.
    pub fn from_sections(sections: &Sections) -> Result<Self> {
        let interface = sections
            .get(SectionKind::Interface)
            .ok_or_else(|| anyhow::anyhow!("not found Interface"))?;
        let peer = sections
            .get(SectionKind::Peer)
            .ok_or_else(|| anyhow::anyhow!("not found Peer"))?;

        let mut device = build_interface(interface)?;
        device.peers.push(build_peer(peer)?);
        Ok(device)
    }
}

fn build_interface(lines: &[String]) -> Result<DeviceConfig> {
    let mut device = DeviceConfig::default();
    for line in lines {
        let (key, value) = split_pair(line);
        match key {
            "Address" => device.local_addresses = fields::parse_host_prefix_list(value)?,
            "PrivateKey" => device.secret_key = fields::base64_key_to_hex(value)?,
            "DNS" => device.dns_servers = fields::parse_addr_list(value)?,
            "MTU" => device.mtu = fields::parse_int(value)?,
            _ => {}
        }
    }
    Ok(device)
}

fn build_peer(lines: &[String]) -> Result<PeerConfig> {
    let mut peer = PeerConfig::default();
    for line in lines {
        let (key, value) = split_pair(line);
        match key {
            "PublicKey" => peer.public_key = fields::base64_key_to_hex(value)?,
            "PresharedKey" => peer.preshared_key = Some(fields::base64_key_to_hex(value)?),
            "Endpoint" => peer.endpoint = Some(fields::resolve_endpoint(value)?),
            "AllowedIPs" => peer.allowed_ips = fields::parse_prefix_list(value)?,
            "PersistentKeepalive" => peer.keepalive = fields::parse_int(value)?,
            _ => {}
        }
    }
    Ok(peer)
}

/// Extract the SOCKS5 `BindAddress` value from the `[Socks5]` section.
///
/// A present-but-empty key is an error; an absent section or key returns an
/// empty string so the caller decides whether a listener is mandatory.
pub fn socks5_bind_addr(sections: &Sections) -> Result<String> {
    let Some(lines) = sections.get(SectionKind::Socks5) else {
        return Ok(String::new());
    };
    for line in lines {
        let (key, value) = split_pair(line);
        if key == "BindAddress" {
            if value.is_empty() {
                bail!("not found BindAddress");
            }
            return Ok(value.to_string());
        }
    }
    Ok(String::new())
}
