//! Field Parsers
//!
//! Narrow, side-effect-free converters for individual configuration values.
//! Each validates exactly one field type and fails independently with a
//! descriptive error.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use anyhow::{anyhow, Context};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ipnet::IpNet;

use crate::Result;

/// Decode a standard-base64 WireGuard key and re-encode it as lowercase hex.
///
/// The decoded material must be exactly 32 bytes, the Curve25519 key length.
pub fn base64_key_to_hex(key: &str) -> Result<String> {
    let decoded = BASE64
        .decode(key)
        .map_err(|_| anyhow!("invalid base64 string: {}", key))?;
    if decoded.len() != 32 {
        return Err(anyhow!("key should be 32 bytes: {}", key));
    }
    Ok(decoded.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Parse a comma-separated list of bare IP addresses.
///
/// Empty input yields an empty list, not an error.
pub fn parse_addr_list(value: &str) -> Result<Vec<IpAddr>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<IpAddr>()
                .with_context(|| format!("invalid address: {}", s))
        })
        .collect()
}

/// Parse a comma-separated list of host addresses written in CIDR form.
///
/// Each entry must carry a full-length prefix (/32 for IPv4, /128 for IPv6),
/// i.e. it names exactly one host. The prefix is discarded after validation
/// and the bare addresses are returned.
pub fn parse_host_prefix_list(value: &str) -> Result<Vec<IpAddr>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    let mut addrs = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        let net: IpNet = entry
            .parse()
            .with_context(|| format!("invalid interface address: {}", entry))?;
        if net.prefix_len() != net.max_prefix_len() {
            return Err(anyhow!(
                "interface address subnet should be /32 for IPv4 and /128 for IPv6: {}",
                entry
            ));
        }
        addrs.push(net.addr());
    }
    Ok(addrs)
}

/// Parse a comma-separated list of network prefixes (CIDR).
///
/// No bit-width restriction and no dedup or overlap checking; the prefixes
/// are returned in input order.
pub fn parse_prefix_list(value: &str) -> Result<Vec<IpNet>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<IpNet>()
                .with_context(|| format!("invalid network prefix: {}", s))
        })
        .collect()
}

/// Base-10 integer parse.
pub fn parse_int(value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .with_context(|| format!("invalid integer: {}", value))
}

/// Resolve a `host:port` endpoint through the system resolver.
///
/// Resolution happens exactly once, at parse time; the returned string is the
/// resolved `ip:port` and is never re-resolved later.
pub fn resolve_endpoint(endpoint: &str) -> Result<String> {
    let addr: SocketAddr = endpoint
        .to_socket_addrs()
        .with_context(|| format!("failed to resolve endpoint: {}", endpoint))?
        .next()
        .ok_or_else(|| anyhow!("no address found for endpoint: {}", endpoint))?;
    Ok(addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64 of 32 zero bytes
    const ZERO_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    #[test]
    fn test_base64_key_roundtrip() {
        let hex = base64_key_to_hex(ZERO_KEY).unwrap();
        assert_eq!(hex, "00".repeat(32));
        assert_eq!(hex.len(), 64);
    }

    #[test]
    fn test_base64_key_length_error() {
        // 3 bytes, valid base64
        let err = base64_key_to_hex("YWJj").unwrap_err();
        assert!(err.to_string().contains("32 bytes"));
    }

    #[test]
    fn test_base64_key_decode_error() {
        assert!(base64_key_to_hex("not base64!!").is_err());
    }

    #[test]
    fn test_parse_addr_list() {
        let addrs = parse_addr_list("1.1.1.1, 8.8.8.8").unwrap();
        assert_eq!(addrs.len(), 2);
        assert_eq!(addrs[0].to_string(), "1.1.1.1");
        assert!(parse_addr_list("").unwrap().is_empty());
        assert!(parse_addr_list("not-an-ip").is_err());
    }

    #[test]
    fn test_parse_host_prefix_list_requires_full_bits() {
        let addrs = parse_host_prefix_list("10.0.0.2/32").unwrap();
        assert_eq!(addrs, vec!["10.0.0.2".parse::<IpAddr>().unwrap()]);
        assert!(parse_host_prefix_list("10.0.0.0/24").is_err());
        assert!(parse_host_prefix_list("fd00::2/128").is_ok());
        assert!(parse_host_prefix_list("fd00::/64").is_err());
    }

    #[test]
    fn test_parse_prefix_list_order_and_empty() {
        assert!(parse_prefix_list("").unwrap().is_empty());
        let prefixes = parse_prefix_list("0.0.0.0/0,::/0").unwrap();
        assert_eq!(prefixes.len(), 2);
        assert_eq!(prefixes[0].to_string(), "0.0.0.0/0");
        assert_eq!(prefixes[1].to_string(), "::/0");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("1280").unwrap(), 1280);
        assert!(parse_int("12a").is_err());
    }

    #[test]
    fn test_resolve_endpoint_literal() {
        assert_eq!(
            resolve_endpoint("127.0.0.1:51820").unwrap(),
            "127.0.0.1:51820"
        );
        assert!(resolve_endpoint("missing-port").is_err());
    }
}
