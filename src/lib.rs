//! Wirebridge Library
//!
//! A SOCKS5-to-WireGuard bridge: clients connect to a local SOCKS5 listener
//! and every accepted stream is relayed, byte for byte, through a userspace
//! tunnel's virtual network stack.
//!
//! The tunnel engine (handshake, encryption, keepalives) and the userspace
//! TCP/IP stack are external collaborators reached through the trait seams in
//! [`tunnel`]; this crate owns the configuration pipeline, the control-plane
//! request serializer, and the connection relay engine.

pub mod config;
pub mod relay;
pub mod shutdown;
pub mod socks;
pub mod tunnel;

pub use config::DeviceConfig;
pub use relay::RelayEngine;
pub use shutdown::ShutdownCoordinator;
pub use tunnel::VirtualTunnel;

/// Common error type for the bridge
pub type Result<T> = anyhow::Result<T>;
