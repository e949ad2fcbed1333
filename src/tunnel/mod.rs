//! Tunnel Module
//!
//! Trait seams for the external tunnel collaborators — the transport engine
//! and the userspace virtual network stack — plus the session orchestrator
//! that activates them from a [`DeviceConfig`](crate::DeviceConfig).
//!
//! The engine itself (handshake, encryption, keepalives) is never implemented
//! here; anything that can accept the textual control request and hand back a
//! dialable stack plugs in through [`NetStackProvider`].

pub mod ipc;
pub mod session;
pub mod system;

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;

pub use session::activate;
pub use system::SystemProvider;

/// A relayable byte stream dialed through the virtual network stack.
pub trait ProxyStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ProxyStream for T {}

/// Control plane of the external tunnel transport engine.
pub trait TunnelEngine: Send {
    /// Push the serialized control request (see [`ipc`]) into the engine.
    fn set_control(&mut self, request: &str) -> Result<()>;

    /// Bring the tunnel up. Must be called after `set_control`.
    fn activate(&mut self) -> Result<()>;
}

/// The userspace network stack backed by the tunnel engine. Dialing is safe
/// for concurrent use; the relay engine shares one stack across all sessions.
#[async_trait]
pub trait VirtualStack: Send + Sync {
    /// Open a TCP connection through the tunnel to `target` (`host:port`).
    async fn dial_tcp(&self, target: &str) -> Result<Box<dyn ProxyStream>>;
}

/// Constructor boundary for the engine/stack pair, mirroring the
/// `(localAddress, dnsServers, mtu)` collaborator interface.
pub trait NetStackProvider {
    type Engine: TunnelEngine;
    type Stack: VirtualStack + 'static;

    fn create(
        &self,
        local_addr: Option<IpAddr>,
        dns_servers: &[IpAddr],
        mtu: usize,
    ) -> Result<(Self::Engine, Self::Stack)>;
}

/// Ownership of an activated tunnel: the engine handle plus the dialable
/// virtual network stack. Exclusively owned by the caller of
/// [`activate`]; the relay engine borrows the stack through [`Self::stack`].
pub struct VirtualTunnel<E, S> {
    _engine: E,
    stack: Arc<S>,
}

impl<E, S> std::fmt::Debug for VirtualTunnel<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualTunnel").finish_non_exhaustive()
    }
}

impl<E: TunnelEngine, S: VirtualStack> VirtualTunnel<E, S> {
    pub(crate) fn new(engine: E, stack: S) -> Self {
        Self {
            _engine: engine,
            stack: Arc::new(stack),
        }
    }

    /// Shared read-only handle to the virtual network stack.
    pub fn stack(&self) -> Arc<S> {
        Arc::clone(&self.stack)
    }
}
