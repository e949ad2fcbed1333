//! Data Relay Module
//!
//! Accepts inbound proxy connections and shuttles bytes bidirectionally
//! between each one and a connection dialed through the virtual network
//! stack.

pub mod engine;
pub mod session;

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::Result;

pub use engine::RelayEngine;
pub use session::{ConnectionStats, RelaySession};

/// An accepted inbound connection carrying its declared destination.
pub trait InboundConn: AsyncRead + AsyncWrite + Send + Unpin {
    /// Destination metadata (`host:port`) reported by the proxy layer.
    fn destination(&self) -> String;

    /// Remote address of the client, when known.
    fn peer_addr(&self) -> Option<SocketAddr>;
}

/// Source of inbound proxy connections (the SOCKS listener, or a mock).
#[async_trait]
pub trait InboundSource: Send + Sync {
    type Conn: InboundConn + 'static;

    /// Accept the next inbound connection. Errors are per-accept: the relay
    /// engine logs them and keeps serving.
    async fn accept(&self) -> Result<Self::Conn>;
}
