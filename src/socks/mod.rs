//! SOCKS5 Listener Module
//!
//! Minimal no-auth, CONNECT-only SOCKS5 acceptor. The relay engine treats it
//! as an opaque source of inbound connections that carry their destination as
//! metadata; nothing downstream of the handshake knows about SOCKS framing.

pub mod constants;
pub mod server;

pub use server::{Socks5Conn, Socks5Server};
