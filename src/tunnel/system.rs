//! Host-stack stand-in provider.
//!
//! Dials targets through the operating system's network stack instead of a
//! userspace tunnel. This keeps the binary runnable end to end when no
//! WireGuard data plane is linked in; a real deployment substitutes a
//! provider whose stack routes through the tunnel engine. The engine half
//! still enforces the control-plane sequencing contract so orchestration bugs
//! surface even without a data plane.

use std::net::IpAddr;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tracing::debug;

use super::{NetStackProvider, ProxyStream, TunnelEngine, VirtualStack};
use crate::Result;

/// Provider wiring [`SystemEngine`] and [`SystemStack`] together.
pub struct SystemProvider;

impl NetStackProvider for SystemProvider {
    type Engine = SystemEngine;
    type Stack = SystemStack;

    fn create(
        &self,
        local_addr: Option<IpAddr>,
        dns_servers: &[IpAddr],
        mtu: usize,
    ) -> Result<(Self::Engine, Self::Stack)> {
        debug!(
            ?local_addr,
            dns = dns_servers.len(),
            mtu,
            "creating host-stack provider"
        );
        Ok((SystemEngine::default(), SystemStack))
    }
}

/// Control-plane shim: accepts and checks the control request grammar but
/// moves no packets.
#[derive(Default)]
pub struct SystemEngine {
    control: Option<String>,
    active: bool,
}

impl SystemEngine {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl TunnelEngine for SystemEngine {
    fn set_control(&mut self, request: &str) -> Result<()> {
        for line in request.lines() {
            if !line.contains('=') {
                bail!("malformed control line: {}", line);
            }
        }
        self.control = Some(request.to_string());
        Ok(())
    }

    fn activate(&mut self) -> Result<()> {
        if self.control.is_none() {
            bail!("engine activated before control request was set");
        }
        self.active = true;
        Ok(())
    }
}

/// Dials through the host network stack.
pub struct SystemStack;

#[async_trait]
impl VirtualStack for SystemStack {
    async fn dial_tcp(&self, target: &str) -> Result<Box<dyn ProxyStream>> {
        let stream = TcpStream::connect(target)
            .await
            .with_context(|| format!("failed to connect to {}", target))?;
        Ok(Box::new(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_requires_control_before_activate() {
        let mut engine = SystemEngine::default();
        assert!(engine.activate().is_err());

        engine.set_control("private_key=ab\n").unwrap();
        assert!(engine.activate().is_ok());
        assert!(engine.is_active());
    }

    #[test]
    fn test_engine_rejects_malformed_control() {
        let mut engine = SystemEngine::default();
        assert!(engine.set_control("private_key=ab\ngarbage\n").is_err());
    }

    #[tokio::test]
    async fn test_stack_dials_host_listener() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.unwrap();
            stream.write_all(&buf).await.unwrap();
        });

        let mut conn = SystemStack.dial_tcp(&addr.to_string()).await.unwrap();
        conn.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        conn.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }
}
