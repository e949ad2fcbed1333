//! Session Orchestrator
//!
//! Turns a validated device configuration into an activated tunnel: derive
//! the local address, construct the virtual network stack, push the control
//! request, bring the engine up. A strict three-step sequence with no
//! retries; any failure is terminal for the session and surfaces unchanged.

use tracing::{debug, info};

use super::{NetStackProvider, TunnelEngine, VirtualTunnel};
use crate::config::DeviceConfig;
use crate::Result;

/// Activate the tunnel described by `config` using `provider` to construct
/// the engine/stack pair. The returned handle is owned by the caller for the
/// process lifetime.
pub fn activate<P: NetStackProvider>(
    config: &DeviceConfig,
    provider: &P,
) -> Result<VirtualTunnel<P::Engine, P::Stack>> {
    config.validate()?;

    let local_addr = config.tunnel_addr();
    debug!(?local_addr, mtu = config.mtu, "constructing virtual network stack");

    let (mut engine, stack) = provider.create(local_addr, &config.dns_servers, config.mtu)?;
    engine.set_control(&config.ipc_request())?;
    engine.activate()?;

    info!("tunnel engine activated");
    Ok(VirtualTunnel::new(engine, stack))
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::bail;
    use async_trait::async_trait;

    use super::*;
    use crate::config::PeerConfig;
    use crate::tunnel::{ProxyStream, VirtualStack};

    #[derive(Default)]
    struct RecordingEngine {
        control: Arc<std::sync::Mutex<String>>,
        fail_activate: bool,
        steps: Arc<AtomicUsize>,
    }

    impl TunnelEngine for RecordingEngine {
        fn set_control(&mut self, request: &str) -> crate::Result<()> {
            self.steps.fetch_add(1, Ordering::SeqCst);
            *self.control.lock().unwrap() = request.to_string();
            Ok(())
        }

        fn activate(&mut self) -> crate::Result<()> {
            self.steps.fetch_add(1, Ordering::SeqCst);
            if self.fail_activate {
                bail!("engine refused to come up");
            }
            Ok(())
        }
    }

    struct NullStack;

    #[async_trait]
    impl VirtualStack for NullStack {
        async fn dial_tcp(&self, _target: &str) -> crate::Result<Box<dyn ProxyStream>> {
            bail!("not dialable");
        }
    }

    struct RecordingProvider {
        control: Arc<std::sync::Mutex<String>>,
        local_addr: Arc<std::sync::Mutex<Option<IpAddr>>>,
        fail_activate: bool,
    }

    impl NetStackProvider for RecordingProvider {
        type Engine = RecordingEngine;
        type Stack = NullStack;

        fn create(
            &self,
            local_addr: Option<IpAddr>,
            _dns: &[IpAddr],
            _mtu: usize,
        ) -> crate::Result<(Self::Engine, Self::Stack)> {
            *self.local_addr.lock().unwrap() = local_addr;
            Ok((
                RecordingEngine {
                    control: Arc::clone(&self.control),
                    fail_activate: self.fail_activate,
                    steps: Arc::default(),
                },
                NullStack,
            ))
        }
    }

    fn valid_config() -> DeviceConfig {
        DeviceConfig {
            secret_key: "aa".repeat(32),
            local_addresses: vec!["10.0.0.2".parse().unwrap()],
            peers: vec![PeerConfig {
                public_key: "bb".repeat(32),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_activate_pushes_control_and_local_addr() {
        let control = Arc::new(std::sync::Mutex::new(String::new()));
        let local_addr = Arc::new(std::sync::Mutex::new(None));
        let provider = RecordingProvider {
            control: Arc::clone(&control),
            local_addr: Arc::clone(&local_addr),
            fail_activate: false,
        };

        let config = valid_config();
        let tunnel = activate(&config, &provider).unwrap();
        let _stack = tunnel.stack();

        assert_eq!(*control.lock().unwrap(), config.ipc_request());
        assert_eq!(
            *local_addr.lock().unwrap(),
            Some("10.0.0.2".parse().unwrap())
        );
    }

    #[test]
    fn test_activate_propagates_engine_failure() {
        let provider = RecordingProvider {
            control: Arc::default(),
            local_addr: Arc::default(),
            fail_activate: true,
        };
        let err = activate(&valid_config(), &provider).unwrap_err();
        assert!(err.to_string().contains("refused to come up"));
    }

    #[test]
    fn test_activate_rejects_invalid_config() {
        let provider = RecordingProvider {
            control: Arc::default(),
            local_addr: Arc::default(),
            fail_activate: false,
        };
        let config = DeviceConfig::default();
        assert!(activate(&config, &provider).is_err());
    }
}
