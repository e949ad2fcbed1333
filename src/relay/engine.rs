//! Relay Engine
//!
//! Runs the accept loop against the proxy listener and, per accepted
//! connection, dials the declared destination through the virtual network
//! stack and pumps bytes in both directions until either side closes or the
//! process shuts down.
//!
//! Per-connection state machine: Accepted -> Dialing -> Relaying -> Closed.
//! No retries at any transition; every failure moves directly to Closed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::{ConnectionStats, InboundConn, InboundSource, RelaySession};
use crate::tunnel::VirtualStack;
use crate::Result;

/// Bridges an inbound connection source to the virtual network stack.
///
/// The stack handle is shared read-only across all relay tasks; each task
/// exclusively owns its own two connection handles and releases both on every
/// exit path.
pub struct RelayEngine<L, S> {
    source: L,
    stack: Arc<S>,
    shutdown: broadcast::Sender<()>,
    sessions: Arc<Mutex<HashMap<String, Arc<RelaySession>>>>,
    next_session: AtomicU64,
}

impl<L, S> RelayEngine<L, S>
where
    L: InboundSource,
    S: VirtualStack + 'static,
{
    /// Create a relay engine. `shutdown` is the process-wide cancellation
    /// signal; every long-lived task subscribes to it at construction.
    pub fn new(source: L, stack: Arc<S>, shutdown: broadcast::Sender<()>) -> Self {
        Self {
            source,
            stack,
            shutdown,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session: AtomicU64::new(0),
        }
    }

    /// Number of sessions currently relaying or dialing.
    pub fn active_session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Statistics snapshots for all active sessions.
    pub fn active_session_stats(&self) -> Vec<ConnectionStats> {
        let sessions = self.sessions.lock().unwrap();
        sessions.values().map(|s| s.to_stats()).collect()
    }

    /// Run the accept loop until the shutdown signal fires.
    ///
    /// Accept errors are logged and the loop continues — the proxy keeps
    /// serving. Each accepted connection is relayed on its own task with
    /// unbounded fan-out.
    pub async fn serve(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown.subscribe();
        info!("relay engine accepting connections");

        loop {
            tokio::select! {
                accepted = self.source.accept() => {
                    match accepted {
                        Ok(conn) => self.spawn_relay(conn),
                        Err(e) => warn!("accept error: {:#}", e),
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("relay engine shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn spawn_relay(&self, conn: L::Conn) {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(RelaySession::new(
            format!("relay_{}", id),
            conn.peer_addr(),
            conn.destination(),
        ));

        self.sessions
            .lock()
            .unwrap()
            .insert(session.session_id.clone(), Arc::clone(&session));

        let stack = Arc::clone(&self.stack);
        let sessions = Arc::clone(&self.sessions);
        let shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            relay_connection(conn, stack, Arc::clone(&session), shutdown_rx).await;
            session.log_stats();
            sessions.lock().unwrap().remove(&session.session_id);
        });
    }
}

/// Relay one accepted connection until either copy direction finishes or the
/// shutdown signal fires. Both connection handles are dropped on every exit
/// path, which closes them.
async fn relay_connection<C, S>(
    conn: C,
    stack: Arc<S>,
    session: Arc<RelaySession>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    C: InboundConn + 'static,
    S: VirtualStack + 'static,
{
    let target = session.target.clone();
    debug!(session_id = %session.session_id, %target, "dialing through tunnel");

    // Dialing: the dial races the shared cancellation signal. A failure here
    // drops the inbound connection with no data relayed.
    let outbound = tokio::select! {
        dialed = stack.dial_tcp(&target) => match dialed {
            Ok(stream) => stream,
            Err(e) => {
                warn!(session_id = %session.session_id, "failed to dial {} through tunnel: {:#}", target, e);
                return;
            }
        },
        _ = shutdown_rx.recv() => {
            debug!(session_id = %session.session_id, "shutdown before dial completed");
            return;
        }
    };

    debug!(session_id = %session.session_id, %target, "relaying");

    let (mut inbound_read, mut inbound_write) = tokio::io::split(conn);
    let (mut outbound_read, mut outbound_write) = tokio::io::split(outbound);

    // Two concurrent copies report on a 2-slot channel; the first one to
    // finish wins and the other is abandoned.
    let (tx, mut rx) = mpsc::channel::<std::io::Result<u64>>(2);

    let up_tx = tx.clone();
    let up_session = Arc::clone(&session);
    let up = tokio::spawn(async move {
        let result = copy_with_progress(&mut inbound_read, &mut outbound_write, |n| {
            up_session.add_bytes_up(n)
        })
        .await;
        let _ = up_tx.send(result).await;
    });

    let down_session = Arc::clone(&session);
    let down = tokio::spawn(async move {
        let result = copy_with_progress(&mut outbound_read, &mut inbound_write, |n| {
            down_session.add_bytes_down(n)
        })
        .await;
        let _ = tx.send(result).await;
    });

    tokio::select! {
        finished = rx.recv() => match finished {
            Some(Ok(_)) => debug!(session_id = %session.session_id, "relay direction finished"),
            Some(Err(e)) => debug!(session_id = %session.session_id, "relay error: {}", e),
            None => {}
        },
        _ = shutdown_rx.recv() => {
            info!(session_id = %session.session_id, "shutting down connection relay");
        }
    }

    // Aborting both copy tasks drops all four stream halves, which closes
    // both connections and unblocks the abandoned copy.
    up.abort();
    down.abort();
}

/// Copy bytes until EOF or error, reporting each chunk through `on_progress`
/// as it is written. Counting per chunk keeps session statistics accurate for
/// a copy direction that is later abandoned mid-stream.
async fn copy_with_progress<R, W, F>(
    reader: &mut R,
    writer: &mut W,
    on_progress: F,
) -> std::io::Result<u64>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
    F: Fn(u64),
{
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut buf = vec![0u8; 8192];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            writer.flush().await?;
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
        on_progress(n as u64);
    }
}
