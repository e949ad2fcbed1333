//! SOCKS5 acceptor: handshake, CONNECT request, destination metadata.

use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;
use tracing::{debug, info};

use super::constants::*;
use crate::relay::{InboundConn, InboundSource};
use crate::Result;

/// How long a client gets to finish the SOCKS5 handshake.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Listens for SOCKS5 clients and performs the no-auth CONNECT handshake
/// before handing the connection to the relay engine.
///
/// Handshakes run on their own tasks so a client that connects and then goes
/// silent cannot hold up the accept loop; its handshake times out on its own
/// task while other clients keep being served.
pub struct Socks5Server {
    listener: TcpListener,
    handshake_timeout: Duration,
    completed_tx: mpsc::Sender<Result<Socks5Conn>>,
    completed_rx: Mutex<mpsc::Receiver<Result<Socks5Conn>>>,
}

impl Socks5Server {
    /// Bind the listener to the configured `BindAddress`.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind SOCKS5 listener on {}", addr))?;
        info!("SOCKS5 listener bound on {}", listener.local_addr()?);
        let (completed_tx, completed_rx) = mpsc::channel(64);
        Ok(Self {
            listener,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            completed_tx,
            completed_rx: Mutex::new(completed_rx),
        })
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

#[async_trait]
impl InboundSource for Socks5Server {
    type Conn = Socks5Conn;

    async fn accept(&self) -> Result<Socks5Conn> {
        let mut completed_rx = self.completed_rx.lock().await;
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (mut stream, peer) = accepted.context("SOCKS5 accept failed")?;
                    let completed_tx = self.completed_tx.clone();
                    let handshake_timeout = self.handshake_timeout;
                    tokio::spawn(async move {
                        let result = timeout(handshake_timeout, handshake(&mut stream))
                            .await
                            .unwrap_or_else(|_| {
                                Err(anyhow!("SOCKS5 handshake timed out for {}", peer))
                            });
                        let conn = result.map(|destination| {
                            debug!("accepted SOCKS5 connection from {} to {}", peer, destination);
                            Socks5Conn {
                                stream,
                                peer,
                                destination,
                            }
                        });
                        let _ = completed_tx.send(conn).await;
                    });
                }
                completed = completed_rx.recv() => {
                    // The sender half lives in self, so the channel only
                    // closes when the server is dropped.
                    return completed.unwrap_or_else(|| Err(anyhow!("SOCKS5 listener closed")));
                }
            }
        }
    }
}

/// A handshake-complete client connection plus its declared destination.
pub struct Socks5Conn {
    stream: TcpStream,
    peer: SocketAddr,
    destination: String,
}

impl InboundConn for Socks5Conn {
    fn destination(&self) -> String {
        self.destination.clone()
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        Some(self.peer)
    }
}

impl AsyncRead for Socks5Conn {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Socks5Conn {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}

/// Run the greeting and request phases, reply success, and return the
/// destination as `host:port`. Only the no-auth method and the CONNECT
/// command are accepted.
async fn handshake(stream: &mut TcpStream) -> Result<String> {
    // Greeting: VER NMETHODS METHODS...
    let mut header = [0u8; 2];
    stream
        .read_exact(&mut header)
        .await
        .context("failed to read greeting header")?;
    if header[0] != SOCKS5_VERSION {
        return Err(anyhow!("unsupported SOCKS version: {}", header[0]));
    }
    let mut methods = vec![0u8; header[1] as usize];
    stream
        .read_exact(&mut methods)
        .await
        .context("failed to read auth methods")?;

    if !methods.contains(&SOCKS5_AUTH_NONE) {
        stream
            .write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_UNSUPPORTED])
            .await?;
        return Err(anyhow!("client offered no supported auth method"));
    }
    stream.write_all(&[SOCKS5_VERSION, SOCKS5_AUTH_NONE]).await?;

    // Request: VER CMD RSV ATYP ADDR PORT
    let mut request = [0u8; 4];
    stream
        .read_exact(&mut request)
        .await
        .context("failed to read request header")?;
    if request[0] != SOCKS5_VERSION {
        return Err(anyhow!("invalid SOCKS version in request: {}", request[0]));
    }
    if request[1] != SOCKS5_CMD_CONNECT {
        send_reply(stream, SOCKS5_REPLY_COMMAND_NOT_SUPPORTED).await?;
        return Err(anyhow!("unsupported command: {}", request[1]));
    }

    let host = match request[3] {
        SOCKS5_ADDR_IPV4 => {
            let mut octets = [0u8; 4];
            stream.read_exact(&mut octets).await?;
            std::net::Ipv4Addr::from(octets).to_string()
        }
        SOCKS5_ADDR_IPV6 => {
            let mut octets = [0u8; 16];
            stream.read_exact(&mut octets).await?;
            format!("[{}]", std::net::Ipv6Addr::from(octets))
        }
        SOCKS5_ADDR_DOMAIN => {
            let mut len = [0u8; 1];
            stream.read_exact(&mut len).await?;
            if len[0] == 0 {
                return Err(anyhow!("domain name length cannot be zero"));
            }
            let mut domain = vec![0u8; len[0] as usize];
            stream.read_exact(&mut domain).await?;
            String::from_utf8(domain).context("invalid UTF-8 in domain name")?
        }
        other => return Err(anyhow!("unsupported address type: {}", other)),
    };

    let mut port = [0u8; 2];
    stream.read_exact(&mut port).await?;
    let port = u16::from_be_bytes(port);

    send_reply(stream, SOCKS5_REPLY_SUCCESS).await?;
    Ok(format!("{}:{}", host, port))
}

/// Reply with the given code and a zeroed IPv4 bind address.
async fn send_reply(stream: &mut TcpStream, code: u8) -> Result<()> {
    let reply = [
        SOCKS5_VERSION,
        code,
        SOCKS5_RESERVED,
        SOCKS5_ADDR_IPV4,
        0,
        0,
        0,
        0,
        0,
        0,
    ];
    stream
        .write_all(&reply)
        .await
        .context("failed to send reply")?;
    Ok(())
}
