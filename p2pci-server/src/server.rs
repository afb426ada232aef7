//! Directory server: TCP accept loop, one task per peer connection.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use p2pci_core::wire::{encode_response, request_frame_len};
use p2pci_core::{DirectorySession, FrameError, Registry, Response};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

const READ_BUF_SIZE: usize = 4096;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Listening directory server with its registry.
pub struct DirectoryServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    version: Arc<str>,
}

impl DirectoryServer {
    pub async fn bind(addr: impl ToSocketAddrs, version: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            version: Arc::from(version),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Accept connections until the task is dropped. Accept errors are logged and retried.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::info!(%addr, "connection accepted");
                    let session = DirectorySession::new(self.registry.clone(), &*self.version);
                    let version = self.version.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, addr, session, &version).await;
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Serve pipelined requests until the peer closes or the socket errors, then tear the session down.
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    mut session: DirectorySession,
    version: &str,
) {
    let mut buf: Vec<u8> = Vec::with_capacity(READ_BUF_SIZE);
    let mut chunk = [0u8; READ_BUF_SIZE];
    'conn: loop {
        loop {
            let frame: Vec<u8> = match request_frame_len(&buf) {
                Ok(n) => buf.drain(..n).collect(),
                Err(FrameError::NeedMore) => break,
                Err(FrameError::TooLarge) => {
                    tracing::warn!(%addr, "request head too large");
                    let reply = encode_response(&Response::bad_request(), version);
                    if let Err(e) = stream.write_all(&reply).await {
                        tracing::debug!(%addr, error = %e, "write failed");
                    }
                    break 'conn;
                }
            };
            let response = session.on_request(&frame);
            log_request(&session, addr, &frame, &response);
            if let Err(e) = stream.write_all(&encode_response(&response, version)).await {
                tracing::warn!(%addr, error = %e, "write failed");
                break 'conn;
            }
        }
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
            Err(e) => {
                tracing::warn!(%addr, error = %e, "read failed");
                break;
            }
        }
    }
    match session.on_close() {
        Some(peer) => tracing::info!(%peer, "peer disconnected"),
        None => tracing::info!(%addr, "peer disconnected before registration"),
    }
}

fn log_request(session: &DirectorySession, addr: SocketAddr, frame: &[u8], response: &Response) {
    let text = String::from_utf8_lossy(frame);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("<empty>");
    let status = response.status.code();
    match session.identity() {
        Some(peer) => tracing::info!(%peer, request = line, status, "request"),
        None => tracing::info!(%addr, request = line, status, "request"),
    }
}
