//! Document responder: answers one `GET RFC <n>` per inbound connection from the local store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use p2pci_core::wire::{decode_request, encode_response, request_frame_len};
use p2pci_core::{FrameError, Method, Response, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::storage::DocumentStore;

const READ_BUF_SIZE: usize = 4096;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub struct Responder {
    listener: TcpListener,
    store: Arc<DocumentStore>,
    version: Arc<str>,
}

impl Responder {
    /// Bind the listener. Pass port 0 for an OS-assigned port.
    pub async fn bind(
        addr: impl ToSocketAddrs,
        store: Arc<DocumentStore>,
        version: &str,
    ) -> std::io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
            store,
            version: Arc::from(version),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped, one task per connection.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let store = self.store.clone();
                    let version = self.version.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_one(stream, &store, &version).await {
                            tracing::warn!(%addr, error = %e, "upload failed");
                        }
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

/// Read one request, write one response, close.
async fn serve_one(
    mut stream: TcpStream,
    store: &DocumentStore,
    version: &str,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(READ_BUF_SIZE);
    let mut chunk = [0u8; READ_BUF_SIZE];
    let response = loop {
        match request_frame_len(&buf) {
            Ok(n) => break answer(&buf[..n], store, version).await,
            Err(FrameError::TooLarge) => break Response::bad_request(),
            Err(FrameError::NeedMore) => {}
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            if buf.iter().all(u8::is_ascii_whitespace) {
                return Ok(());
            }
            // Remote half-closed without a blank line; answer what arrived.
            break answer(&buf, store, version).await;
        }
        buf.extend_from_slice(&chunk[..n]);
    };
    tracing::debug!(status = response.status.code(), bytes = response.body.len(), "upload");
    stream.write_all(&encode_response(&response, version)).await?;
    stream.shutdown().await
}

/// Response to one raw GET frame, backed by `store`.
pub async fn answer(raw: &[u8], store: &DocumentStore, version: &str) -> Response {
    let request = match decode_request(raw, version) {
        Ok(r) => r,
        Err(e) => return e.into_response(),
    };
    let number = match (request.method, request.target) {
        (Method::Get, Target::Rfc(n)) => n,
        _ => return Response::bad_request(),
    };
    match store.read(number).await {
        Ok(Some(doc)) => Response::ok(doc.bytes, doc.modified),
        Ok(None) => Response::not_found(),
        Err(e) => {
            tracing::warn!(number, error = %e, "document unreadable");
            Response::not_found()
        }
    }
}
