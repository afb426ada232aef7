//! Fetch client: one GET per fresh connection, body read until the remote closes.
//!
//! There is no `Content-Length` bound on the read; a responder that never
//! closes its side stalls the fetch.

use std::path::PathBuf;

use p2pci_core::protocol::{header, os_label};
use p2pci_core::wire::{decode_response, encode_request};
use p2pci_core::{Method, Request, ResponseDecodeError, Target};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::storage::DocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transfer failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Malformed(#[from] ResponseDecodeError),
    #[error("peer answered `{0}`")]
    Refused(String),
}

/// Fetch document `number` from the peer at `host:port` and store it verbatim.
/// On any failure the previously stored copy, if any, is left as it was.
pub async fn fetch_document(
    host: &str,
    port: u16,
    number: u32,
    store: &DocumentStore,
    version: &str,
) -> Result<PathBuf, FetchError> {
    let mut stream = TcpStream::connect((host, port)).await?;
    let req = Request::new(Method::Get, Target::Rfc(number), version)
        .with_header(header::HOST, host)
        .with_header(header::OS, os_label());
    stream.write_all(&encode_request(&req)).await?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await?;

    let (head, body_start) = decode_response(&raw)?;
    if !head.is_ok() {
        return Err(FetchError::Refused(head.status_line));
    }
    let path = store.write(number, &raw[body_start..]).await?;
    tracing::info!(number, %host, port, bytes = raw.len() - body_start, "document fetched");
    Ok(path)
}
