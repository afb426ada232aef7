//! Directory client: ADD/LOOKUP/LIST over one long-lived connection.

use p2pci_core::protocol::header;
use p2pci_core::wire::{decode_response, encode_request, response_frame_len};
use p2pci_core::{
    identity, DocumentRecord, FrameError, Method, PeerIdentity, Request, ResponseDecodeError,
    ResponseHead, Status, Target,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryClientError {
    #[error("directory connection: {0}")]
    Io(#[from] std::io::Error),
    #[error("directory closed the connection")]
    Closed,
    #[error("directory response too large")]
    TooLarge,
    #[error("malformed directory response: {0}")]
    Malformed(#[from] ResponseDecodeError),
}

/// One directory response.
#[derive(Debug, Clone)]
pub struct DirectoryReply {
    pub head: ResponseHead,
    pub body: String,
}

impl DirectoryReply {
    pub fn is_ok(&self) -> bool {
        self.head.is_ok()
    }

    pub fn status(&self) -> Option<Status> {
        self.head.status()
    }

    /// Record lines in the body.
    pub fn records(&self) -> Vec<DocumentRecord> {
        identity::parse_records(&self.body)
    }
}

pub struct DirectoryClient {
    stream: TcpStream,
    buf: Vec<u8>,
    identity: PeerIdentity,
    version: String,
}

impl DirectoryClient {
    /// Wrap a connected stream. `identity` is advertised on every request.
    pub fn new(stream: TcpStream, identity: PeerIdentity, version: impl Into<String>) -> Self {
        Self {
            stream,
            buf: Vec::new(),
            identity,
            version: version.into(),
        }
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    /// Advertise document `number`. Line breaks in the title are flattened to spaces.
    pub async fn add(
        &mut self,
        number: u32,
        title: &str,
    ) -> Result<DirectoryReply, DirectoryClientError> {
        let title = title.replace(['\r', '\n'], " ");
        let req = self
            .request(Method::Add, Target::Rfc(number))
            .with_header(header::TITLE, title.trim());
        self.call(req).await
    }

    pub async fn lookup(&mut self, number: u32) -> Result<DirectoryReply, DirectoryClientError> {
        let req = self.request(Method::Lookup, Target::Rfc(number));
        self.call(req).await
    }

    pub async fn list(&mut self) -> Result<DirectoryReply, DirectoryClientError> {
        let req = self.request(Method::List, Target::All);
        self.call(req).await
    }

    fn request(&self, method: Method, target: Target) -> Request {
        let req = Request::new(method, target, self.version.as_str())
            .with_header(header::HOST, &self.identity.host)
            .with_header(header::PORT, self.identity.port);
        if self.identity.name != self.identity.host {
            req.with_header(header::HOSTNAME, &self.identity.name)
        } else {
            req
        }
    }

    async fn call(&mut self, req: Request) -> Result<DirectoryReply, DirectoryClientError> {
        tracing::debug!(request = %req.request_line(), "directory request");
        self.stream.write_all(&encode_request(&req)).await?;
        let frame = self.read_frame().await?;
        let (head, start) = decode_response(&frame)?;
        let body = String::from_utf8_lossy(&frame[start..]).into_owned();
        Ok(DirectoryReply { head, body })
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>, DirectoryClientError> {
        let mut chunk = [0u8; 4096];
        loop {
            match response_frame_len(&self.buf) {
                Ok(n) => return Ok(self.buf.drain(..n).collect()),
                Err(FrameError::TooLarge) => return Err(DirectoryClientError::TooLarge),
                Err(FrameError::NeedMore) => {}
            }
            let n = self.stream.read(&mut chunk).await?;
            if n == 0 {
                return Err(DirectoryClientError::Closed);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}
