//! A running peer: document store, responder task and directory connection.

use std::net::SocketAddr;
use std::sync::Arc;

use p2pci_core::{document, DocumentRecord, PeerIdentity};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::directory_client::{DirectoryClient, DirectoryClientError, DirectoryReply};
use crate::fetch::{fetch_document, FetchError};
use crate::responder::Responder;
use crate::storage::DocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("open document directory {path}: {source}")]
    Store {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("bind responder: {0}")]
    Bind(std::io::Error),
    #[error("connect to directory {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("advertise downloaded document: {0}")]
    Directory(#[from] DirectoryClientError),
}

pub struct PeerNode {
    store: Arc<DocumentStore>,
    responder_addr: SocketAddr,
    responder: JoinHandle<()>,
    directory: DirectoryClient,
    version: String,
}

impl PeerNode {
    /// Open the store, start the responder, then connect to the directory.
    /// The advertised host defaults to the local address of the directory connection.
    pub async fn start(config: &Config) -> Result<Self, StartError> {
        let dir = config.rfc_dir();
        let store = DocumentStore::open(&dir)
            .await
            .map_err(|source| StartError::Store { path: dir, source })?;
        let store = Arc::new(store);

        let responder = Responder::bind(
            (config.listen_host.as_str(), 0),
            store.clone(),
            &config.protocol_version,
        )
        .await
        .map_err(StartError::Bind)?;
        let responder_addr = responder.local_addr().map_err(StartError::Bind)?;

        let addr = format!("{}:{}", config.server_host, config.server_port);
        let stream = TcpStream::connect((config.server_host.as_str(), config.server_port))
            .await
            .map_err(|source| StartError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let host = match &config.advertise_host {
            Some(h) => h.clone(),
            None => stream
                .local_addr()
                .map_err(|source| StartError::Connect { addr, source })?
                .ip()
                .to_string(),
        };
        let identity = PeerIdentity::new(config.peer_name(), host, responder_addr.port());
        tracing::info!(peer = %identity, dir = %store.dir().display(), "peer started");

        let responder = tokio::spawn(responder.run());
        Ok(Self {
            store,
            responder_addr,
            responder,
            directory: DirectoryClient::new(stream, identity, config.protocol_version.as_str()),
            version: config.protocol_version.clone(),
        })
    }

    pub fn identity(&self) -> &PeerIdentity {
        self.directory.identity()
    }

    pub fn responder_addr(&self) -> SocketAddr {
        self.responder_addr
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// ADD every document already in the store. Returns how many the directory accepted.
    pub async fn register_local_documents(&mut self) -> Result<usize, DirectoryClientError> {
        let docs = self.store.scan().await.map_err(DirectoryClientError::Io)?;
        let mut accepted = 0;
        for doc in docs {
            let reply = self.directory.add(doc.number, &doc.title).await?;
            if reply.is_ok() {
                accepted += 1;
            } else {
                tracing::warn!(
                    number = doc.number,
                    status = %reply.head.status_line,
                    "ADD refused"
                );
            }
        }
        tracing::info!(accepted, "local documents registered");
        Ok(accepted)
    }

    pub async fn add(
        &mut self,
        number: u32,
        title: &str,
    ) -> Result<DirectoryReply, DirectoryClientError> {
        self.directory.add(number, title).await
    }

    pub async fn lookup(&mut self, number: u32) -> Result<DirectoryReply, DirectoryClientError> {
        self.directory.lookup(number).await
    }

    pub async fn list(&mut self) -> Result<DirectoryReply, DirectoryClientError> {
        self.directory.list().await
    }

    /// Peers other than this one that the directory says host `number`.
    /// Self is matched by host and port.
    pub async fn hosts_for(
        &mut self,
        number: u32,
    ) -> Result<Vec<DocumentRecord>, DirectoryClientError> {
        let reply = self.directory.lookup(number).await?;
        if !reply.is_ok() {
            return Ok(Vec::new());
        }
        let me = self.identity();
        let (host, port) = (me.host.clone(), me.port);
        Ok(reply
            .records()
            .into_iter()
            .filter(|r| !(r.owner.host == host && r.owner.port == port))
            .collect())
    }

    /// Fetch `record` from its owner, then advertise this peer as another host of it.
    pub async fn download_from(
        &mut self,
        record: &DocumentRecord,
    ) -> Result<DirectoryReply, DownloadError> {
        fetch_document(
            &record.owner.host,
            record.owner.port,
            record.number,
            &self.store,
            &self.version,
        )
        .await?;
        let title = if record.title.is_empty() {
            document::default_title(record.number)
        } else {
            record.title.clone()
        };
        Ok(self.directory.add(record.number, &title).await?)
    }
}

impl Drop for PeerNode {
    fn drop(&mut self) {
        self.responder.abort();
    }
}
