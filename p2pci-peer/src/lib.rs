//! P2P-CI peer: serves local documents, talks to the directory, fetches from other peers.

pub mod config;
pub mod directory_client;
pub mod fetch;
pub mod fixtures;
pub mod node;
pub mod responder;
pub mod shell;
pub mod storage;

pub use directory_client::{DirectoryClient, DirectoryClientError, DirectoryReply};
pub use fetch::{fetch_document, FetchError};
pub use node::{DownloadError, PeerNode, StartError};
pub use responder::Responder;
pub use storage::DocumentStore;
