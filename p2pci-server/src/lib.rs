//! P2P-CI directory server: tracks which peers host which documents.

pub mod config;
pub mod server;

pub use server::DirectoryServer;
