//! Directory connection state machine: `Unregistered -> Registered -> Closed`.
//!
//! Host-driven like the rest of the core: the server feeds each request frame
//! in and writes the returned response out, then reports the close.

use std::sync::Arc;
use std::time::SystemTime;

use crate::identity::{records_body, PeerIdentity};
use crate::protocol::{header, Headers, Method, Request, Response, Target};
use crate::registry::Registry;
use crate::wire::decode_request;

/// Where a directory connection is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unregistered,
    /// Identity captured when the connection first supplied Host and Port.
    Registered(PeerIdentity),
    Closed,
}

/// One connection's view of the directory.
pub struct DirectorySession {
    registry: Arc<Registry>,
    version: String,
    state: SessionState,
}

impl DirectorySession {
    pub fn new(registry: Arc<Registry>, version: impl Into<String>) -> Self {
        Self {
            registry,
            version: version.into(),
            state: SessionState::Unregistered,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn identity(&self) -> Option<&PeerIdentity> {
        match &self.state {
            SessionState::Registered(peer) => Some(peer),
            _ => None,
        }
    }

    /// Answer one request frame. Frames rejected by the codec never touch the registry.
    pub fn on_request(&mut self, raw: &[u8]) -> Response {
        if self.state == SessionState::Closed {
            return Response::bad_request();
        }
        let request = match decode_request(raw, &self.version) {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "rejected request");
                return e.into_response();
            }
        };
        if self.state == SessionState::Unregistered {
            if let Some(peer) = PeerIdentity::from_headers(&request.headers) {
                self.registry.register_peer(&peer);
                tracing::info!(peer = %peer, "peer registered");
                self.state = SessionState::Registered(peer);
            }
        }
        handle_request(&self.registry, &request)
    }

    /// Tear down: remove the registered peer and its records, exactly once.
    /// Returns the identity that was removed, if any.
    pub fn on_close(&mut self) -> Option<PeerIdentity> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Registered(peer) => {
                let removed = self.registry.remove_peer(&peer);
                tracing::info!(peer = %peer, records = removed, "peer removed");
                Some(peer)
            }
            _ => None,
        }
    }
}

/// Dispatch a decoded request to its directory handler.
pub fn handle_request(registry: &Registry, request: &Request) -> Response {
    match (request.method, request.target) {
        (Method::Add, Target::Rfc(n)) => handle_add(registry, n, &request.headers),
        (Method::Lookup, Target::Rfc(n)) => handle_lookup(registry, n),
        (Method::List, Target::All) => handle_list(registry),
        _ => Response::bad_request(),
    }
}

fn handle_add(registry: &Registry, number: u32, headers: &Headers) -> Response {
    let owner = match PeerIdentity::from_headers(headers) {
        Some(p) => p,
        None => return Response::bad_request(),
    };
    let title = match headers.get(header::TITLE).filter(|t| !t.is_empty()) {
        Some(t) => t,
        None => return Response::bad_request(),
    };
    let record = registry.add_document(number, title, &owner);
    Response::ok(record.to_line(), SystemTime::now())
}

fn handle_lookup(registry: &Registry, number: u32) -> Response {
    let records = registry.lookup(number);
    if records.is_empty() {
        return Response::not_found();
    }
    Response::ok(records_body(&records), SystemTime::now())
}

fn handle_list(registry: &Registry) -> Response {
    Response::ok(records_body(&registry.list_all()), SystemTime::now())
}
