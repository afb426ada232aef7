//! Peer identities and document-hosting records.

use std::fmt;

use crate::protocol::{header, Headers, CRLF};

/// A reachable peer endpoint. Equality is exact string/port equality, never resolved addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl PeerIdentity {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Identity named after its host.
    pub fn from_host(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        Self::new(host.clone(), host, port)
    }

    /// `Host` plus an integer `Port`; the name is `Hostname` when present, else the host.
    /// Returns `None` when either is missing, empty or unparsable.
    pub fn from_headers(headers: &Headers) -> Option<Self> {
        let host = headers.get(header::HOST).filter(|h| !h.is_empty())?;
        let port = headers.get(header::PORT)?.parse::<u16>().ok()?;
        let name = headers
            .get(header::HOSTNAME)
            .filter(|n| !n.is_empty())
            .unwrap_or(host);
        Some(Self::new(name, host, port))
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == self.host {
            write!(f, "{}:{}", self.host, self.port)
        } else {
            write!(f, "{} ({}:{})", self.name, self.host, self.port)
        }
    }
}

/// One peer's claim to host one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentRecord {
    pub number: u32,
    pub title: String,
    pub owner: PeerIdentity,
}

impl DocumentRecord {
    pub fn new(number: u32, title: impl Into<String>, owner: PeerIdentity) -> Self {
        Self {
            number,
            title: title.into(),
            owner,
        }
    }

    /// `RFC <num> <title> <host> <port>`, with `[<name>]` before the host when the name differs.
    /// The name is also written when the title's last word is bracketed, so
    /// [`DocumentRecord::parse_line`] never mistakes that word for a name.
    pub fn to_line(&self) -> String {
        if self.owner.name == self.owner.host && !ends_with_bracketed_word(&self.title) {
            format!(
                "RFC {} {} {} {}",
                self.number, self.title, self.owner.host, self.owner.port
            )
        } else {
            format!(
                "RFC {} {} [{}] {} {}",
                self.number, self.title, self.owner.name, self.owner.host, self.owner.port
            )
        }
    }

    /// Parse a line produced by [`DocumentRecord::to_line`]. Runs of whitespace in the title collapse.
    pub fn parse_line(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 5 || tokens[0] != "RFC" {
            return None;
        }
        let number = tokens[1].parse().ok()?;
        let port = tokens[tokens.len() - 1].parse().ok()?;
        let host = tokens[tokens.len() - 2];
        let maybe_name = tokens[tokens.len() - 3];
        let (title_tokens, name) = match maybe_name
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
        {
            Some(name) if tokens.len() >= 6 && !name.is_empty() => {
                (&tokens[2..tokens.len() - 3], name)
            }
            _ => (&tokens[2..tokens.len() - 2], host),
        };
        Some(Self::new(
            number,
            title_tokens.join(" "),
            PeerIdentity::new(name, host, port),
        ))
    }
}

fn ends_with_bracketed_word(title: &str) -> bool {
    title
        .split_whitespace()
        .last()
        .is_some_and(|w| w.starts_with('[') && w.ends_with(']'))
}

/// Join record lines into a response body.
pub fn records_body(records: &[DocumentRecord]) -> String {
    records
        .iter()
        .map(DocumentRecord::to_line)
        .collect::<Vec<_>>()
        .join(CRLF)
}

/// Parse every record line in a body, skipping lines that are not records.
pub fn parse_records(body: &str) -> Vec<DocumentRecord> {
    body.lines()
        .filter_map(|l| DocumentRecord::parse_line(l.trim()))
        .collect()
}
