//! P2P-CI wire protocol: methods, targets, headers, status codes, requests and responses.

use std::fmt;
use std::time::SystemTime;

/// Protocol token used when the deployment does not configure one.
pub const DEFAULT_PROTOCOL_VERSION: &str = "P2P-CI/1.0";

/// Well-known port of the directory server.
pub const DEFAULT_DIRECTORY_PORT: u16 = 7734;

/// Line separator between the request/status line, headers and record lines.
pub const CRLF: &str = "\r\n";

/// Header names used by the protocol.
pub mod header {
    pub const HOST: &str = "Host";
    pub const PORT: &str = "Port";
    pub const TITLE: &str = "Title";
    /// Peer name; the host is used when absent.
    pub const HOSTNAME: &str = "Hostname";
    pub const OS: &str = "OS";
    pub const DATE: &str = "Date";
    pub const LAST_MODIFIED: &str = "Last-Modified";
    pub const CONTENT_LENGTH: &str = "Content-Length";
    pub const CONTENT_TYPE: &str = "Content-Type";
}

/// Request methods. ADD/LOOKUP/LIST go to the directory, GET goes peer to peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Add,
    Lookup,
    List,
    Get,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Add => "ADD",
            Method::Lookup => "LOOKUP",
            Method::List => "LIST",
            Method::Get => "GET",
        }
    }

    /// Exact, case-sensitive match on the method token.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "ADD" => Some(Method::Add),
            "LOOKUP" => Some(Method::Lookup),
            "LIST" => Some(Method::List),
            "GET" => Some(Method::Get),
            _ => None,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request line points at: one document (`RFC <n>`) or everything (`ALL`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Rfc(u32),
    All,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Rfc(n) => write!(f, "RFC {}", n),
            Target::All => f.write_str("ALL"),
        }
    }
}

/// Ordered `Key: Value` headers. Lookup is ASCII case-insensitive; the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A parsed request. The version is kept verbatim; callers gate on it at decode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub target: Target,
    pub version: String,
    pub headers: Headers,
}

impl Request {
    pub fn new(method: Method, target: Target, version: impl Into<String>) -> Self {
        Self {
            method,
            target,
            version: version.into(),
            headers: Headers::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl fmt::Display) -> Self {
        self.headers.insert(name, value.to_string());
        self
    }

    /// First line as sent on the wire, e.g. `LOOKUP RFC 123 P2P-CI/1.0`.
    pub fn request_line(&self) -> String {
        format!("{} {} {}", self.method, self.target, self.version)
    }
}

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
    VersionNotSupported,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::VersionNotSupported => 505,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            200 => Some(Status::Ok),
            400 => Some(Status::BadRequest),
            404 => Some(Status::NotFound),
            505 => Some(Status::VersionNotSupported),
            _ => None,
        }
    }

    /// Reason phrase. The 505 phrase names the protocol, e.g. `P2P-CI Version Not Supported`.
    pub fn reason(&self, version: &str) -> String {
        match self {
            Status::Ok => "OK".to_string(),
            Status::BadRequest => "Bad Request".to_string(),
            Status::NotFound => "Not Found".to_string(),
            Status::VersionNotSupported => {
                let name = version.split('/').next().unwrap_or(version);
                format!("{} Version Not Supported", name)
            }
        }
    }
}

/// Content type of every success body.
pub const TEXT_PLAIN: &str = "text/plain";

/// An outgoing response. `Date`, `OS` and `Content-Length` are derived at encode time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub date: SystemTime,
    pub last_modified: Option<SystemTime>,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Response {
    /// Bodiless response carrying only a status.
    pub fn status(status: Status) -> Self {
        Self {
            status,
            date: SystemTime::now(),
            last_modified: None,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// `200 OK` with a text body last modified at `last_modified`.
    pub fn ok(body: impl Into<Vec<u8>>, last_modified: SystemTime) -> Self {
        Self {
            status: Status::Ok,
            date: SystemTime::now(),
            last_modified: Some(last_modified),
            content_type: Some(TEXT_PLAIN),
            body: body.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::status(Status::BadRequest)
    }

    pub fn not_found() -> Self {
        Self::status(Status::NotFound)
    }

    pub fn version_not_supported() -> Self {
        Self::status(Status::VersionNotSupported)
    }
}

/// Value of the `OS` header for this process.
pub fn os_label() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(t: SystemTime) -> String {
    let dt: chrono::DateTime<chrono::Utc> = t.into();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
