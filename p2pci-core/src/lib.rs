//! P2P-CI protocol core.
//! Host-driven: no I/O; daemons pass received bytes in and write the returned responses out.

pub mod directory;
pub mod document;
pub mod identity;
pub mod protocol;
pub mod registry;
pub mod wire;

pub use directory::{DirectorySession, SessionState};
pub use identity::{DocumentRecord, PeerIdentity};
pub use protocol::{
    Headers, Method, Request, Response, Status, Target, DEFAULT_DIRECTORY_PORT,
    DEFAULT_PROTOCOL_VERSION,
};
pub use registry::Registry;
pub use wire::{
    decode_request, decode_response, encode_request, encode_response, FrameError,
    RequestDecodeError, ResponseDecodeError, ResponseHead,
};
