//! Text framing: request decode/encode, response encode/decode.
//!
//! Requests end at their first blank line and carry no body. Responses are
//! `status line / headers / blank line / body`; on a persistent connection the
//! body is bounded by `Content-Length`, on a fetch connection by the close.

use crate::protocol::{
    header, http_date, os_label, Headers, Method, Request, Response, Status, Target, CRLF,
};

/// Upper bound on a request head; a peer sending more without a blank line is cut off.
pub const MAX_REQUEST_LEN: usize = 64 * 1024;

/// Framing outcome for a partially read buffer.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("need more bytes")]
    NeedMore,
    #[error("frame too large")]
    TooLarge,
}

/// Why a complete request frame was rejected. Maps onto a 400 or 505 response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestDecodeError {
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("version {0} not supported")]
    VersionNotSupported(String),
}

impl RequestDecodeError {
    pub fn status(&self) -> Status {
        match self {
            RequestDecodeError::BadRequest(_) => Status::BadRequest,
            RequestDecodeError::VersionNotSupported(_) => Status::VersionNotSupported,
        }
    }

    pub fn into_response(self) -> Response {
        Response::status(self.status())
    }
}

/// Client-side response parse failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseDecodeError {
    #[error("no header/body separator")]
    MissingSeparator,
    #[error("empty status line")]
    EmptyStatusLine,
}

/// Length of the first complete request frame in `buf`, including any blank lines before it.
pub fn request_frame_len(buf: &[u8]) -> Result<usize, FrameError> {
    let start = buf
        .iter()
        .take_while(|b| **b == b'\r' || **b == b'\n')
        .count();
    let mut i = start;
    while i < buf.len() {
        if buf[i] == b'\n' {
            match &buf[i + 1..] {
                [b'\n', ..] => return Ok(i + 2),
                [b'\r', b'\n', ..] => return Ok(i + 3),
                _ => {}
            }
        }
        i += 1;
    }
    if buf.len() > MAX_REQUEST_LEN {
        return Err(FrameError::TooLarge);
    }
    Err(FrameError::NeedMore)
}

/// Parse one request frame, gating on `version` before anything but the token count.
pub fn decode_request(raw: &[u8], version: &str) -> Result<Request, RequestDecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| RequestDecodeError::BadRequest("not utf-8"))?;
    let normalized = text.replace(CRLF, "\n");
    let mut lines = normalized.trim_start_matches('\n').split('\n');

    let request_line = lines
        .next()
        .ok_or(RequestDecodeError::BadRequest("empty request"))?;
    let tokens: Vec<&str> = request_line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(RequestDecodeError::BadRequest("short request line"));
    }
    let found_version = tokens[tokens.len() - 1];
    if found_version != version {
        return Err(RequestDecodeError::VersionNotSupported(
            found_version.to_string(),
        ));
    }
    let method =
        Method::parse(tokens[0]).ok_or(RequestDecodeError::BadRequest("unknown method"))?;
    let target = match &tokens[1..tokens.len() - 1] {
        ["RFC", n] => Target::Rfc(
            n.parse()
                .map_err(|_| RequestDecodeError::BadRequest("document number is not an integer"))?,
        ),
        ["ALL"] => Target::All,
        _ => return Err(RequestDecodeError::BadRequest("bad request target")),
    };
    match (method, target) {
        (Method::List, Target::All) => {}
        (Method::List, _) | (_, Target::All) => {
            return Err(RequestDecodeError::BadRequest("target does not fit method"))
        }
        _ => {}
    }

    let mut headers = Headers::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim(), v.trim());
        }
    }

    Ok(Request {
        method,
        target,
        version: found_version.to_string(),
        headers,
    })
}

/// Encode a request: request line, headers, blank line.
pub fn encode_request(req: &Request) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&req.request_line());
    out.push_str(CRLF);
    for (k, v) in req.headers.iter() {
        out.push_str(k);
        out.push_str(": ");
        out.push_str(v);
        out.push_str(CRLF);
    }
    out.push_str(CRLF);
    out.into_bytes()
}

/// Encode a response under `version`. `Content-Length` counts body bytes.
pub fn encode_response(resp: &Response, version: &str) -> Vec<u8> {
    let mut head = format!(
        "{} {} {}{CRLF}",
        version,
        resp.status.code(),
        resp.status.reason(version)
    );
    head.push_str(&format!("{}: {}{CRLF}", header::DATE, http_date(resp.date)));
    head.push_str(&format!("{}: {}{CRLF}", header::OS, os_label()));
    if let Some(t) = resp.last_modified {
        head.push_str(&format!("{}: {}{CRLF}", header::LAST_MODIFIED, http_date(t)));
    }
    head.push_str(&format!(
        "{}: {}{CRLF}",
        header::CONTENT_LENGTH,
        resp.body.len()
    ));
    if let Some(ct) = resp.content_type {
        head.push_str(&format!("{}: {}{CRLF}", header::CONTENT_TYPE, ct));
    }
    head.push_str(CRLF);

    let mut out = head.into_bytes();
    out.extend_from_slice(&resp.body);
    out
}

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status_line: String,
    pub headers: Headers,
}

impl ResponseHead {
    /// Success is the literal `200 OK` anywhere in the status line.
    pub fn is_ok(&self) -> bool {
        self.status_line.contains("200 OK")
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }

    pub fn status(&self) -> Option<Status> {
        self.status_code().and_then(Status::from_code)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.headers.get(header::CONTENT_LENGTH)?.parse().ok()
    }
}

/// First header/body separator: CRLFCRLF if present anywhere, otherwise LFLF.
/// Returns `(offset, separator_len)`.
pub fn find_separator(buf: &[u8]) -> Option<(usize, usize)> {
    if let Some(i) = find(buf, b"\r\n\r\n") {
        return Some((i, 4));
    }
    find(buf, b"\n\n").map(|i| (i, 2))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Split a response into its head and the offset where the body starts.
pub fn decode_response(buf: &[u8]) -> Result<(ResponseHead, usize), ResponseDecodeError> {
    let (at, sep_len) = find_separator(buf).ok_or(ResponseDecodeError::MissingSeparator)?;
    let head = String::from_utf8_lossy(&buf[..at]);
    let mut lines = head.lines();
    let status_line = lines
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .ok_or(ResponseDecodeError::EmptyStatusLine)?;
    let mut headers = Headers::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim(), v.trim());
        }
    }
    Ok((
        ResponseHead {
            status_line,
            headers,
        },
        at + sep_len,
    ))
}

/// Length of the first complete `Content-Length`-framed response in `buf`.
/// A head without `Content-Length` frames an empty body.
pub fn response_frame_len(buf: &[u8]) -> Result<usize, FrameError> {
    match decode_response(buf) {
        Ok((head, body_start)) => {
            let total = body_start + head.content_length().unwrap_or(0);
            if buf.len() >= total {
                Ok(total)
            } else {
                Err(FrameError::NeedMore)
            }
        }
        Err(_) if buf.len() > MAX_REQUEST_LEN => Err(FrameError::TooLarge),
        Err(_) => Err(FrameError::NeedMore),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DEFAULT_PROTOCOL_VERSION as V;

    #[test]
    fn decode_add_with_headers() {
        let raw = b"ADD RFC 123 P2P-CI/1.0\r\nHost: h1\r\nPort: 5000\r\nTitle: A: B\r\n\r\n";
        let req = decode_request(raw, V).unwrap();
        assert_eq!(req.method, Method::Add);
        assert_eq!(req.target, Target::Rfc(123));
        assert_eq!(req.headers.get("Host"), Some("h1"));
        assert_eq!(req.headers.get("Port"), Some("5000"));
        // only the first colon splits
        assert_eq!(req.headers.get("Title"), Some("A: B"));
    }

    #[test]
    fn decode_accepts_bare_lf() {
        let raw = b"LIST ALL P2P-CI/1.0\nHost: h1\nPort: 1\n\n";
        let req = decode_request(raw, V).unwrap();
        assert_eq!(req.method, Method::List);
        assert_eq!(req.target, Target::All);
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn version_gate_beats_other_defects() {
        let err = decode_request(b"FROB RFC x P2P-CI/2.0\r\n\r\n", V).unwrap_err();
        assert_eq!(err, RequestDecodeError::VersionNotSupported("P2P-CI/2.0".into()));
        assert_eq!(err.status(), Status::VersionNotSupported);
    }

    #[test]
    fn bad_requests() {
        for raw in [
            &b"ADD RFC\r\n\r\n"[..],
            b"FROB RFC 1 P2P-CI/1.0\r\n\r\n",
            b"ADD RFC one P2P-CI/1.0\r\n\r\n",
            b"LOOKUP ALL P2P-CI/1.0\r\n\r\n",
            b"LIST RFC 1 P2P-CI/1.0\r\n\r\n",
            b"GET DOC 1 P2P-CI/1.0\r\n\r\n",
            b"GET RFC -1 P2P-CI/1.0\r\n\r\n",
            b"LOOKUP RFC 4294967296 P2P-CI/1.0\r\n\r\n",
            b"\xff\xfe P2P-CI/1.0\r\n\r\n",
        ] {
            let err = decode_request(raw, V).unwrap_err();
            assert_eq!(err.status(), Status::BadRequest, "{:?}", raw);
        }
    }

    #[test]
    fn configured_version_is_used() {
        let raw = b"LIST ALL P2P-DI/1.0\r\n\r\n";
        assert!(decode_request(raw, "P2P-DI/1.0").is_ok());
        assert!(decode_request(raw, V).is_err());
    }

    #[test]
    fn request_framing_pipelined() {
        let a = encode_request(
            &Request::new(Method::Lookup, Target::Rfc(1), V).with_header("Host", "h"),
        );
        let b = encode_request(&Request::new(Method::List, Target::All, V));
        let mut buf = a.clone();
        buf.extend_from_slice(&b);
        let n = request_frame_len(&buf).unwrap();
        assert_eq!(n, a.len());
        assert_eq!(request_frame_len(&buf[n..]).unwrap(), b.len());
        assert_eq!(request_frame_len(&a[..a.len() - 1]), Err(FrameError::NeedMore));
    }

    #[test]
    fn request_framing_skips_leading_blank_lines() {
        let buf = b"\r\nLIST ALL P2P-CI/1.0\n\n";
        assert_eq!(request_frame_len(buf).unwrap(), buf.len());
        assert!(decode_request(buf, V).is_ok());
    }

    #[test]
    fn request_framing_limit() {
        let buf = vec![b'A'; MAX_REQUEST_LEN + 1];
        assert_eq!(request_frame_len(&buf), Err(FrameError::TooLarge));
    }

    #[test]
    fn response_content_length_counts_bytes() {
        let resp = Response::ok("héllo ✓", std::time::SystemTime::now());
        let bytes = encode_response(&resp, V);
        let (head, start) = decode_response(&bytes).unwrap();
        assert!(head.is_ok());
        assert_eq!(head.status(), Some(Status::Ok));
        assert_eq!(head.content_length(), Some("héllo ✓".len()));
        assert_eq!(&bytes[start..], "héllo ✓".as_bytes());
        assert_eq!(head.headers.get("Content-Type"), Some("text/plain"));
        assert!(head.headers.get("Last-Modified").is_some());
        assert!(head.headers.get("Date").is_some());
        assert!(head.headers.get("OS").is_some());
    }

    #[test]
    fn error_response_status_line() {
        let bytes = encode_response(&Response::version_not_supported(), V);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("P2P-CI/1.0 505 P2P-CI Version Not Supported\r\n"));
        assert!(text.contains("Content-Length: 0\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn lf_separator_parses_like_crlf() {
        let crlf = b"P2P-CI/1.0 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let lf = b"P2P-CI/1.0 200 OK\nContent-Length: 5\n\nhello";
        let (h1, s1) = decode_response(crlf).unwrap();
        let (h2, s2) = decode_response(lf).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(&crlf[s1..], &lf[s2..]);
    }

    #[test]
    fn crlf_separator_preferred_over_earlier_lflf() {
        let buf = b"P2P-CI/1.0 200 OK\r\n\r\nline1\n\nline2";
        let (_, start) = decode_response(buf).unwrap();
        assert_eq!(&buf[start..], b"line1\n\nline2");
    }

    #[test]
    fn missing_separator_is_malformed() {
        assert_eq!(
            decode_response(b"P2P-CI/1.0 200 OK\r\nDate: x"),
            Err(ResponseDecodeError::MissingSeparator)
        );
        assert_eq!(
            decode_response(b"\r\n\r\nbody"),
            Err(ResponseDecodeError::EmptyStatusLine)
        );
    }

    #[test]
    fn success_requires_exact_substring() {
        let (head, _) = decode_response(b"P2P-CI/1.0 404 Not Found\r\n\r\n").unwrap();
        assert!(!head.is_ok());
        assert_eq!(head.status(), Some(Status::NotFound));
    }

    #[test]
    fn response_framing_by_content_length() {
        let resp = Response::ok("RFC 1 T h 1", std::time::SystemTime::now());
        let a = encode_response(&resp, V);
        let b = encode_response(&Response::not_found(), V);
        let mut buf = a.clone();
        buf.extend_from_slice(&b);
        assert_eq!(response_frame_len(&buf).unwrap(), a.len());
        assert_eq!(response_frame_len(&buf[a.len()..]).unwrap(), b.len());
        assert_eq!(response_frame_len(&a[..a.len() - 2]), Err(FrameError::NeedMore));
        // a head without Content-Length frames an empty body
        assert_eq!(response_frame_len(b"P2P-CI/1.0 404 Not Found\r\n\r\n").unwrap(), 28);
    }
}
