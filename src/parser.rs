//! Stateless request-line, header-line, range and transfer-mode parsers
//! (§4.1). Every function here is total on its input: malformed input is
//! a `None`/`Err`, never a panic.

use crate::enums::{Verb, Version};
use crate::transport::TransferMode;

/// Strip a trailing `\r\n` (preferred) or `\n` from `buf`. Returns
/// `false` if neither terminator is present.
pub fn strip_trailing_newline(buf: &mut &[u8]) -> bool {
    if let Some(stripped) = buf.strip_suffix(b"\r\n") {
        *buf = stripped;
        true
    } else if let Some(stripped) = buf.strip_suffix(b"\n") {
        *buf = stripped;
        true
    } else {
        false
    }
}

/// Parsed `VERB SP PATH SP HTTP/x.y` request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub verb: Verb,
    pub path: String,
    pub version: Version,
}

/// Split on exactly two single spaces; reject empty fields; the version
/// field must start with `HTTP/`.
pub fn parse_request_line(line: &[u8]) -> Option<RequestLine> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.splitn(3, ' ');
    let verb = parts.next()?;
    let path = parts.next()?;
    let version = parts.next()?;
    if verb.is_empty() || path.is_empty() || version.is_empty() {
        return None;
    }
    if !version.starts_with("HTTP/") {
        return None;
    }
    Some(RequestLine {
        verb: Verb::from_bytes(verb.as_bytes()),
        path: path.to_string(),
        version: Version::from_bytes(version.as_bytes()),
    })
}

/// Split a header line at the first `:`; an optional single leading
/// space in the value is stripped. Both sides must be non-empty.
pub fn parse_header_line(line: &[u8]) -> Option<(&str, &str)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (name, rest) = line.split_at(colon);
    let mut value = &rest[1..];
    if value.first() == Some(&b' ') {
        value = &value[1..];
    }
    if name.is_empty() || value.is_empty() {
        return None;
    }
    let name = std::str::from_utf8(name).ok()?;
    let value = std::str::from_utf8(value).ok()?;
    Some((name, value))
}

/// Parse a `Range: bytes=a-b` header value into `(start, end)`. Both
/// parts are required, both must be non-negative, and `a < b`.
pub fn parse_range(header: &str) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let a: u64 = a.trim().parse().ok()?;
    let b: u64 = b.trim().parse().ok()?;
    if a < b {
        Some((a, b))
    } else {
        None
    }
}

/// §4.1 `decideTransferMode`: `close` forces Streaming, `keep-alive`
/// forces ChunkedStreaming, otherwise ChunkedStreaming iff HTTP/1.1.
pub fn decide_transfer_mode(version: Version, connection_header: Option<&[u8]>) -> TransferMode {
    if let Some(val) = connection_header {
        if crate::headers::is_close(val) {
            return TransferMode::Streaming;
        }
        if crate::headers::is_keep_alive(val) {
            return TransferMode::ChunkedStreaming;
        }
    }
    if version == Version::Http11 {
        TransferMode::ChunkedStreaming
    } else {
        TransferMode::Streaming
    }
}
