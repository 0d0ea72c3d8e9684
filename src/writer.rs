//! Stateless response-line, header-block, cookie and date formatters
//! (§4.2). Nothing here owns connection state; `HttpClient` (`client.rs`)
//! calls into this module once it has decided the final header set.

use crate::enums::{Status, Version};
use crate::headers::{http_date_now, Cookie};
use crate::transport::{ConnectionMode, TransferMode};
use std::fmt::Write as _;

pub fn write_status_line(out: &mut Vec<u8>, version: Version, status: &Status) {
    let _ = write!(out, "{} {} {}\r\n", version, status.code(), status.reason());
}

pub fn write_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

/// `Date` is added iff the response is HTTP/1.1 and the header is not
/// already present (§4.2).
pub fn write_date_if_needed(out: &mut Vec<u8>, version: Version, already_present: bool) {
    if version == Version::Http11 && !already_present {
        write_header(out, "Date", &http_date_now());
    }
}

/// Derive `Content-Range`/`Content-Length` (range response) or plain
/// `Content-Length`, and `Transfer-Encoding: chunked`, per §4.2.
/// `total_len` is the full resource size, `range` is `(start, end)` if a
/// satisfiable range was requested. Returns `true` if a `Content-Length`
/// equivalent header was written (so callers can skip `Connection`
/// disambiguation logic that only matters otherwise).
pub fn write_length_headers(
    out: &mut Vec<u8>,
    total_len: Option<u64>,
    range: Option<(u64, u64)>,
    content_length_present: bool,
) {
    if content_length_present {
        return;
    }
    if let (Some((start, end)), Some(total)) = (range, total_len) {
        let _ = write!(out, "Content-Range: bytes {}-{}/{}\r\n", start, end, total);
        write_header(out, "Content-Length", &(end - start).to_string());
    } else if let Some(total) = total_len {
        write_header(out, "Content-Length", &total.to_string());
    }
}

/// Append `chunked` to `Transfer-Encoding`, creating the header if
/// absent, iff `mode` is `ChunkedStreaming` and it is not already there.
pub fn write_transfer_encoding(out: &mut Vec<u8>, mode: TransferMode, existing: Option<&str>) {
    if mode != TransferMode::ChunkedStreaming {
        return;
    }
    match existing {
        Some(enc) if crate::headers::is_chunked(enc.as_bytes()) => {}
        Some(enc) => {
            write_header(out, "Transfer-Encoding", &format!("{}, chunked", enc));
        }
        None => {
            write_header(out, "Transfer-Encoding", "chunked");
        }
    }
}

/// `close` if the request count has reached the configured maximum or
/// the transfer mode forces it, otherwise `keep-alive` (§4.2).
pub fn connection_header_value(mode: ConnectionMode) -> &'static str {
    match mode {
        ConnectionMode::Close => "close",
        ConnectionMode::KeepAlive => "keep-alive",
    }
}

pub fn write_connection_header(out: &mut Vec<u8>, mode: ConnectionMode) {
    write_header(out, "Connection", connection_header_value(mode));
}

/// Format a `Set-Cookie` value by hand (RFC 2109), rather than via a
/// cookie-formatting crate, per §4.2 and §6 — this sidesteps a class of
/// third-party quoting bugs the original library was written to avoid.
pub fn format_set_cookie(cookie: &Cookie) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}={}", cookie.name, crate::headers::percent_encode(&cookie.value));
    if let Some(ref domain) = cookie.domain {
        let _ = write!(out, "; Domain={}", domain);
    }
    if let Some(ref path) = cookie.path {
        let _ = write!(out, "; Path={}", path);
    }
    if cookie.expired {
        out.push_str("; Max-Age=0");
    } else if let Some(max_age) = cookie.max_age {
        let _ = write!(out, "; Max-Age={}", max_age.max(0));
    }
    if cookie.secure {
        out.push_str("; Secure");
    }
    if cookie.http_only {
        out.push_str("; HttpOnly");
    }
    out
}

pub fn write_cookies(out: &mut Vec<u8>, cookies: &[Cookie]) {
    for cookie in cookies {
        write_header(out, "Set-Cookie", &format_set_cookie(cookie));
    }
}
