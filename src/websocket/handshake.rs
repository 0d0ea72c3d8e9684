//! WebSocket upgrade handshake (RFC 6455 §1.3, spec §4.10).
//!
//! Grounded on the teacher's hand-rolled `websocket::keys` module, but
//! the base64 encode/accept-key digest themselves are delegated to the
//! `sha1`/`base64` crates now that both are part of the ambient stack
//! (§ dependency notes in DESIGN.md) rather than hand-written.

use crate::headers::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha1::{Digest, Sha1};

pub const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// `true` if the request headers request a WebSocket upgrade: `Upgrade`
/// contains `websocket` and `Connection` contains `upgrade`
/// (case-insensitive substring match per §4.10).
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    let upgrade = headers.get("Upgrade").unwrap_or("");
    let connection = headers.get("Connection").unwrap_or("");
    contains_ci_token(upgrade, "websocket") && contains_ci_token(connection, "upgrade")
}

fn contains_ci_token(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle)
}

#[derive(Debug)]
pub struct HandshakeError(pub &'static str);

impl std::fmt::Display for HandshakeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "websocket handshake error: {}", self.0)
    }
}

impl std::error::Error for HandshakeError {}

/// Validate the handshake headers and compute the `Sec-WebSocket-Accept`
/// value. Returns the accept key on success.
pub fn accept_key(headers: &HeaderMap) -> Result<String, HandshakeError> {
    if !is_upgrade_request(headers) {
        return Err(HandshakeError("missing Upgrade: websocket / Connection: upgrade"));
    }
    match headers.get("Sec-WebSocket-Version") {
        Some("13") => {}
        _ => return Err(HandshakeError("unsupported Sec-WebSocket-Version")),
    }
    let key = headers.get("Sec-WebSocket-Key").unwrap_or("");
    if key.is_empty() {
        return Err(HandshakeError("missing Sec-WebSocket-Key"));
    }
    Ok(compute_accept(key))
}

/// `base64(SHA1(key || GUID))` (§4.10).
pub fn compute_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    let digest = hasher.finalize();
    STANDARD.encode(digest)
}
