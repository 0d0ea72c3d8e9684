//! Transport abstraction: the connection-level object owning wire I/O,
//! timeouts and traffic counters (§4.8), plus the concrete TCP and
//! FastCGI wire layers.
//!
//! The teacher modelled transports as a virtual-dispatch class
//! hierarchy (`AbstractTransport` → `HttpTransport` → `TcpTransport` /
//! `FastCgiTransport`). Per the redesign notes we close that hierarchy
//! into a sum type and dispatch with `match` instead.

pub mod tcp;
pub mod fastcgi;

use std::net::SocketAddr;
use std::time::Duration;

/// How the response body is framed on the wire (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Write raw bytes, no framing; connection mode is forced `Close`
    /// because there is no way to tell the peer where the body ends.
    Streaming,
    /// Body length is known upfront (`Content-Length`); bytes are
    /// buffered in a `TemporaryBuffer` until `close()`.
    Buffered,
    /// `Transfer-Encoding: chunked`; every `write` is framed as a chunk.
    ChunkedStreaming,
}

/// Whether the transport stays open for another request after this one
/// completes (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Close,
    KeepAlive,
}

/// Category of idle timeout currently armed on a transport (§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    Disabled,
    Connect,
    Data,
    KeepAlive,
}

/// Timeout durations per category, and the `minimum_bytes_received`
/// threshold that turns a Data-timeout into "this was progress, don't
/// close" (§4.8, §8).
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    pub connect: Option<Duration>,
    pub data: Option<Duration>,
    pub keep_alive: Option<Duration>,
    pub minimum_bytes_received: u64,
}

impl Default for TimeoutConfig {
    fn default() -> TimeoutConfig {
        TimeoutConfig {
            connect: Some(Duration::from_secs(2)),
            data: Some(Duration::from_secs(5)),
            keep_alive: Some(Duration::from_secs(30)),
            minimum_bytes_received: 512,
        }
    }
}

/// Why a connection was forcibly closed by the timeout machinery, or by
/// the peer. Surfaced to embedders via `tracing` events rather than a
/// signal, per the redesign notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    TimedOut(TimeoutKind),
    PeerClosed,
    Error,
    Normal,
}

/// Bookkeeping shared by every concrete transport: byte/request
/// counters and the currently-armed timeout category. `HttpTransport`
/// (§4.8) in the original design is this struct plus `max_requests` and
/// a backend back-pointer; we fold `max_requests` in here directly since
/// nothing else needs the extra indirection.
#[derive(Debug, Clone)]
pub struct TransportState {
    pub peer_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub request_count: u32,
    pub max_requests: u32,
    pub timeout_kind: TimeoutKind,
    /// Bytes received since the currently-armed timeout was started;
    /// reset whenever the timer restarts. Used to decide whether a
    /// Data-timeout represents real inactivity (§4.8, §8).
    pub bytes_since_timer_start: u64,
}

impl TransportState {
    pub fn new(peer_addr: Option<SocketAddr>, local_addr: Option<SocketAddr>) -> TransportState {
        TransportState {
            peer_addr,
            local_addr,
            bytes_sent: 0,
            bytes_received: 0,
            request_count: 0,
            max_requests: 10,
            timeout_kind: TimeoutKind::Disabled,
            bytes_since_timer_start: 0,
        }
    }

    pub fn note_received(&mut self, n: u64) {
        self.bytes_received += n;
        self.bytes_since_timer_start += n;
    }

    pub fn note_sent(&mut self, n: u64) {
        self.bytes_sent += n;
    }

    pub fn arm_timeout(&mut self, kind: TimeoutKind) {
        self.timeout_kind = kind;
        self.bytes_since_timer_start = 0;
    }

    /// §8: a Data-timeout fires iff bytes received during the interval
    /// are below the configured minimum.
    pub fn data_timeout_should_fire(&self, cfg: &TimeoutConfig) -> bool {
        self.bytes_since_timer_start < cfg.minimum_bytes_received
    }

    pub fn has_requests_remaining(&self) -> bool {
        self.request_count < self.max_requests
    }
}
