//! TCP transport timeout/lifecycle state machine (§4.8.1).
//!
//! Pure logic again: this module never touches a socket. It turns raw
//! transport events (bytes arrived, a request finished, a timer fired)
//! into the actions an async driver loop should take — arm/disarm a
//! timer, or close the connection for a given reason — following the
//! same explicit-event style as `client::HttpClient` and
//! `websocket::Connection`.

use super::{CloseReason, TimeoutConfig, TimeoutKind, TransportState};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpAction {
    ArmTimeout(TimeoutKind, Duration),
    DisableTimeout,
    Close(CloseReason),
}

pub struct TcpTransport {
    state: TransportState,
    config: TimeoutConfig,
    first_byte_seen: bool,
}

impl TcpTransport {
    pub fn new(peer_addr: Option<SocketAddr>, local_addr: Option<SocketAddr>, config: TimeoutConfig) -> TcpTransport {
        TcpTransport {
            state: TransportState::new(peer_addr, local_addr),
            config,
            first_byte_seen: false,
        }
    }

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// A fresh connection accepted: arm the connect timeout, if any
    /// (§4.8.1's "no bytes received yet" window).
    pub fn on_accept(&mut self) -> Vec<TcpAction> {
        self.state.arm_timeout(TimeoutKind::Connect);
        match self.config.connect {
            Some(d) => vec![TcpAction::ArmTimeout(TimeoutKind::Connect, d)],
            None => Vec::new(),
        }
    }

    /// Bytes arrived on the wire. The first byte transitions Connect ->
    /// Data; every subsequent read restarts the Data timer.
    pub fn on_bytes_received(&mut self, n: u64) -> Vec<TcpAction> {
        self.state.note_received(n);
        if !self.first_byte_seen {
            self.first_byte_seen = true;
        }
        self.state.arm_timeout(TimeoutKind::Data);
        match self.config.data {
            Some(d) => vec![TcpAction::ArmTimeout(TimeoutKind::Data, d)],
            None => Vec::new(),
        }
    }

    /// A full request has been parsed off the wire: disable the
    /// inbound-data timeout while the handler runs (§4.8.1).
    pub fn on_request_completely_received(&mut self) -> Vec<TcpAction> {
        self.state.timeout_kind = TimeoutKind::Disabled;
        vec![TcpAction::DisableTimeout]
    }

    /// The response for the current request has been fully written.
    /// `keep_alive` mirrors the connection mode decided for that
    /// request: re-arm the keep-alive timer, or close.
    pub fn on_response_sent(&mut self, keep_alive: bool) -> Vec<TcpAction> {
        self.state.request_count += 1;
        if keep_alive && self.state.has_requests_remaining() {
            self.state.arm_timeout(TimeoutKind::KeepAlive);
            match self.config.keep_alive {
                Some(d) => vec![TcpAction::ArmTimeout(TimeoutKind::KeepAlive, d)],
                None => Vec::new(),
            }
        } else {
            vec![TcpAction::Close(CloseReason::Normal)]
        }
    }

    /// A previously-armed timer fired. A Data-timeout is conditional: if
    /// bytes kept arriving above the configured minimum during the
    /// interval, that's progress, not inactivity, so the timer just
    /// restarts instead of closing (§4.8, §8). Every other timeout kind
    /// closes unconditionally.
    pub fn on_timeout_fired(&mut self, kind: TimeoutKind) -> Vec<TcpAction> {
        if kind != self.state.timeout_kind {
            // A stale timer for a since-replaced timeout; ignore.
            return Vec::new();
        }
        if kind == TimeoutKind::Data && !self.state.data_timeout_should_fire(&self.config) {
            self.state.arm_timeout(TimeoutKind::Data);
            return match self.config.data {
                Some(d) => vec![TcpAction::ArmTimeout(TimeoutKind::Data, d)],
                None => Vec::new(),
            };
        }
        vec![TcpAction::Close(CloseReason::TimedOut(kind))]
    }

    pub fn on_peer_closed(&mut self) -> Vec<TcpAction> {
        vec![TcpAction::Close(CloseReason::PeerClosed)]
    }
}
