//! WebSocket support (RFC 6455, spec §4.10): handshake, frame codec,
//! and the connection-level state machine (fragmentation, ping/pong,
//! close handshake, read modes).

pub mod codec;
pub mod handshake;

use crate::error::Error;
use codec::{apply_mask, write_close_frame, write_frame, Frame, OpCode};
use rand::{rng, Rng};
use std::str;

/// How inbound frames are surfaced to the application (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// One complete, UTF-8-validated message per `poll()`.
    Frame,
    /// One event per wire frame, but payloads spanning fragmentation
    /// accumulate before being handed over.
    FrameStreaming,
    /// One event per inbound packet, including partial ones; UTF-8
    /// validation is skipped entirely.
    Streaming,
}

/// A complete inbound message, reassembled from one or more frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close(Option<CloseFrame>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

/// Outcome of feeding bytes into a `Connection`: messages the
/// application should see, plus bytes the transport should write back
/// (auto Pong replies, the mirrored Close frame) — returned explicitly
/// rather than dispatched through callbacks (§9 redesign note).
#[derive(Debug, Default)]
pub struct PollResult {
    pub messages: Vec<Message>,
    pub outbound: Vec<u8>,
    pub should_close: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Text,
    Binary,
}

/// RFC 6455 §7.4: codes below 1000, above 4999, or in the two reserved
/// bands 1004-1006 / 1012-2999 must never appear on the wire.
fn is_valid_close_code(code: u16) -> bool {
    if code < 1000 || code > 4999 {
        return false;
    }
    !matches!(code, 1004..=1006 | 1012..=2999)
}

/// One side of a WebSocket connection. `server_side = true` expects
/// masked inbound frames and never masks outbound ones; the reverse for
/// a client.
pub struct Connection {
    server_side: bool,
    read_mode: ReadMode,
    scan: Vec<u8>,
    fragment: Option<(FragmentKind, Vec<u8>)>,
    close_sent: bool,
    close_received: bool,
}

impl Connection {
    pub fn new(server_side: bool, read_mode: ReadMode) -> Connection {
        Connection {
            server_side,
            read_mode,
            scan: Vec::new(),
            fragment: None,
            close_sent: false,
            close_received: false,
        }
    }

    fn expects_masked_inbound(&self) -> bool {
        self.server_side
    }

    fn outbound_mask(&self) -> Option<[u8; 4]> {
        if self.server_side {
            None
        } else {
            let mut key = [0u8; 4];
            rng().fill(&mut key);
            Some(key)
        }
    }

    /// Feed newly-received bytes; returns every message the read mode
    /// makes ready, plus any bytes (Pong replies, mirrored Close) that
    /// must be written back immediately.
    pub fn feed(&mut self, data: &[u8]) -> Result<PollResult, Error> {
        self.scan.extend_from_slice(data);
        let mut result = PollResult::default();
        loop {
            let masked = self.expects_masked_inbound();
            let parsed = codec::parse_frame(&self.scan, masked)?;
            let Some((frame, consumed)) = parsed else { break };
            self.scan.drain(..consumed);
            self.handle_frame(frame, &mut result)?;
            if result.should_close {
                break;
            }
        }
        Ok(result)
    }

    fn handle_frame(&mut self, frame: Frame, result: &mut PollResult) -> Result<(), Error> {
        match frame.opcode {
            OpCode::Text | OpCode::Binary => self.handle_data_frame(frame, result),
            OpCode::Continuation => self.handle_continuation(frame, result),
            OpCode::Ping => {
                write_frame(&mut result.outbound, true, OpCode::Pong, &frame.payload, self.outbound_mask());
                result.messages.push(Message::Ping(frame.payload));
                Ok(())
            }
            OpCode::Pong => {
                result.messages.push(Message::Pong(frame.payload));
                Ok(())
            }
            OpCode::Close => self.handle_close(frame, result),
        }
    }

    fn handle_data_frame(&mut self, frame: Frame, result: &mut PollResult) -> Result<(), Error> {
        if self.fragment.is_some() {
            return Err(Error::Protocol("websocket data frame received mid-fragment"));
        }
        let kind = if frame.opcode == OpCode::Text { FragmentKind::Text } else { FragmentKind::Binary };
        if frame.fin {
            self.emit_complete(kind, frame.payload, result)
        } else {
            self.fragment = Some((kind, frame.payload));
            if self.read_mode != ReadMode::Frame {
                // FrameStreaming/Streaming: nothing to flush yet, still
                // waiting on continuation frames to matter, first frame
                // carries no standalone event.
            }
            Ok(())
        }
    }

    fn handle_continuation(&mut self, frame: Frame, result: &mut PollResult) -> Result<(), Error> {
        let Some((kind, mut buf)) = self.fragment.take() else {
            return Err(Error::Protocol("websocket continuation without a preceding data frame"));
        };
        buf.extend_from_slice(&frame.payload);
        if frame.fin {
            self.emit_complete(kind, buf, result)
        } else {
            self.fragment = Some((kind, buf));
            Ok(())
        }
    }

    fn emit_complete(&mut self, kind: FragmentKind, payload: Vec<u8>, result: &mut PollResult) -> Result<(), Error> {
        match kind {
            FragmentKind::Binary => result.messages.push(Message::Binary(payload)),
            FragmentKind::Text => {
                let validate = self.read_mode != ReadMode::Streaming;
                if validate {
                    let text = str::from_utf8(&payload)
                        .map_err(|_| Error::Protocol("websocket text frame is not valid UTF-8"))?
                        .to_string();
                    result.messages.push(Message::Text(text));
                } else {
                    let text = String::from_utf8_lossy(&payload).into_owned();
                    result.messages.push(Message::Text(text));
                }
            }
        }
        Ok(())
    }

    fn handle_close(&mut self, frame: Frame, result: &mut PollResult) -> Result<(), Error> {
        self.close_received = true;
        let parsed = if frame.payload.is_empty() {
            None
        } else if frame.payload.len() < 2 {
            return Err(Error::Protocol("close frame payload too short for a status code"));
        } else {
            let code = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
            if !is_valid_close_code(code) {
                return Err(Error::Protocol("websocket close code is outside the valid range"));
            }
            let reason = str::from_utf8(&frame.payload[2..])
                .map_err(|_| Error::Protocol("websocket close reason is not valid UTF-8"))?
                .to_string();
            Some(CloseFrame { code, reason })
        };
        if !self.close_sent {
            write_close_frame(&mut result.outbound, Some(1000), "", self.outbound_mask());
            self.close_sent = true;
        }
        result.messages.push(Message::Close(parsed));
        result.should_close = true;
        Ok(())
    }

    /// Encode an outbound text message, honoring `is_last` for
    /// application-controlled fragmentation (§4.10 "Send").
    pub fn send_text(&mut self, out: &mut Vec<u8>, data: &str, is_last: bool) {
        self.send(out, FragmentKind::Text, data.as_bytes(), is_last);
    }

    pub fn send_binary(&mut self, out: &mut Vec<u8>, data: &[u8], is_last: bool) {
        self.send(out, FragmentKind::Binary, data, is_last);
    }

    fn send(&mut self, out: &mut Vec<u8>, kind: FragmentKind, data: &[u8], is_last: bool) {
        let opcode = if self.fragment.is_some() {
            OpCode::Continuation
        } else if kind == FragmentKind::Text {
            OpCode::Text
        } else {
            OpCode::Binary
        };
        write_frame(out, is_last, opcode, data, self.outbound_mask());
        if is_last {
            self.fragment = None;
        } else if self.fragment.is_none() {
            // Record that a fragmented send is in progress so later
            // calls this turn encode as Continuation.
            self.fragment = Some((kind, Vec::new()));
        }
    }

    pub fn send_close(&mut self, out: &mut Vec<u8>, code: u16, reason: &str) {
        if !self.close_sent {
            write_close_frame(out, Some(code), reason, self.outbound_mask());
            self.close_sent = true;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.close_sent && self.close_received
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn client_frame(opcode: OpCode, fin: bool, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, fin, opcode, payload, Some([0x11, 0x22, 0x33, 0x44]));
        out
    }

    #[test]
    fn decodes_a_single_text_frame() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let raw = client_frame(OpCode::Text, true, b"hello");
        let result = conn.feed(&raw).unwrap();
        assert_eq!(result.messages, vec![Message::Text("hello".into())]);
    }

    #[test]
    fn ping_gets_an_automatic_pong_reply() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let raw = client_frame(OpCode::Ping, true, b"abc");
        let result = conn.feed(&raw).unwrap();
        let (frame, _) = codec::parse_frame(&result.outbound, false).unwrap().unwrap();
        assert_eq!(frame.opcode, OpCode::Pong);
        assert_eq!(frame.payload, b"abc");
    }

    #[test]
    fn reassembles_fragmented_text_message() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let mut raw = client_frame(OpCode::Text, false, b"hel");
        raw.extend(client_frame(OpCode::Continuation, true, b"lo"));
        let result = conn.feed(&raw).unwrap();
        assert_eq!(result.messages, vec![Message::Text("hello".into())]);
    }

    #[test]
    fn continuation_without_a_prior_data_frame_is_fatal() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let raw = client_frame(OpCode::Continuation, true, b"oops");
        assert!(conn.feed(&raw).is_err());
    }

    #[test]
    fn close_handshake_mirrors_status_1000() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let mut payload = Vec::new();
        payload.extend_from_slice(&1001u16.to_be_bytes());
        payload.extend_from_slice(b"bye");
        let raw = client_frame(OpCode::Close, true, &payload);
        let result = conn.feed(&raw).unwrap();
        assert!(result.should_close);
        let (frame, _) = codec::parse_frame(&result.outbound, false).unwrap().unwrap();
        assert_eq!(frame.opcode, OpCode::Close);
        assert_eq!(&frame.payload[..2], &1000u16.to_be_bytes());
    }

    #[test]
    fn close_with_a_code_below_1000_is_rejected() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let mut payload = Vec::new();
        payload.extend_from_slice(&16u16.to_be_bytes());
        let raw = client_frame(OpCode::Close, true, &payload);
        assert!(conn.feed(&raw).is_err());
    }

    #[test]
    fn close_with_a_code_above_4999_is_rejected() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        let mut payload = Vec::new();
        payload.extend_from_slice(&5000u16.to_be_bytes());
        let raw = client_frame(OpCode::Close, true, &payload);
        assert!(conn.feed(&raw).is_err());
    }

    #[test]
    fn close_with_a_reserved_band_code_is_rejected() {
        let mut conn = Connection::new(true, ReadMode::Frame);
        for code in [1005u16, 1500u16] {
            let mut payload = Vec::new();
            payload.extend_from_slice(&code.to_be_bytes());
            let raw = client_frame(OpCode::Close, true, &payload);
            assert!(conn.feed(&raw).is_err(), "code {} should be rejected", code);
        }
    }

    #[test]
    fn streaming_mode_skips_utf8_validation() {
        let mut conn = Connection::new(true, ReadMode::Streaming);
        let raw = client_frame(OpCode::Text, true, &[0xff, 0xfe]);
        assert!(conn.feed(&raw).is_ok());
    }

    #[test]
    fn mask_apply_is_its_own_inverse() {
        let mut data = b"hello world, this is a longer payload".to_vec();
        let original = data.clone();
        let mask = [9, 8, 7, 6];
        apply_mask(&mut data, mask);
        assert_ne!(data, original);
        apply_mask(&mut data, mask);
        assert_eq!(data, original);
    }
}
