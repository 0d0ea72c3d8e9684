//! `HttpClient`: the per-request state machine (§4.3) sitting on top of
//! a transport. Pure logic over byte buffers — no socket I/O here, that
//! lives in `transport::tcp`/`transport::fastcgi` — so it can be driven
//! and unit-tested exactly like `parser`/`writer`/`chunked`.
//!
//! `feed()` stops the instant a request's headers are fully parsed and
//! returns `ClientEvent::RequestReady`, *without* touching whatever body
//! bytes may already be sitting in the same read (common when a client
//! pipelines the body right after the headers, per the `Expect:
//! 100-continue` scenario in §8). The embedder inspects the request,
//! calls `set_stream_body` if the matched route wants progressive body
//! delivery, then calls `feed(&[])` (or the next read's bytes) to let
//! the body state machine resume. This keeps the body-mode decision
//! explicit instead of needing a routing callback threaded through
//! `feed` itself.

use crate::buffer::TemporaryBuffer;
use crate::chunked;
use crate::enums::{Status, Verb, Version};
use crate::error::Error;
use crate::filter::FilterChain;
use crate::headers::{self, Cookie, HeaderMap};
use crate::parser::{self, RequestLine};
use crate::transport::{ConnectionMode, TransferMode};
use crate::writer;

/// Ceiling on a single header line, including the request line (§4.3.1).
pub const MAX_HEADER_LINE_LEN: usize = 4096;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_header_line_len: usize,
    pub max_requests: u32,
    pub fqdn: String,
    pub max_body_length: u64,
}

impl Default for ClientConfig {
    fn default() -> ClientConfig {
        ClientConfig {
            max_header_line_len: MAX_HEADER_LINE_LEN,
            max_requests: 10,
            fqdn: "localhost".to_string(),
            max_body_length: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub verb: Verb,
    pub version: Version,
    pub raw_path: String,
    pub url: String,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    pub content_length: Option<u64>,
    pub range: Option<(u64, u64)>,
    pub transferred: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    KeepAlive,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    RequestReady,
    BodyChunk(Vec<u8>),
    BodyComplete,
    Closed(CloseOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadingHeaders,
    Body,
    Dispatched,
    Closed,
}

enum BodyProgress {
    None,
    Fixed { remaining: u64 },
}

struct ResponseState {
    status: Status,
    headers: HeaderMap,
    cookies: Vec<Cookie>,
    content_length: Option<u64>,
    range: Option<(u64, u64)>,
    header_sent: bool,
}

impl ResponseState {
    fn new() -> ResponseState {
        ResponseState {
            status: Status::Ok,
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            content_length: None,
            range: None,
            header_sent: false,
        }
    }
}

pub struct HttpClient {
    config: ClientConfig,
    state: State,
    scan: Vec<u8>,
    request_line: Option<RequestLine>,
    headers: HeaderMap,
    request: Option<Request>,
    body_progress: BodyProgress,
    stream_body: bool,
    body_buffer: TemporaryBuffer,
    transfer_mode: TransferMode,
    connection_mode: ConnectionMode,
    request_count: u32,
    response: ResponseState,
    filters: FilterChain,
    outbound: Vec<u8>,
    secure: bool,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> HttpClient {
        HttpClient {
            config,
            state: State::ReadingHeaders,
            scan: Vec::new(),
            request_line: None,
            headers: HeaderMap::new(),
            request: None,
            body_progress: BodyProgress::None,
            stream_body: false,
            body_buffer: TemporaryBuffer::new(),
            transfer_mode: TransferMode::Streaming,
            connection_mode: ConnectionMode::Close,
            request_count: 0,
            response: ResponseState::new(),
            filters: FilterChain::new(),
            outbound: Vec::new(),
            secure: false,
        }
    }

    pub fn mark_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn filters_mut(&mut self) -> &mut FilterChain {
        &mut self.filters
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Drain bytes queued for the transport to write.
    pub fn take_outbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }

    /// Opt in to progressive body delivery for the request that was
    /// just announced via `RequestReady` (§4.3.8). Must be called
    /// before the next `feed()`.
    pub fn set_stream_body(&mut self, stream: bool) {
        self.stream_body = stream;
    }

    /// Feed newly-received bytes (or `&[]` to resume processing
    /// buffered leftovers after `set_stream_body`).
    pub fn feed(&mut self, data: &[u8]) -> Vec<ClientEvent> {
        self.scan.extend_from_slice(data);
        let mut events = Vec::new();
        loop {
            match self.state {
                State::ReadingHeaders => {
                    if !self.read_header_phase(&mut events) {
                        break;
                    }
                }
                State::Body => {
                    if !self.read_body_phase(&mut events) {
                        break;
                    }
                }
                State::Dispatched | State::Closed => break,
            }
        }
        events
    }

    /// Returns `false` when more bytes are needed before progress can
    /// continue (caller should stop looping).
    fn read_header_phase(&mut self, events: &mut Vec<ClientEvent>) -> bool {
        let Some(pos) = find_line_end(&self.scan) else {
            if self.scan.len() > self.config.max_header_line_len {
                self.auto_error(Status::BadRequest, events);
                return false;
            }
            return false;
        };
        // `pos` is the index of the `\n`; include it so
        // `strip_trailing_newline` sees the terminator it expects.
        let mut line: &[u8] = &self.scan[..=pos];
        parser::strip_trailing_newline(&mut line);
        let line = line.to_vec();
        self.scan.drain(..pos + 1);

        if line.len() > self.config.max_header_line_len {
            self.auto_error(Status::BadRequest, events);
            return false;
        }

        if self.request_line.is_none() {
            match parser::parse_request_line(&line) {
                Some(rl) => self.request_line = Some(rl),
                None => {
                    self.auto_error(Status::BadRequest, events);
                    return false;
                }
            }
            return true;
        }

        if line.is_empty() {
            self.finish_headers(events);
            return self.state != State::Closed;
        }

        match parser::parse_header_line(&line) {
            Some((name, value)) => {
                self.headers.append(name, value.to_string());
                true
            }
            None => {
                self.auto_error(Status::BadRequest, events);
                false
            }
        }
    }

    fn finish_headers(&mut self, events: &mut Vec<ClientEvent>) {
        let request_line = self.request_line.clone().unwrap();

        if request_line.version == Version::Http11 && self.headers.get("Host").is_none() {
            self.auto_error(Status::BadRequest, events);
            return;
        }
        if request_line.verb.forbids_body() && self.headers.contains("Content-Length") {
            self.auto_error(Status::BadRequest, events);
            return;
        }
        let content_length = match self.headers.get("Content-Length") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    self.auto_error(Status::BadRequest, events);
                    return;
                }
            },
            None => None,
        };
        if request_line.verb.requires_content_length() && content_length.is_none() {
            self.auto_error(Status::BadRequest, events);
            return;
        }
        if let Some(len) = content_length {
            if len > self.config.max_body_length {
                self.auto_error(Status::RequestEntityTooLarge, events);
                return;
            }
        }
        let range = self.headers.get("Range").and_then(parser::parse_range);

        let cookies = self
            .headers
            .get_all("Cookie")
            .flat_map(|h| headers::parse_cookies(h).into_iter())
            .collect();

        let host = self.headers.get("Host").unwrap_or(&self.config.fqdn).to_string();
        let scheme = if self.secure { "https" } else { "http" };
        let url = format!("{}://{}{}", scheme, host, request_line.path);

        self.connection_mode = if self.request_count + 1 >= self.config.max_requests {
            ConnectionMode::Close
        } else {
            match self.headers.get("Connection") {
                Some(v) if headers::is_close(v.as_bytes()) => ConnectionMode::Close,
                Some(v) if headers::is_keep_alive(v.as_bytes()) => ConnectionMode::KeepAlive,
                _ if request_line.version == Version::Http11 => ConnectionMode::KeepAlive,
                _ => ConnectionMode::Close,
            }
        };
        self.transfer_mode = parser::decide_transfer_mode(
            request_line.version,
            self.headers.get("Connection").map(|v| v.as_bytes()),
        );

        if let Some(expect) = self.headers.get("Expect") {
            if headers::is_continue(expect.as_bytes()) {
                self.outbound.extend_from_slice(b"HTTP/1.1 100 Continue\r\n\r\n");
            }
        }

        self.request = Some(Request {
            verb: request_line.verb,
            version: request_line.version,
            raw_path: request_line.path,
            url,
            headers: std::mem::take(&mut self.headers),
            cookies,
            content_length,
            range,
            transferred: 0,
        });

        self.body_progress = match content_length {
            Some(n) if n > 0 => BodyProgress::Fixed { remaining: n },
            _ => BodyProgress::None,
        };

        match self.body_progress {
            BodyProgress::None => {
                self.state = State::Dispatched;
                events.push(ClientEvent::RequestReady);
            }
            BodyProgress::Fixed { .. } => {
                self.state = State::Body;
                events.push(ClientEvent::RequestReady);
            }
        }
    }

    fn read_body_phase(&mut self, events: &mut Vec<ClientEvent>) -> bool {
        let BodyProgress::Fixed { remaining } = &mut self.body_progress else {
            self.state = State::Dispatched;
            return true;
        };
        if *remaining == 0 {
            self.state = State::Dispatched;
            events.push(ClientEvent::BodyComplete);
            return true;
        }
        if self.scan.is_empty() {
            return false;
        }
        let take = (*remaining as usize).min(self.scan.len());
        let chunk: Vec<u8> = self.scan.drain(..take).collect();
        *remaining -= chunk.len() as u64;
        if let Some(req) = self.request.as_mut() {
            req.transferred += chunk.len() as u64;
        }

        if self.stream_body {
            events.push(ClientEvent::BodyChunk(chunk));
        } else if let Err(_) = self.body_buffer.write_all(&chunk) {
            self.auto_error(Status::InternalServerError, events);
            return false;
        }

        if *remaining == 0 {
            self.state = State::Dispatched;
            events.push(ClientEvent::BodyComplete);
        }
        true
    }

    /// Read-only access to the buffered body once `BodyComplete` has
    /// fired for a non-streaming request.
    pub fn body_buffer_mut(&mut self) -> &mut TemporaryBuffer {
        &mut self.body_buffer
    }

    /// §4.3.13 `pipeFromPostBody`: hand over whatever body bytes are
    /// already buffered, then switch to per-chunk delivery for the
    /// remainder of the body (every later `feed()` emits `BodyChunk`
    /// instead of buffering). The caller is responsible for forwarding
    /// both the returned bytes and subsequent `BodyChunk` events to its
    /// own sink.
    pub fn pipe_from_post_body(&mut self) -> Result<Vec<u8>, Error> {
        self.body_buffer.reset()?;
        let buffered = self.body_buffer.read_all()?;
        self.body_buffer.discard();
        self.stream_body = true;
        Ok(buffered)
    }

    /// Begin a response: sets the status and returns the header map for
    /// the embedder to populate before the first `write`.
    pub fn begin_response(&mut self, status: Status) -> &mut HeaderMap {
        self.response.status = status;
        &mut self.response.headers
    }

    pub fn set_content_length(&mut self, len: u64) {
        self.response.content_length = Some(len);
    }

    pub fn set_range(&mut self, start: u64, end: u64) {
        self.response.range = Some((start, end));
    }

    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.response.cookies.push(cookie);
    }

    fn version(&self) -> Version {
        self.request.as_ref().map(|r| r.version).unwrap_or(Version::Http11)
    }

    fn send_headers(&mut self) {
        self.filters.apply_headers(&mut self.response.headers);
        let mut out = Vec::new();
        writer::write_status_line(&mut out, self.version(), &self.response.status);
        writer::write_date_if_needed(&mut out, self.version(), self.response.headers.contains("Date"));
        writer::write_length_headers(
            &mut out,
            self.response.content_length,
            self.response.range,
            self.response.headers.contains("Content-Length") || self.response.headers.contains("Content-Range"),
        );
        writer::write_transfer_encoding(
            &mut out,
            self.transfer_mode,
            self.response.headers.get("Transfer-Encoding"),
        );
        writer::write_connection_header(&mut out, self.connection_mode);
        for (name, value) in self.response.headers.iter() {
            if name == "Content-Length" || name == "Transfer-Encoding" || name == "Connection" || name == "Date" {
                continue;
            }
            writer::write_header(&mut out, name, value);
        }
        writer::write_cookies(&mut out, &self.response.cookies);
        out.extend_from_slice(b"\r\n");
        self.outbound.extend(out);
        self.response.header_sent = true;
    }

    /// Write response body bytes (§4.3.11). Buffered-mode writes
    /// accumulate until `close()`; Chunked/Streaming writes go straight
    /// to the outbound queue, through the filter chain first.
    pub fn write(&mut self, data: &[u8]) -> Result<(), Error> {
        let filtered = self.filters.data(data)?;
        match self.transfer_mode {
            TransferMode::Buffered => {
                self.body_buffer.write_all(&filtered)?;
            }
            TransferMode::ChunkedStreaming => {
                if !self.response.header_sent {
                    self.send_headers();
                }
                if !filtered.is_empty() {
                    self.outbound.extend(chunked::encode_chunk(&filtered));
                }
            }
            TransferMode::Streaming => {
                if !self.response.header_sent {
                    self.send_headers();
                }
                self.outbound.extend(filtered);
            }
        }
        Ok(())
    }

    /// §4.3.12 `pipeToClient`: stream a device (typically a static
    /// file) straight to the client in up-to-16 KiB ticks, honoring
    /// `max_len`, then close the response. `random_access` devices with
    /// an empty filter chain get an explicit `Content-Length` instead of
    /// chunked/streaming framing. Holding `&mut self` for the whole
    /// loop is what makes this mutually exclusive with a direct
    /// `write()` call partway through (§3 invariant) — the borrow
    /// checker enforces it instead of a runtime flag.
    pub async fn pipe_to_client<R>(&mut self, device: &mut R, max_len: Option<u64>, random_access: bool) -> Result<CloseOutcome, Error>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        if random_access && self.filters.is_empty() {
            if let Some(len) = max_len {
                self.set_content_length(len);
            }
        } else if self.connection_mode == ConnectionMode::KeepAlive && !self.filters.is_empty() {
            self.transfer_mode = TransferMode::ChunkedStreaming;
        } else {
            self.transfer_mode = TransferMode::Streaming;
            self.connection_mode = ConnectionMode::Close;
        }

        const PIPE_CHUNK: usize = 16 * 1024;
        let mut buf = vec![0u8; PIPE_CHUNK];
        let mut remaining = max_len;
        loop {
            let want = match remaining {
                Some(0) => break,
                Some(n) => buf.len().min(n as usize),
                None => buf.len(),
            };
            let read = device.read(&mut buf[..want]).await?;
            if read == 0 {
                break;
            }
            self.write(&buf[..read])?;
            if let Some(left) = remaining.as_mut() {
                *left -= read as u64;
            }
        }
        self.close()
    }

    /// Finish the response (§4.3.14): flush filter-end bytes, emit the
    /// chunk terminator if chunked, then either reset for the next
    /// pipelined request (keep-alive with requests remaining) or close.
    pub fn close(&mut self) -> Result<CloseOutcome, Error> {
        if self.transfer_mode == TransferMode::Buffered && !self.response.header_sent {
            if self.response.content_length.is_none() {
                self.response.content_length = Some(self.body_buffer.size());
            }
            self.send_headers();
            self.body_buffer.reset()?;
            let body = self.body_buffer.read_all()?;
            self.outbound.extend(body);
        } else if !self.response.header_sent {
            self.send_headers();
        }

        let tail = self.filters.end()?;
        match self.transfer_mode {
            TransferMode::ChunkedStreaming => {
                if !tail.is_empty() {
                    self.outbound.extend(chunked::encode_chunk(&tail));
                }
                self.outbound.extend_from_slice(chunked::TERMINATOR);
            }
            TransferMode::Streaming | TransferMode::Buffered => {
                self.outbound.extend(tail);
            }
        }

        self.request_count += 1;
        let keep_alive = self.connection_mode == ConnectionMode::KeepAlive
            && self.transfer_mode != TransferMode::Streaming
            && self.request_count < self.config.max_requests;
        if keep_alive {
            self.reset_for_next_request();
            Ok(CloseOutcome::KeepAlive)
        } else {
            self.state = State::Closed;
            Ok(CloseOutcome::Closed)
        }
    }

    /// Only valid before any response bytes have been sent (§4.3.15):
    /// discards any pending response state and serves a minimal error
    /// body for `status`, then closes.
    pub fn kill_connection(&mut self, status: Status) {
        if self.response.header_sent {
            return;
        }
        self.body_buffer.discard();
        let mut events = Vec::new();
        self.auto_error(status, &mut events);
    }

    fn reset_for_next_request(&mut self) {
        self.state = State::ReadingHeaders;
        self.request_line = None;
        self.headers = HeaderMap::new();
        self.request = None;
        self.body_progress = BodyProgress::None;
        self.stream_body = false;
        self.body_buffer.discard();
        self.response = ResponseState::new();
        self.filters = FilterChain::new();
    }

    /// Render and queue a minimal error response for `status`, then
    /// close the connection (§4.3, §7 "minimal body" fallback).
    fn auto_error(&mut self, status: Status, events: &mut Vec<ClientEvent>) {
        self.transfer_mode = TransferMode::Streaming;
        self.connection_mode = ConnectionMode::Close;
        self.response = ResponseState::new();
        self.response.status = status.clone();
        let body = format!("{} {}\n", status.code(), status.reason());
        self.response.content_length = Some(body.len() as u64);
        self.send_headers();
        self.outbound.extend_from_slice(body.as_bytes());
        self.state = State::Closed;
        events.push(ClientEvent::Closed(CloseOutcome::Closed));
    }
}

/// Find the end (inclusive of `\n`) of the next CRLF/LF-terminated line
/// in `buf`. Returns the index of the `\n` byte.
fn find_line_end(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

#[cfg(test)]
mod test {
    use super::*;

    fn respond_ok(client: &mut HttpClient, body: &[u8]) {
        client.begin_response(Status::Ok);
        client.write(body).unwrap();
        client.close().unwrap();
    }

    #[test]
    fn simple_get_http_1_0() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"GET / HTTP/1.0\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::RequestReady]);
        assert_eq!(client.request().unwrap().raw_path, "/");
        respond_ok(&mut client, b"/");
        let out = client.take_outbound();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\nConnection: close\r\n\r\n/"), "{}", text);
    }

    #[test]
    fn http_1_1_without_host_is_400() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::Closed(CloseOutcome::Closed)]);
        let out = client.take_outbound();
        assert!(String::from_utf8(out).unwrap().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn expect_continue_then_echoes_body() {
        let mut client = HttpClient::new(ClientConfig::default());
        let req = b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 10\r\nExpect: 100-continue\r\n\r\n0123456789";
        let events = client.feed(req);
        assert!(events.contains(&ClientEvent::RequestReady));
        assert!(events.contains(&ClientEvent::BodyComplete));
        let preamble = client.take_outbound();
        assert!(String::from_utf8(preamble.clone()).unwrap().starts_with("HTTP/1.1 100 Continue\r\n\r\n"));

        let mut body = client.body_buffer_mut();
        body.reset().unwrap();
        let data = body.read_all().unwrap();
        assert_eq!(data, b"0123456789");

        client.begin_response(Status::Ok);
        client.write(b"ok").unwrap();
        client.close().unwrap();
    }

    #[test]
    fn chunked_keep_alive_response() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"GET /echo HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::RequestReady]);
        client.begin_response(Status::Ok);
        client.write(b"Works.").unwrap();
        let outcome = client.close().unwrap();
        assert_eq!(outcome, CloseOutcome::KeepAlive);
        let out = String::from_utf8(client.take_outbound()).unwrap();
        assert!(out.contains("Transfer-Encoding: chunked"));
        assert!(out.contains("6\r\nWorks.\r\n0\r\n\r\n"));
    }

    #[test]
    fn get_with_content_length_is_400() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"GET / HTTP/1.1\r\nHost: x\r\nContent-Length: 3\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::Closed(CloseOutcome::Closed)]);
    }

    #[test]
    fn post_without_content_length_is_400() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"POST / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::Closed(CloseOutcome::Closed)]);
    }

    #[test]
    fn streaming_body_emits_chunks_as_they_arrive() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\n");
        assert_eq!(events, vec![ClientEvent::RequestReady]);
        client.set_stream_body(true);
        let events = client.feed(b"ab");
        assert_eq!(events, vec![ClientEvent::BodyChunk(b"ab".to_vec())]);
        let events = client.feed(b"cde");
        assert_eq!(events, vec![ClientEvent::BodyChunk(b"cde".to_vec()), ClientEvent::BodyComplete]);
    }

    #[test]
    fn kill_connection_before_any_bytes_sent() {
        let mut client = HttpClient::new(ClientConfig::default());
        client.feed(b"GET / HTTP/1.0\r\n\r\n");
        client.kill_connection(Status::Forbidden);
        let out = String::from_utf8(client.take_outbound()).unwrap();
        assert!(out.starts_with("HTTP/1.0 403 Forbidden\r\n"));
        assert!(client.is_closed());
    }

    #[test]
    fn pipe_from_post_body_hands_over_buffered_bytes_then_streams() {
        let mut client = HttpClient::new(ClientConfig::default());
        let events = client.feed(b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nab");
        assert_eq!(events, vec![ClientEvent::RequestReady]);
        let already_buffered = client.pipe_from_post_body().unwrap();
        assert_eq!(already_buffered, b"ab");
        let events = client.feed(b"cde");
        assert_eq!(events, vec![ClientEvent::BodyChunk(b"cde".to_vec()), ClientEvent::BodyComplete]);
    }

    struct MemDevice {
        data: Vec<u8>,
        pos: usize,
    }

    impl tokio::io::AsyncRead for MemDevice {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            let this = self.get_mut();
            let remaining = &this.data[this.pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            this.pos += n;
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn pipe_to_client_streams_a_random_access_device_with_content_length() {
        let mut client = HttpClient::new(ClientConfig::default());
        client.feed(b"GET /file HTTP/1.0\r\n\r\n");
        client.begin_response(Status::Ok);
        let mut device = MemDevice { data: b"hello world".to_vec(), pos: 0 };
        let outcome = client.pipe_to_client(&mut device, Some(11), true).await.unwrap();
        assert_eq!(outcome, CloseOutcome::Closed);
        let out = String::from_utf8(client.take_outbound()).unwrap();
        assert!(out.contains("Content-Length: 11"), "{}", out);
        assert!(out.ends_with("hello world"), "{}", out);
    }

    #[tokio::test]
    async fn pipe_to_client_honors_max_len_shorter_than_the_device() {
        let mut client = HttpClient::new(ClientConfig::default());
        client.feed(b"GET /file HTTP/1.0\r\n\r\n");
        client.begin_response(Status::Ok);
        let mut device = MemDevice { data: b"hello world".to_vec(), pos: 0 };
        client.pipe_to_client(&mut device, Some(5), true).await.unwrap();
        let out = String::from_utf8(client.take_outbound()).unwrap();
        assert!(out.ends_with("hello"), "{}", out);
    }
}
