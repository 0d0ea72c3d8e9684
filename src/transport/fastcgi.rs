//! FastCGI 1.0 record framing and the Responder-role demultiplexer
//! (§4.8.2). One socket hosts many concurrent logical requests, each
//! identified by a `request_id`; records for different requests
//! interleave freely, so parsing is a pure function from bytes to
//! records and request routing is a separate layer on top.

use crate::error::Error;
use crate::headers::HeaderMap;
use std::collections::HashMap;
use std::net::SocketAddr;

pub const VERSION_1: u8 = 1;

pub const FCGI_BEGIN_REQUEST: u8 = 1;
pub const FCGI_ABORT_REQUEST: u8 = 2;
pub const FCGI_END_REQUEST: u8 = 3;
pub const FCGI_PARAMS: u8 = 4;
pub const FCGI_STDIN: u8 = 5;
pub const FCGI_STDOUT: u8 = 6;
pub const FCGI_GET_VALUES: u8 = 9;
pub const FCGI_GET_VALUES_RESULT: u8 = 10;
pub const FCGI_UNKNOWN_TYPE: u8 = 11;

pub const ROLE_RESPONDER: u16 = 1;

pub const FLAG_KEEP_CONN: u8 = 1;

pub const PROTOCOL_STATUS_REQUEST_COMPLETE: u8 = 0;
pub const PROTOCOL_STATUS_UNKNOWN_ROLE: u8 = 3;

/// Management-record keys `GetValues` may ask for (§4.8.2 "On
/// GetValues").
pub const FCGI_MPXS_CONNS: &str = "FCGI_MPXS_CONNS";
pub const FCGI_MAX_CONNS: &str = "FCGI_MAX_CONNS";
pub const FCGI_MAX_REQS: &str = "FCGI_MAX_REQS";

const HEADER_LEN: usize = 8;
pub const MAX_RECORD_BODY: usize = 65535;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub kind: u8,
    pub request_id: u16,
    pub content_length: u16,
    pub padding_length: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: RecordHeader,
    pub body: Vec<u8>,
}

/// Parse one record from the front of `buf`. `Ok(None)` means more
/// bytes are needed; on success returns the record and the total number
/// of bytes (header + body + padding) consumed.
pub fn parse_record(buf: &[u8]) -> Result<Option<(Record, usize)>, Error> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }
    let version = buf[0];
    let kind = buf[1];
    let request_id = u16::from_be_bytes([buf[2], buf[3]]);
    let content_length = u16::from_be_bytes([buf[4], buf[5]]);
    let padding_length = buf[6];
    let total = HEADER_LEN + content_length as usize + padding_length as usize;
    if buf.len() < total {
        return Ok(None);
    }
    let body = buf[HEADER_LEN..HEADER_LEN + content_length as usize].to_vec();
    let header = RecordHeader { version, kind, request_id, content_length, padding_length };
    Ok(Some((Record { header, body }, total)))
}

/// Frame one outbound record, zero-padding to a multiple of 8 bytes as
/// the spec recommends (not required, but matches common servers).
pub fn write_record(out: &mut Vec<u8>, kind: u8, request_id: u16, body: &[u8]) {
    assert!(body.len() <= MAX_RECORD_BODY);
    let padding = (8 - (body.len() % 8)) % 8;
    out.push(VERSION_1);
    out.push(kind);
    out.extend_from_slice(&request_id.to_be_bytes());
    out.extend_from_slice(&(body.len() as u16).to_be_bytes());
    out.push(padding as u8);
    out.push(0); // reserved
    out.extend_from_slice(body);
    out.extend(std::iter::repeat(0u8).take(padding));
}

/// Split a `StdOut` byte stream into records of at most
/// `MAX_RECORD_BODY` bytes each (§4.8.2 "Outbound").
pub fn write_stdout(out: &mut Vec<u8>, request_id: u16, data: &[u8]) {
    for chunk in data.chunks(MAX_RECORD_BODY) {
        write_record(out, FCGI_STDOUT, request_id, chunk);
    }
}

/// Rewrite a response's leading `HTTP/x.y CODE MSG` line into the CGI
/// convention `Status: CODE MSG` (§4.8.2 "Outbound", §6). Only the first
/// line is touched; headers and body pass through unchanged.
pub fn rewrite_status_line(response: &[u8]) -> Vec<u8> {
    let Some(line_end) = response.windows(2).position(|w| w == b"\r\n") else {
        return response.to_vec();
    };
    let line = &response[..line_end];
    let Some(first_space) = line.iter().position(|&b| b == b' ') else {
        return response.to_vec();
    };
    if !line[..first_space].starts_with(b"HTTP/") {
        return response.to_vec();
    }
    let mut out = Vec::with_capacity(response.len());
    out.extend_from_slice(b"Status: ");
    out.extend_from_slice(&line[first_space + 1..]);
    out.extend_from_slice(&response[line_end..]);
    out
}

/// Frame a full HTTP response (as produced by `client::HttpClient`) as
/// the FastCGI `StdOut` stream, rewriting its status line first
/// (§4.8.2 "Outbound").
pub fn write_response_as_stdout(out: &mut Vec<u8>, request_id: u16, response: &[u8]) {
    let rewritten = rewrite_status_line(response);
    write_stdout(out, request_id, &rewritten);
}

/// Terminate the `StdOut` stream: empty record, then `EndRequest`
/// (§4.8.2 "Outbound").
pub fn write_end_request(out: &mut Vec<u8>, request_id: u16, app_status: u32) {
    write_record(out, FCGI_STDOUT, request_id, &[]);
    write_end_request_with_status(out, request_id, app_status, PROTOCOL_STATUS_REQUEST_COMPLETE);
}

/// `EndRequest` alone, with an explicit protocol status (used for the
/// unsupported-role case, which skips `StdOut` entirely).
pub fn write_end_request_with_status(out: &mut Vec<u8>, request_id: u16, app_status: u32, protocol_status: u8) {
    let mut body = Vec::with_capacity(8);
    body.extend_from_slice(&app_status.to_be_bytes());
    body.push(protocol_status);
    body.extend_from_slice(&[0, 0, 0]);
    write_record(out, FCGI_END_REQUEST, request_id, &body);
}

/// Reply to a `GetValues` management record (request id 0) with the
/// subset of `{FCGI_MPXS_CONNS, FCGI_MAX_CONNS, FCGI_MAX_REQS}` (plus any
/// caller-supplied values) that the peer asked about (§4.8.2).
pub fn write_get_values_result(out: &mut Vec<u8>, pairs: &[(&str, &str)]) {
    let mut body = Vec::new();
    write_params(&mut body, pairs);
    write_record(out, FCGI_GET_VALUES_RESULT, 0, &body);
}

/// Reply to an unrecognized record type (§4.8.2 "On any unknown type").
/// Body is the unrecognized type byte followed by 7 reserved zero bytes.
pub fn write_unknown_type(out: &mut Vec<u8>, kind: u8) {
    let mut body = [0u8; 8];
    body[0] = kind;
    write_record(out, FCGI_UNKNOWN_TYPE, 0, &body);
}

/// `GetValues` carries name/value pairs with empty values: the peer is
/// only asking for the names it wants back.
pub fn parse_get_values(body: &[u8]) -> Result<Vec<String>, Error> {
    Ok(parse_params(body)?.into_iter().map(|(name, _)| name).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeginRequestBody {
    pub role: u16,
    pub keep_conn: bool,
}

pub fn parse_begin_request(body: &[u8]) -> Result<BeginRequestBody, Error> {
    if body.len() < 8 {
        return Err(Error::Protocol("FastCGI BeginRequest body too short"));
    }
    let role = u16::from_be_bytes([body[0], body[1]]);
    let flags = body[2];
    Ok(BeginRequestBody { role, keep_conn: flags & FLAG_KEEP_CONN != 0 })
}

/// Decode a name-value pair length. FastCGI uses a 1-byte form (top bit
/// clear, value 0-127) or a 4-byte big-endian form (top bit set, masked
/// off the rest) (§4.8.2).
fn read_nv_length(buf: &[u8], pos: usize) -> Option<(u32, usize)> {
    let first = *buf.get(pos)?;
    if first & 0x80 == 0 {
        Some((first as u32, 1))
    } else {
        let b1 = *buf.get(pos + 1)?;
        let b2 = *buf.get(pos + 2)?;
        let b3 = *buf.get(pos + 3)?;
        let len = (((first & 0x7F) as u32) << 24) | ((b1 as u32) << 16) | ((b2 as u32) << 8) | (b3 as u32);
        Some((len, 4))
    }
}

fn write_nv_length(out: &mut Vec<u8>, len: usize) {
    if len <= 127 {
        out.push(len as u8);
    } else {
        let len = len as u32;
        out.push(0x80 | ((len >> 24) as u8 & 0x7F));
        out.extend_from_slice(&len.to_be_bytes()[1..]);
    }
}

/// Parse the concatenated body of one or more `Params` records into
/// name-value pairs.
pub fn parse_params(body: &[u8]) -> Result<Vec<(String, String)>, Error> {
    let mut pairs = Vec::new();
    let mut pos = 0;
    while pos < body.len() {
        let (name_len, name_sz) = read_nv_length(body, pos)
            .ok_or(Error::Protocol("truncated FastCGI Params name length"))?;
        pos += name_sz;
        let (value_len, value_sz) = read_nv_length(body, pos)
            .ok_or(Error::Protocol("truncated FastCGI Params value length"))?;
        pos += value_sz;
        let name_len = name_len as usize;
        let value_len = value_len as usize;
        if pos + name_len + value_len > body.len() {
            return Err(Error::Protocol("FastCGI Params pair overruns record body"));
        }
        let name = String::from_utf8_lossy(&body[pos..pos + name_len]).into_owned();
        pos += name_len;
        let value = String::from_utf8_lossy(&body[pos..pos + value_len]).into_owned();
        pos += value_len;
        pairs.push((name, value));
    }
    Ok(pairs)
}

pub fn write_params(out: &mut Vec<u8>, pairs: &[(&str, &str)]) {
    for (name, value) in pairs {
        write_nv_length(out, name.len());
        write_nv_length(out, value.len());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(value.as_bytes());
    }
}

/// `HTTP_FOO_BAR` → `Foo-Bar`, the CGI→HTTP header canonicalization
/// used when turning `Params` into request headers (§4.8.2).
pub fn cgi_env_to_header_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("HTTP_")?;
    let mut out = String::with_capacity(rest.len());
    for (i, part) in rest.split('_').enumerate() {
        if i > 0 {
            out.push('-');
        }
        if let Some(first) = part.chars().next() {
            out.extend(first.to_uppercase());
            out.push_str(&part[first.len_utf8()..].to_lowercase());
        }
    }
    Some(out)
}

/// The non-`HTTP_*` request-line fields every `BeginRequest` carries
/// (§6 "Required params read").
#[derive(Debug, Clone, Default)]
pub struct CgiEnv {
    pub request_method: Option<String>,
    pub request_uri: Option<String>,
    pub server_protocol: Option<String>,
    pub remote_addr: Option<String>,
    pub remote_port: Option<u16>,
    pub server_addr: Option<String>,
    pub server_port: Option<u16>,
}

impl CgiEnv {
    /// Synthetic peer address built from `REMOTE_ADDR`/`REMOTE_PORT`
    /// (§4.8.2 "construct the logical HttpClient with ... synthetic
    /// peer/local addresses").
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        let ip = self.remote_addr.as_ref()?.parse().ok()?;
        Some(SocketAddr::new(ip, self.remote_port.unwrap_or(0)))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        let ip = self.server_addr.as_ref()?.parse().ok()?;
        Some(SocketAddr::new(ip, self.server_port.unwrap_or(0)))
    }
}

/// Split accumulated `Params` pairs into request-line fields and HTTP
/// headers (§4.8.2). `CONTENT_LENGTH`/`CONTENT_TYPE` are CGI's own
/// un-prefixed aliases for those two headers and are folded in
/// alongside the `HTTP_*`-prefixed ones.
pub fn split_params(pairs: &[(String, String)]) -> (CgiEnv, HeaderMap) {
    let mut env = CgiEnv::default();
    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        match key.as_str() {
            "REQUEST_METHOD" => env.request_method = Some(value.clone()),
            "REQUEST_URI" => env.request_uri = Some(value.clone()),
            "SERVER_PROTOCOL" => {
                env.server_protocol = Some(value.trim_start_matches("HTTP/").to_string());
            }
            "REMOTE_ADDR" => env.remote_addr = Some(value.clone()),
            "REMOTE_PORT" => env.remote_port = value.parse().ok(),
            "SERVER_ADDR" => env.server_addr = Some(value.clone()),
            "SERVER_PORT" => env.server_port = value.parse().ok(),
            "CONTENT_LENGTH" => headers.set("Content-Length", value.clone()),
            "CONTENT_TYPE" => headers.set("Content-Type", value.clone()),
            _ => {
                if let Some(name) = cgi_env_to_header_name(key) {
                    headers.append(&name, value.clone());
                }
            }
        }
    }
    (env, headers)
}

/// Render a CGI env + header set back into an HTTP/1.x request preamble
/// (request-line + header block + terminating blank line) so the
/// logical request can be driven through `client::HttpClient::feed`
/// exactly like a TCP-sourced request, instead of duplicating the
/// header-phase state machine for FastCGI (§4.8.2).
pub fn synthesize_request_preamble(env: &CgiEnv, headers: &HeaderMap) -> Vec<u8> {
    let method = env.request_method.as_deref().unwrap_or("GET");
    let uri = env.request_uri.as_deref().unwrap_or("/");
    let version = env.server_protocol.as_deref().unwrap_or("1.0");
    let mut out = Vec::new();
    out.extend_from_slice(method.as_bytes());
    out.push(b' ');
    out.extend_from_slice(uri.as_bytes());
    out.push(b' ');
    out.extend_from_slice(format!("HTTP/{}", version).as_bytes());
    out.extend_from_slice(b"\r\n");
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"\r\n");
    out
}

/// Tracks the live logical requests multiplexed over one FastCGI
/// socket. Params accumulate per `request_id` until the terminating
/// empty `Params` record arrives.
#[derive(Default)]
pub struct ParamsAccumulator {
    pending: HashMap<u16, Vec<u8>>,
}

impl ParamsAccumulator {
    pub fn new() -> ParamsAccumulator {
        ParamsAccumulator::default()
    }

    /// Feed one `Params` record's body. Returns `Some(pairs)` once the
    /// empty terminating record for this `request_id` arrives.
    pub fn feed(&mut self, request_id: u16, body: &[u8]) -> Result<Option<Vec<(String, String)>>, Error> {
        if body.is_empty() {
            let accumulated = self.pending.remove(&request_id).unwrap_or_default();
            Ok(Some(parse_params(&accumulated)?))
        } else {
            self.pending.entry(request_id).or_default().extend_from_slice(body);
            Ok(None)
        }
    }
}

/// One event the demultiplexer hands back per record fed to it. Mirrors
/// the explicit-event style `client::HttpClient` and `transport::tcp`
/// use instead of the teacher's signal bus (§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FcgiEvent {
    /// A new logical request was announced; `keep_conn` says whether the
    /// front end socket should survive past this one request (§4.8.2).
    RequestBegun { request_id: u16, keep_conn: bool },
    /// `Params` fully accumulated: `preamble` is ready to hand to
    /// `client::HttpClient::feed`.
    RequestReady { request_id: u16, preamble: Vec<u8> },
    /// A chunk of the request body arrived on `StdIn`.
    StdIn { request_id: u16, data: Vec<u8> },
    /// The empty terminating `StdIn` record arrived.
    StdInClosed { request_id: u16 },
    /// The front end gave up on this logical request.
    AbortRequest { request_id: u16 },
    /// A `BeginRequest` asked for a role this crate doesn't implement.
    UnsupportedRole { request_id: u16 },
    /// Bytes the caller should write back to the front end unmodified
    /// (a `GetValuesResult` or `UnknownType` reply, or the `EndRequest`
    /// for an unsupported role).
    Reply(Vec<u8>),
}

/// Demultiplexes the single byte stream of one FastCGI front-end
/// connection into per-`request_id` events (§4.8.2). Pure logic: no
/// socket I/O, fed complete `Record`s by the embedder's read loop.
pub struct Demultiplexer {
    accumulator: ParamsAccumulator,
    max_conns: u32,
    max_reqs: u32,
    user_values: Vec<(String, String)>,
}

impl Demultiplexer {
    pub fn new(max_conns: u32, max_reqs: u32, user_values: Vec<(String, String)>) -> Demultiplexer {
        Demultiplexer { accumulator: ParamsAccumulator::new(), max_conns, max_reqs, user_values }
    }

    /// Handle one already-framed `Record` (see `parse_record`).
    pub fn handle_record(&mut self, record: &Record) -> Result<Vec<FcgiEvent>, Error> {
        let request_id = record.header.request_id;
        match record.header.kind {
            FCGI_BEGIN_REQUEST => {
                let begin = parse_begin_request(&record.body)?;
                if begin.role != ROLE_RESPONDER {
                    let mut reply = Vec::new();
                    write_end_request_with_status(&mut reply, request_id, 0, PROTOCOL_STATUS_UNKNOWN_ROLE);
                    return Ok(vec![
                        FcgiEvent::UnsupportedRole { request_id },
                        FcgiEvent::Reply(reply),
                    ]);
                }
                Ok(vec![FcgiEvent::RequestBegun { request_id, keep_conn: begin.keep_conn }])
            }
            FCGI_PARAMS => match self.accumulator.feed(request_id, &record.body)? {
                Some(pairs) => {
                    let (env, headers) = split_params(&pairs);
                    let preamble = synthesize_request_preamble(&env, &headers);
                    Ok(vec![FcgiEvent::RequestReady { request_id, preamble }])
                }
                None => Ok(Vec::new()),
            },
            FCGI_STDIN => {
                if record.body.is_empty() {
                    Ok(vec![FcgiEvent::StdInClosed { request_id }])
                } else {
                    Ok(vec![FcgiEvent::StdIn { request_id, data: record.body.clone() }])
                }
            }
            FCGI_ABORT_REQUEST => Ok(vec![FcgiEvent::AbortRequest { request_id }]),
            FCGI_GET_VALUES => {
                let requested = parse_get_values(&record.body)?;
                let pairs = self.get_values_result(&requested);
                let refs: Vec<(&str, &str)> = pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                let mut reply = Vec::new();
                write_get_values_result(&mut reply, &refs);
                Ok(vec![FcgiEvent::Reply(reply)])
            }
            kind => {
                let mut reply = Vec::new();
                write_unknown_type(&mut reply, kind);
                Ok(vec![FcgiEvent::Reply(reply)])
            }
        }
    }

    /// Build the `GetValuesResult` body: the well-known trio plus any
    /// user-configured name/value pairs forwarded verbatim (§4.8.2, §6).
    fn get_values_result(&self, requested: &[String]) -> Vec<(String, String)> {
        requested
            .iter()
            .filter_map(|name| match name.as_str() {
                FCGI_MPXS_CONNS => Some((name.clone(), "1".to_string())),
                FCGI_MAX_CONNS => Some((name.clone(), self.max_conns.to_string())),
                FCGI_MAX_REQS => Some((name.clone(), self.max_reqs.to_string())),
                other => self
                    .user_values
                    .iter()
                    .find(|(k, _)| k == other)
                    .map(|(k, v)| (k.clone(), v.clone())),
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_a_record() {
        let mut out = Vec::new();
        write_record(&mut out, FCGI_STDIN, 7, b"hello");
        let (record, consumed) = parse_record(&out).unwrap().unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(record.header.kind, FCGI_STDIN);
        assert_eq!(record.header.request_id, 7);
        assert_eq!(record.body, b"hello");
    }

    #[test]
    fn parse_record_waits_for_more_bytes() {
        let mut out = Vec::new();
        write_record(&mut out, FCGI_STDIN, 1, b"hello world");
        assert_eq!(parse_record(&out[..4]).unwrap(), None);
        assert_eq!(parse_record(&out[..out.len() - 1]).unwrap(), None);
    }

    #[test]
    fn parses_begin_request_with_keep_conn() {
        let body = [0u8, ROLE_RESPONDER as u8, FLAG_KEEP_CONN, 0, 0, 0, 0, 0];
        let parsed = parse_begin_request(&body).unwrap();
        assert_eq!(parsed.role, ROLE_RESPONDER);
        assert!(parsed.keep_conn);
    }

    #[test]
    fn params_round_trip_with_short_and_long_lengths() {
        let long_value = "x".repeat(200);
        let mut out = Vec::new();
        write_params(&mut out, &[("SHORT", "ok"), ("LONG", &long_value)]);
        let pairs = parse_params(&out).unwrap();
        assert_eq!(pairs[0], ("SHORT".to_string(), "ok".to_string()));
        assert_eq!(pairs[1], ("LONG".to_string(), long_value));
    }

    #[test]
    fn converts_cgi_env_names_to_header_form() {
        assert_eq!(cgi_env_to_header_name("HTTP_CONTENT_TYPE"), Some("Content-Type".to_string()));
        assert_eq!(cgi_env_to_header_name("HTTP_X_FORWARDED_FOR"), Some("X-Forwarded-For".to_string()));
        assert_eq!(cgi_env_to_header_name("REQUEST_METHOD"), None);
    }

    #[test]
    fn accumulator_waits_for_terminating_empty_params_record() {
        let mut acc = ParamsAccumulator::new();
        let mut body = Vec::new();
        write_nv_length(&mut body, "REQUEST_METHOD".len());
        write_nv_length(&mut body, "GET".len());
        body.extend_from_slice(b"REQUEST_METHOD");
        body.extend_from_slice(b"GET");
        assert_eq!(acc.feed(1, &body).unwrap(), None);
        let pairs = acc.feed(1, &[]).unwrap().unwrap();
        assert_eq!(pairs, vec![("REQUEST_METHOD".to_string(), "GET".to_string())]);
    }

    #[test]
    fn rewrite_status_line_replaces_the_http_version_token() {
        let response = b"HTTP/1.0 200 OK\r\nContent-Length: 5\r\n\r\nhello";
        let rewritten = rewrite_status_line(response);
        assert!(rewritten.starts_with(b"Status: 200 OK\r\n"));
        assert!(rewritten.ends_with(b"hello"));
        assert!(rewritten.windows(b"Content-Length: 5".len()).any(|w| w == b"Content-Length: 5"));
    }

    #[test]
    fn rewrite_status_line_leaves_non_http_responses_alone() {
        let response = b"Status: 404 Not Found\r\n\r\n";
        assert_eq!(rewrite_status_line(response), response.to_vec());
    }

    #[test]
    fn write_response_as_stdout_frames_the_rewritten_bytes() {
        let response = b"HTTP/1.1 200 OK\r\n\r\nhi";
        let mut out = Vec::new();
        write_response_as_stdout(&mut out, 7, response);
        let (record, consumed) = parse_record(&out).unwrap().unwrap();
        assert_eq!(consumed, out.len());
        assert_eq!(record.header.kind, FCGI_STDOUT);
        assert!(record.body.starts_with(b"Status: 200 OK\r\n"));
    }

    #[test]
    fn stdout_splits_across_the_65535_byte_limit() {
        let data = vec![b'z'; MAX_RECORD_BODY + 10];
        let mut out = Vec::new();
        write_stdout(&mut out, 3, &data);
        let mut pos = 0;
        let mut records = Vec::new();
        while pos < out.len() {
            let (record, consumed) = parse_record(&out[pos..]).unwrap().unwrap();
            pos += consumed;
            records.push(record);
        }
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body.len(), MAX_RECORD_BODY);
        assert_eq!(records[1].body.len(), 10);
    }

    #[test]
    fn content_length_and_content_type_params_become_headers() {
        let pairs = vec![
            ("CONTENT_LENGTH".to_string(), "12".to_string()),
            ("CONTENT_TYPE".to_string(), "application/json".to_string()),
            ("HTTP_X_CUSTOM".to_string(), "yes".to_string()),
        ];
        let (_, headers) = split_params(&pairs);
        assert_eq!(headers.get("Content-Length"), Some("12"));
        assert_eq!(headers.get("Content-Type"), Some("application/json"));
        assert_eq!(headers.get("X-Custom"), Some("yes"));
    }

    #[test]
    fn synthesizes_a_parseable_request_preamble() {
        let pairs = vec![
            ("REQUEST_METHOD".to_string(), "GET".to_string()),
            ("REQUEST_URI".to_string(), "/api".to_string()),
            ("SERVER_PROTOCOL".to_string(), "HTTP/1.0".to_string()),
            ("HTTP_HOST".to_string(), "example.com".to_string()),
        ];
        let (env, headers) = split_params(&pairs);
        let preamble = synthesize_request_preamble(&env, &headers);
        let text = String::from_utf8(preamble).unwrap();
        assert!(text.starts_with("GET /api HTTP/1.0\r\n"));
        assert!(text.contains("Host: example.com\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[test]
    fn demultiplexer_drives_a_full_request_cycle() {
        let mut demux = Demultiplexer::new(10, 50, Vec::new());

        let mut begin_body = Vec::new();
        begin_body.extend_from_slice(&ROLE_RESPONDER.to_be_bytes());
        begin_body.push(0);
        begin_body.extend_from_slice(&[0; 5]);
        let (begin_record, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, FCGI_BEGIN_REQUEST, 1, &begin_body);
            out
        })
        .unwrap()
        .unwrap();
        let events = demux.handle_record(&begin_record).unwrap();
        assert_eq!(events, vec![FcgiEvent::RequestBegun { request_id: 1, keep_conn: false }]);

        let mut params_body = Vec::new();
        write_params(&mut params_body, &[("REQUEST_METHOD", "GET"), ("REQUEST_URI", "/x")]);
        let (params_record, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, FCGI_PARAMS, 1, &params_body);
            out
        })
        .unwrap()
        .unwrap();
        assert!(demux.handle_record(&params_record).unwrap().is_empty());

        let (empty_params, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, FCGI_PARAMS, 1, &[]);
            out
        })
        .unwrap()
        .unwrap();
        let events = demux.handle_record(&empty_params).unwrap();
        match &events[0] {
            FcgiEvent::RequestReady { request_id, preamble } => {
                assert_eq!(*request_id, 1);
                assert!(String::from_utf8(preamble.clone()).unwrap().starts_with("GET /x HTTP/1.0\r\n"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn get_values_reports_the_configured_trio() {
        let mut demux = Demultiplexer::new(7, 42, vec![("X_CUSTOM".to_string(), "ok".to_string())]);
        let mut body = Vec::new();
        write_params(&mut body, &[(FCGI_MPXS_CONNS, ""), (FCGI_MAX_CONNS, ""), ("X_CUSTOM", "")]);
        let (record, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, FCGI_GET_VALUES, 0, &body);
            out
        })
        .unwrap()
        .unwrap();
        let events = demux.handle_record(&record).unwrap();
        let FcgiEvent::Reply(reply) = &events[0] else { panic!("expected a Reply event") };
        let (result_record, _) = parse_record(reply).unwrap().unwrap();
        assert_eq!(result_record.header.kind, FCGI_GET_VALUES_RESULT);
        let pairs = parse_params(&result_record.body).unwrap();
        assert_eq!(pairs, vec![
            (FCGI_MPXS_CONNS.to_string(), "1".to_string()),
            (FCGI_MAX_CONNS.to_string(), "7".to_string()),
            ("X_CUSTOM".to_string(), "ok".to_string()),
        ]);
    }

    #[test]
    fn unknown_record_type_gets_an_unknown_type_reply() {
        let mut demux = Demultiplexer::new(1, 1, Vec::new());
        let (record, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, 200, 0, &[]);
            out
        })
        .unwrap()
        .unwrap();
        let events = demux.handle_record(&record).unwrap();
        let FcgiEvent::Reply(reply) = &events[0] else { panic!("expected a Reply event") };
        let (reply_record, _) = parse_record(reply).unwrap().unwrap();
        assert_eq!(reply_record.header.kind, FCGI_UNKNOWN_TYPE);
        assert_eq!(reply_record.body[0], 200);
    }

    #[test]
    fn abort_request_is_surfaced_as_an_event() {
        let mut demux = Demultiplexer::new(1, 1, Vec::new());
        let (record, _) = parse_record(&{
            let mut out = Vec::new();
            write_record(&mut out, FCGI_ABORT_REQUEST, 3, &[]);
            out
        })
        .unwrap()
        .unwrap();
        assert_eq!(demux.handle_record(&record).unwrap(), vec![FcgiEvent::AbortRequest { request_id: 3 }]);
    }
}
