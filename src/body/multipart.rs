//! RFC 2388 multipart/form-data reader (§4.7.1).
//!
//! State machine: `FirstLine → Headers → Body → (Headers | Complete |
//! Error)`. Bytes are fed in as they arrive off the wire; the reader
//! withholds up to `boundary.len() + 3` trailing bytes of an
//! undecided tail so a boundary split across two `feed()` calls is
//! never mistaken for body content.

use super::{BodyEvent, Field, PostBodyReader};
use crate::buffer::TemporaryBuffer;
use crate::error::Error;
use crate::parser::parse_header_line;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FirstLine,
    Headers,
    Body,
    Complete,
    Error,
}

pub struct MultipartReader {
    boundary: Vec<u8>,
    state: State,
    scan: Vec<u8>,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    current: Option<usize>,
    // headers accumulated for the field currently being parsed
    pending_name: Option<String>,
    pending_mime: Option<String>,
    completed_emitted: bool,
}

impl MultipartReader {
    pub fn new(boundary: impl Into<Vec<u8>>) -> MultipartReader {
        MultipartReader {
            boundary: boundary.into(),
            state: State::FirstLine,
            scan: Vec::new(),
            fields: Vec::new(),
            index: HashMap::new(),
            current: None,
            pending_name: None,
            pending_mime: None,
            completed_emitted: false,
        }
    }

    fn opening_line(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.boundary.len() + 2);
        v.extend_from_slice(b"--");
        v.extend_from_slice(&self.boundary);
        v
    }

    fn body_marker(&self) -> Vec<u8> {
        let mut v = Vec::with_capacity(self.boundary.len() + 4);
        v.extend_from_slice(b"\r\n--");
        v.extend_from_slice(&self.boundary);
        v
    }

    fn find_line(&self) -> Option<usize> {
        self.scan.windows(2).position(|w| w == b"\r\n")
    }

    fn run(&mut self, events: &mut Vec<BodyEvent>) -> Result<(), Error> {
        loop {
            match self.state {
                State::FirstLine => {
                    let Some(pos) = self.find_line() else { return Ok(()) };
                    let line = self.scan[..pos].to_vec();
                    self.scan.drain(..pos + 2);
                    let opening = self.opening_line();
                    if line == opening {
                        self.state = State::Headers;
                    } else if line == [opening.as_slice(), b"--"].concat() {
                        self.state = State::Complete;
                        return Ok(());
                    } else {
                        self.state = State::Error;
                        return Err(Error::Protocol("multipart body did not start with boundary"));
                    }
                }
                State::Headers => {
                    let Some(pos) = self.find_line() else { return Ok(()) };
                    let line = self.scan[..pos].to_vec();
                    self.scan.drain(..pos + 2);
                    if line.is_empty() {
                        let name = self.pending_name.take().ok_or(Error::Protocol(
                            "multipart part missing Content-Disposition",
                        ))?;
                        let mime = self.pending_mime.take().unwrap_or_else(|| "text/plain".to_string());
                        let field = Field::new(name.clone(), mime);
                        let idx = self.fields.len();
                        self.fields.push(field);
                        self.index.insert(name.clone(), idx);
                        self.current = Some(idx);
                        events.push(BodyEvent::FieldFound(name));
                        self.state = State::Body;
                        continue;
                    }
                    if let Some((name, value)) = parse_header_line(&line) {
                        if name.eq_ignore_ascii_case("Content-Disposition") {
                            self.pending_name = parse_form_data_name(value);
                            if self.pending_name.is_none() {
                                self.state = State::Error;
                                return Err(Error::Protocol(
                                    "Content-Disposition missing name parameter",
                                ));
                            }
                        } else if name.eq_ignore_ascii_case("Content-Type") {
                            self.pending_mime = Some(value.trim().to_string());
                        }
                    } else {
                        self.state = State::Error;
                        return Err(Error::Protocol("malformed multipart header line"));
                    }
                }
                State::Body => {
                    let marker = self.body_marker();
                    if let Some(pos) = find_subslice(&self.scan, &marker) {
                        let after = pos + marker.len();
                        if self.scan.len() < after + 2 {
                            // Marker itself is certain, but we can't yet
                            // tell a terminator `--` from a continuation
                            // `\r\n`; flush only the unambiguous body
                            // bytes before the marker and wait.
                            if pos > 0 {
                                let body: Vec<u8> = self.scan.drain(..pos).collect();
                                if let Some(idx) = self.current {
                                    self.fields[idx].push(&body)?;
                                }
                            }
                            return Ok(());
                        }
                        let body = self.scan[..pos].to_vec();
                        let follow = [self.scan[after], self.scan[after + 1]];
                        if let Some(idx) = self.current {
                            self.fields[idx].push(&body)?;
                        }
                        if follow == *b"--" {
                            self.scan.drain(..after + 2);
                            if let Some(idx) = self.current.take() {
                                self.fields[idx].complete = true;
                                events.push(BodyEvent::FieldCompleted(self.fields[idx].name.clone()));
                            }
                            self.state = State::Complete;
                            return Ok(());
                        } else if follow == *b"\r\n" {
                            self.scan.drain(..after + 2);
                            if let Some(idx) = self.current.take() {
                                self.fields[idx].complete = true;
                                events.push(BodyEvent::FieldCompleted(self.fields[idx].name.clone()));
                            }
                            self.state = State::Headers;
                        } else {
                            self.state = State::Error;
                            return Err(Error::Protocol("malformed multipart boundary suffix"));
                        }
                    } else {
                        // Withhold a tail that could be a partial match of
                        // the marker spanning the next feed().
                        let withhold = marker.len().saturating_sub(1);
                        if self.scan.len() > withhold {
                            let flush_len = self.scan.len() - withhold;
                            let body: Vec<u8> = self.scan.drain(..flush_len).collect();
                            if let Some(idx) = self.current {
                                self.fields[idx].push(&body)?;
                            }
                        }
                        return Ok(());
                    }
                }
                State::Complete | State::Error => return Ok(()),
            }
        }
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_form_data_name(value: &str) -> Option<String> {
    for part in value.split(';').skip(1) {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("name=") {
            let rest = rest.trim();
            let rest = rest.strip_prefix('"').unwrap_or(rest);
            let rest = rest.strip_suffix('"').unwrap_or(rest);
            return Some(rest.to_string());
        }
    }
    None
}

impl PostBodyReader for MultipartReader {
    fn feed(&mut self, data: &[u8]) -> Result<Vec<BodyEvent>, Error> {
        self.scan.extend_from_slice(data);
        let mut events = Vec::new();
        match self.run(&mut events) {
            Ok(()) => Ok(events),
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }

    fn finish(&mut self) -> Result<Vec<BodyEvent>, Error> {
        let mut events = Vec::new();
        let success = self.state == State::Complete;
        if !success {
            self.state = State::Error;
        }
        if !self.completed_emitted {
            self.completed_emitted = true;
            events.push(BodyEvent::Completed { success });
        }
        if success {
            Ok(events)
        } else {
            Err(Error::Protocol("multipart body ended before final boundary"))
        }
    }

    fn is_complete(&self) -> bool {
        self.state == State::Complete
    }

    fn has_failed(&self) -> bool {
        self.state == State::Error
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn field_length(&self, name: &str) -> Option<u64> {
        self.index.get(name).and_then(|&i| self.fields[i].length)
    }

    fn field_bytes_transferred(&self, name: &str) -> Option<u64> {
        self.index.get(name).map(|&i| self.fields[i].transferred)
    }

    fn is_field_complete(&self, name: &str) -> bool {
        self.index.get(name).map(|&i| self.fields[i].complete).unwrap_or(false)
    }

    fn field_mime_type(&self, name: &str) -> Option<String> {
        self.index.get(name).map(|&i| self.fields[i].mime_type.clone())
    }

    fn field_value(&mut self, name: &str) -> Option<Vec<u8>> {
        let idx = *self.index.get(name)?;
        self.fields[idx].buffer.reset().ok()?;
        self.fields[idx].buffer.read_all().ok()
    }

    fn field_stream(&mut self, name: &str) -> Option<&mut TemporaryBuffer> {
        let idx = *self.index.get(name)?;
        Some(&mut self.fields[idx].buffer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn body(boundary: &str, parts: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (name, mime, value) in parts {
            out.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            out.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", name).as_bytes(),
            );
            out.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        out
    }

    #[test]
    fn parses_two_fields_in_one_feed() {
        let raw = body("XYZ", &[("a", "text/plain", "hello"), ("b", "text/plain", "world")]);
        let mut reader = MultipartReader::new("XYZ");
        let events = reader.feed(&raw).unwrap();
        reader.finish().unwrap();
        assert!(reader.is_complete());
        assert!(events.iter().any(|e| *e == BodyEvent::FieldFound("a".into())));
        assert_eq!(reader.field_value("a"), Some(b"hello".to_vec()));
        assert_eq!(reader.field_value("b"), Some(b"world".to_vec()));
    }

    #[test]
    fn parses_when_boundary_is_split_across_feeds() {
        let raw = body("XYZ", &[("a", "text/plain", "hello")]);
        let mut reader = MultipartReader::new("XYZ");
        let split = raw.len() - 5;
        reader.feed(&raw[..split]).unwrap();
        reader.feed(&raw[split..]).unwrap();
        reader.finish().unwrap();
        assert_eq!(reader.field_value("a"), Some(b"hello".to_vec()));
    }

    #[test]
    fn missing_content_disposition_name_fails() {
        let raw = b"--XYZ\r\nContent-Type: text/plain\r\n\r\nhello\r\n--XYZ--\r\n";
        let mut reader = MultipartReader::new("XYZ");
        assert!(reader.feed(raw).is_err());
        assert!(reader.has_failed());
    }
}
