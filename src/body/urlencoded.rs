//! `application/x-www-form-urlencoded` body reader (§4.7.2).
//!
//! State machine: `Key → Value → (Key | Complete | Error)`. Tokens are
//! separated by `&`, key from value by `=`; both are percent-decoded.
//! Each key becomes a field whose MIME type is reported as
//! `text/plain; charset=<charset>` (the charset the embedder configured
//! for this reader, default `utf-8`).

use super::{BodyEvent, Field, PostBodyReader};
use crate::buffer::TemporaryBuffer;
use crate::error::Error;
use crate::headers::percent_decode;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Key,
    Value,
    Complete,
    Error,
}

pub struct UrlEncodedReader {
    charset: String,
    state: State,
    scan: Vec<u8>,
    key_buf: Vec<u8>,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    current: Option<usize>,
    completed_emitted: bool,
}

impl UrlEncodedReader {
    pub fn new() -> UrlEncodedReader {
        UrlEncodedReader::with_charset("utf-8")
    }

    pub fn with_charset(charset: impl Into<String>) -> UrlEncodedReader {
        UrlEncodedReader {
            charset: charset.into(),
            state: State::Key,
            scan: Vec::new(),
            key_buf: Vec::new(),
            fields: Vec::new(),
            index: HashMap::new(),
            current: None,
            completed_emitted: false,
        }
    }

    fn mime_type(&self) -> String {
        format!("text/plain; charset={}", self.charset)
    }

    fn open_field(&mut self, name: String, events: &mut Vec<BodyEvent>) {
        let mime = self.mime_type();
        let idx = self.fields.len();
        self.fields.push(Field::new(name.clone(), mime));
        self.index.insert(name.clone(), idx);
        self.current = Some(idx);
        events.push(BodyEvent::FieldFound(name));
    }

    fn close_field(&mut self, events: &mut Vec<BodyEvent>) -> Result<(), Error> {
        if let Some(idx) = self.current.take() {
            self.fields[idx].complete = true;
            events.push(BodyEvent::FieldCompleted(self.fields[idx].name.clone()));
        }
        Ok(())
    }

    fn run(&mut self, events: &mut Vec<BodyEvent>) -> Result<(), Error> {
        loop {
            if self.scan.is_empty() {
                return Ok(());
            }
            match self.state {
                State::Key => {
                    match position(&self.scan, b'=') {
                        Some(pos) => {
                            let key_bytes: Vec<u8> =
                                self.key_buf.drain(..).chain(self.scan.drain(..pos)).collect();
                            self.scan.drain(..1); // '='
                            let key = percent_decode(&String::from_utf8_lossy(&key_bytes));
                            if key.is_empty() {
                                self.state = State::Error;
                                return Err(Error::Protocol("url-encoded body has empty key"));
                            }
                            self.open_field(key, events);
                            self.state = State::Value;
                        }
                        None => {
                            self.key_buf.extend(self.scan.drain(..));
                            return Ok(());
                        }
                    }
                }
                State::Value => {
                    match position(&self.scan, b'&') {
                        Some(pos) => {
                            let raw: Vec<u8> = self.scan.drain(..=pos).collect();
                            let value_bytes = &raw[..raw.len() - 1];
                            let value = percent_decode(&String::from_utf8_lossy(value_bytes));
                            if let Some(idx) = self.current {
                                self.fields[idx].push(value.as_bytes())?;
                            }
                            self.close_field(events)?;
                            self.state = State::Key;
                        }
                        None => {
                            // No terminating `&` yet: the value keeps
                            // accumulating raw bytes pending either more
                            // input or `finish()`.
                            let raw: Vec<u8> = self.scan.drain(..).collect();
                            self.key_buf.extend(raw);
                            return Ok(());
                        }
                    }
                }
                State::Complete | State::Error => return Ok(()),
            }
        }
    }
}

fn position(buf: &[u8], needle: u8) -> Option<usize> {
    buf.iter().position(|&b| b == needle)
}

impl Default for UrlEncodedReader {
    fn default() -> UrlEncodedReader {
        UrlEncodedReader::new()
    }
}

impl PostBodyReader for UrlEncodedReader {
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
        match self.state {
            State::Key if self.key_buf.is_empty() && self.fields.is_empty() => {
                // Empty body: zero fields is a valid, complete body.
                self.state = State::Complete;
            }
            State::Value => {
                let value = percent_decode(&String::from_utf8_lossy(&self.key_buf));
                self.key_buf.clear();
                if let Some(idx) = self.current {
                    self.fields[idx].push(value.as_bytes())?;
                }
                self.close_field(&mut events)?;
                self.state = State::Complete;
            }
            State::Key => {
                self.state = State::Error;
            }
            State::Complete => {}
            State::Error => {}
        }
        let success = self.state == State::Complete;
        if !self.completed_emitted {
            self.completed_emitted = true;
            events.push(BodyEvent::Completed { success });
        }
        if success {
            Ok(events)
        } else {
            Err(Error::Protocol("url-encoded body ended mid-token"))
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

    #[test]
    fn parses_multiple_fields() {
        let mut reader = UrlEncodedReader::new();
        reader.feed(b"a=1&b=hello%20world&").unwrap();
        reader.feed(b"c=3").unwrap();
        reader.finish().unwrap();
        assert!(reader.is_complete());
        assert_eq!(reader.field_value("a"), Some(b"1".to_vec()));
        assert_eq!(reader.field_value("b"), Some(b"hello world".to_vec()));
        assert_eq!(reader.field_value("c"), Some(b"3".to_vec()));
    }

    #[test]
    fn empty_body_is_complete_with_no_fields() {
        let mut reader = UrlEncodedReader::new();
        reader.finish().unwrap();
        assert!(reader.is_complete());
        assert!(reader.field_names().is_empty());
    }

    #[test]
    fn premature_eof_mid_key_is_an_error() {
        let mut reader = UrlEncodedReader::new();
        reader.feed(b"a=1&b").unwrap();
        assert!(reader.finish().is_err());
        assert!(reader.has_failed());
    }

    #[test]
    fn mime_type_reports_charset() {
        let mut reader = UrlEncodedReader::new();
        reader.feed(b"a=1").unwrap();
        assert_eq!(reader.field_mime_type("a"), Some("text/plain; charset=utf-8".to_string()));
    }
}
