//! Streaming POST body readers: multipart (`multipart.rs`) and
//! url-encoded (`urlencoded.rs`) (§4.7). Both share the same per-field
//! contract so `HttpClient` can drive either one identically once it has
//! picked a reader from the request's `Content-Type`.

pub mod multipart;
pub mod urlencoded;

use crate::buffer::TemporaryBuffer;
use crate::error::Error;

/// Emitted by `PostBodyReader::feed`/`finish` in the order the original
/// signals (`fieldFound`, `fieldCompleted`, `completed`) fired; returned
/// as a `Vec` rather than dispatched through a callback bus, per the
/// redesign notes in §9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyEvent {
    FieldFound(String),
    FieldCompleted(String),
    Completed { success: bool },
}

/// One field of a multipart or url-encoded body. Bytes accumulate into
/// a `TemporaryBuffer` so large uploads spill to disk exactly like a
/// buffered response (§4.4, §4.9).
pub struct Field {
    pub name: String,
    pub mime_type: String,
    pub length: Option<u64>,
    pub transferred: u64,
    pub buffer: TemporaryBuffer,
    pub complete: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>) -> Field {
        Field {
            name: name.into(),
            mime_type: mime_type.into(),
            length: None,
            transferred: 0,
            buffer: TemporaryBuffer::new(),
            complete: false,
        }
    }

    pub fn push(&mut self, data: &[u8]) -> Result<(), Error> {
        self.buffer.write_all(data)?;
        self.transferred += data.len() as u64;
        Ok(())
    }
}

/// Common contract for multipart and url-encoded readers (§4.7).
pub trait PostBodyReader {
    /// Feed another chunk of the raw request body.
    fn feed(&mut self, data: &[u8]) -> Result<Vec<BodyEvent>, Error>;
    /// Signal that no more bytes are coming (the declared
    /// `Content-Length` has been consumed).
    fn finish(&mut self) -> Result<Vec<BodyEvent>, Error>;

    fn is_complete(&self) -> bool;
    fn has_failed(&self) -> bool;

    fn field_names(&self) -> Vec<&str>;
    fn has_field(&self, name: &str) -> bool {
        self.field_names().iter().any(|n| *n == name)
    }
    fn field_length(&self, name: &str) -> Option<u64>;
    fn field_bytes_transferred(&self, name: &str) -> Option<u64>;
    fn is_field_complete(&self, name: &str) -> bool;
    fn field_mime_type(&self, name: &str) -> Option<String>;
    /// Read the whole field value into memory. Intended for small
    /// fields (form values); large uploads should use `field_stream`.
    fn field_value(&mut self, name: &str) -> Option<Vec<u8>>;
    fn field_stream(&mut self, name: &str) -> Option<&mut TemporaryBuffer>;
}
