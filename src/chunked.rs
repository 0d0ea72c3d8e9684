//! `Transfer-Encoding: chunked` framing (§4.5).
//!
//! Encoding is what the server actually needs at runtime: every
//! non-empty handler write becomes one `hex(len)\r\n<data>\r\n` frame,
//! and `close()` appends the `0\r\n\r\n` terminator. The decoder exists
//! for the `tests/` round-trip property in §8 and for embedders that
//! want to verify their own chunked output against this crate.

use httparse::{parse_chunk_size, Status as ChunkStatus};

pub fn encode_chunk(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 16);
    let _ = write_hex_len(&mut out, payload.len());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(payload);
    out.extend_from_slice(b"\r\n");
    out
}

pub const TERMINATOR: &[u8] = b"0\r\n\r\n";

fn write_hex_len(out: &mut Vec<u8>, len: usize) -> std::fmt::Result {
    use std::fmt::Write;
    write!(out, "{:x}", len)
}

/// Incremental chunked-body decoder, mirroring the teacher's
/// `chunked::State` (buffered/pending/done bookkeeping) but operating
/// directly on a growable `Vec<u8>` instead of `tk_bufstream::Buf`.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    pending: usize,
    done: bool,
}

impl Decoder {
    pub fn new() -> Decoder {
        Decoder::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed the full remaining buffer, returning every complete chunk's
    /// payload found so far and the number of leading bytes consumed.
    /// Stops (without error) on a partial chunk-size line or partial
    /// chunk body, leaving the remainder for the next call.
    pub fn decode(&mut self, buf: &[u8]) -> Result<(Vec<Vec<u8>>, usize), httparse::InvalidChunkSize> {
        let mut pos = 0;
        let mut chunks = Vec::new();
        while !self.done && pos < buf.len() {
            if self.pending == 0 {
                match parse_chunk_size(&buf[pos..])? {
                    ChunkStatus::Complete((used, 0)) => {
                        pos += used;
                        self.done = true;
                    }
                    ChunkStatus::Complete((used, size)) => {
                        pos += used;
                        self.pending = size as usize;
                    }
                    ChunkStatus::Partial => break,
                }
            } else {
                let available = buf.len() - pos;
                if available < self.pending + 2 {
                    break;
                }
                chunks.push(buf[pos..pos + self.pending].to_vec());
                pos += self.pending + 2; // chunk data + trailing CRLF
                self.pending = 0;
            }
        }
        Ok((chunks, pos))
    }
}
