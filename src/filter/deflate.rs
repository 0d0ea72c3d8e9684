//! `Content-Encoding: deflate` filter (§4.6), backed by `flate2`'s
//! zlib-wrapped deflate writer.

use super::HttpFilter;
use crate::error::Error;
use crate::headers::HeaderMap;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub struct DeflateFilter {
    encoder: ZlibEncoder<Vec<u8>>,
}

impl DeflateFilter {
    pub fn new() -> DeflateFilter {
        DeflateFilter::with_level(Compression::default())
    }

    pub fn with_level(level: Compression) -> DeflateFilter {
        DeflateFilter { encoder: ZlibEncoder::new(Vec::new(), level) }
    }

    fn drain(&mut self) -> Vec<u8> {
        std::mem::take(self.encoder.get_mut())
    }
}

impl Default for DeflateFilter {
    fn default() -> DeflateFilter {
        DeflateFilter::new()
    }
}

impl HttpFilter for DeflateFilter {
    fn filter_name(&self) -> &str {
        "deflate"
    }

    fn filter_headers(&mut self, headers: &mut HeaderMap) {
        // Output length is no longer predictable up front.
        headers.remove("Content-Length");
    }

    fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        self.encoder.write_all(data)?;
        self.encoder.flush()?;
        Ok(self.drain())
    }

    fn filter_end(&mut self) -> Result<Vec<u8>, Error> {
        let encoder = std::mem::replace(&mut self.encoder, ZlibEncoder::new(Vec::new(), Compression::default()));
        let tail = encoder.finish()?;
        Ok(tail)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn round_trips_through_flate2_decoder() {
        let mut filter = DeflateFilter::new();
        let mut out = filter.filter_data(b"hello world, hello world").unwrap();
        out.extend(filter.filter_end().unwrap());
        let mut decoder = ZlibDecoder::new(&out[..]);
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "hello world, hello world");
    }

    #[test]
    fn strips_content_length() {
        let mut filter = DeflateFilter::new();
        let mut headers = HeaderMap::new();
        headers.set("Content-Length", "100");
        filter.filter_headers(&mut headers);
        assert_eq!(headers.get("Content-Length"), None);
    }
}
