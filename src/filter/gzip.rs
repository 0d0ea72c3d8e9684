//! `Content-Encoding: gzip` filter (§4.6), backed by `flate2`'s
//! gzip-wrapped deflate writer.

use super::HttpFilter;
use crate::error::Error;
use crate::headers::HeaderMap;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

pub struct GzipFilter {
    encoder: GzEncoder<Vec<u8>>,
}

impl GzipFilter {
    pub fn new() -> GzipFilter {
        GzipFilter::with_level(Compression::default())
    }

    pub fn with_level(level: Compression) -> GzipFilter {
        GzipFilter { encoder: GzEncoder::new(Vec::new(), level) }
    }

    fn drain(&mut self) -> Vec<u8> {
        std::mem::take(self.encoder.get_mut())
    }
}

impl Default for GzipFilter {
    fn default() -> GzipFilter {
        GzipFilter::new()
    }
}

impl HttpFilter for GzipFilter {
    fn filter_name(&self) -> &str {
        "gzip"
    }

    fn filter_headers(&mut self, headers: &mut HeaderMap) {
        headers.remove("Content-Length");
    }

    fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        self.encoder.write_all(data)?;
        self.encoder.flush()?;
        Ok(self.drain())
    }

    fn filter_end(&mut self) -> Result<Vec<u8>, Error> {
        let encoder = std::mem::replace(&mut self.encoder, GzEncoder::new(Vec::new(), Compression::default()));
        let tail = encoder.finish()?;
        Ok(tail)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn round_trips_through_flate2_decoder() {
        let mut filter = GzipFilter::new();
        let mut out = filter.filter_data(b"hello world, hello world").unwrap();
        out.extend(filter.filter_end().unwrap());
        let mut decoder = GzDecoder::new(&out[..]);
        let mut decoded = String::new();
        decoder.read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, "hello world, hello world");
    }

    #[test]
    fn replacing_tail_filter_keeps_only_the_latest_encoding() {
        use super::super::FilterChain;

        struct Noop;
        impl HttpFilter for Noop {
            fn filter_name(&self) -> &str {
                "deflate"
            }
            fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
                Ok(data.to_vec())
            }
            fn filter_end(&mut self) -> Result<Vec<u8>, Error> {
                Ok(Vec::new())
            }
        }

        let mut chain = FilterChain::new();
        chain.push(Box::new(Noop));
        chain.push(Box::new(GzipFilter::new()));
        let mut headers = HeaderMap::new();
        chain.apply_headers(&mut headers);
        assert_eq!(headers.get("Content-Encoding"), Some("gzip"));
    }
}
