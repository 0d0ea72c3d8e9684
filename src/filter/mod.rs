//! Response-body filter chain (§4.6): content-encoding transforms
//! applied between the handler's writes and the transfer-encoder.
//!
//! A filter exposes four hooks mirroring the lifecycle of a response:
//! `filter_name`, `filter_headers`, `filter_begin`, `filter_data`,
//! `filter_end`. Filters run in insertion order; installing a second
//! standard filter (deflate/gzip) replaces any previous standard filter
//! at the tail instead of stacking, so a handler can't accidentally
//! double-compress a body.

pub mod deflate;
pub mod gzip;

use crate::error::Error;
use crate::headers::HeaderMap;

pub use deflate::DeflateFilter;
pub use gzip::GzipFilter;

/// One stage of the response filter chain.
pub trait HttpFilter: Send {
    /// Non-empty for filters that should be advertised in
    /// `Content-Encoding` (empty for filters that only observe, such as
    /// a hashing or byte-counting filter).
    fn filter_name(&self) -> &str;

    /// Called once, before any body bytes, with the headers about to be
    /// sent. May add/remove headers (e.g. drop `Content-Length` once a
    /// filter makes output length unpredictable).
    fn filter_headers(&mut self, headers: &mut HeaderMap) {
        let _ = headers;
    }

    /// Bytes to emit before the first `filter_data` call (e.g. a gzip
    /// header).
    fn filter_begin(&mut self) -> Result<Vec<u8>, Error> {
        Ok(Vec::new())
    }

    fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error>;

    /// Bytes to emit once the response body is complete (e.g. a deflate
    /// trailer); called exactly once by `close()` (§4.3.14).
    fn filter_end(&mut self) -> Result<Vec<u8>, Error>;
}

/// Ordered chain of filters applied to a response body. Standard
/// (named) filters replace each other at the tail; unnamed filters
/// always append.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn HttpFilter>>,
}

impl FilterChain {
    pub fn new() -> FilterChain {
        FilterChain { filters: Vec::new() }
    }

    /// Install a filter. If its `filter_name()` is non-empty and the
    /// current tail filter also has a non-empty name, the tail is
    /// replaced rather than stacked (§4.6).
    pub fn push(&mut self, filter: Box<dyn HttpFilter>) {
        if !filter.filter_name().is_empty() {
            if let Some(last) = self.filters.last() {
                if !last.filter_name().is_empty() {
                    self.filters.pop();
                }
            }
        }
        self.filters.push(filter);
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Append the effective `Content-Encoding` and let each filter amend
    /// the outgoing headers, in insertion order.
    pub fn apply_headers(&mut self, headers: &mut HeaderMap) {
        let mut encodings = Vec::new();
        for filter in self.filters.iter_mut() {
            filter.filter_headers(headers);
            let name = filter.filter_name();
            if !name.is_empty() {
                encodings.push(name.to_string());
            }
        }
        if !encodings.is_empty() {
            headers.set("Content-Encoding", encodings.join(", "));
        }
    }

    pub fn begin(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        for filter in self.filters.iter_mut() {
            out.extend(filter.filter_begin()?);
        }
        Ok(out)
    }

    /// Run `data` through every filter in order, each stage's output
    /// feeding the next.
    pub fn data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut buf = data.to_vec();
        for filter in self.filters.iter_mut() {
            buf = filter.filter_data(&buf)?;
        }
        Ok(buf)
    }

    pub fn end(&mut self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        for filter in self.filters.iter_mut() {
            out.extend(filter.filter_end()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Tagging(&'static str);

    impl HttpFilter for Tagging {
        fn filter_name(&self) -> &str {
            self.0
        }
        fn filter_data(&mut self, data: &[u8]) -> Result<Vec<u8>, Error> {
            Ok(data.to_vec())
        }
        fn filter_end(&mut self) -> Result<Vec<u8>, Error> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn second_standard_filter_replaces_the_first() {
        let mut chain = FilterChain::new();
        chain.push(Box::new(Tagging("deflate")));
        chain.push(Box::new(Tagging("gzip")));
        let mut headers = HeaderMap::new();
        chain.apply_headers(&mut headers);
        assert_eq!(headers.get("Content-Encoding"), Some("gzip"));
    }

    #[test]
    fn unnamed_filters_always_stack() {
        let mut chain = FilterChain::new();
        chain.push(Box::new(Tagging("")));
        chain.push(Box::new(Tagging("")));
        let mut headers = HeaderMap::new();
        chain.apply_headers(&mut headers);
        assert_eq!(headers.get("Content-Encoding"), None);
    }
}
