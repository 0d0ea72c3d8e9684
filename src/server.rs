//! Server-level configuration and the root dispatch entry point (§4.12,
//! §4.13). `Config` follows the teacher's `server::Config` builder shape
//! (`new()` with defaults, chained setters returning `&mut Self`,
//! `.done()` cloning into an `Arc`); `HttpServer` wraps a root
//! `HttpNode`, an optional error node, and a threading policy.

use crate::client::ClientConfig;
use crate::enums::{Status, Verb};
use crate::routing::{split_path, HttpNode, Resolution};
use crate::transport::TimeoutConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How worker tasks are provisioned for accepted transports (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingPolicy {
    /// Everything runs on the accept task.
    NoThreading,
    /// A fixed number of worker tasks.
    Fixed(usize),
    /// One worker task per available CPU core.
    OneThreadPerCore,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub fqdn: String,
    pub max_header_line_len: usize,
    pub max_requests: u32,
    pub max_body_length: u64,
    pub timeouts: TimeoutConfig,
    pub threading: ThreadingPolicy,
}

impl Config {
    pub fn new() -> Config {
        Config {
            fqdn: "localhost".to_string(),
            max_header_line_len: crate::client::MAX_HEADER_LINE_LEN,
            max_requests: 10,
            max_body_length: 4 * 1024 * 1024,
            timeouts: TimeoutConfig::default(),
            threading: ThreadingPolicy::OneThreadPerCore,
        }
    }

    pub fn fqdn(&mut self, value: impl Into<String>) -> &mut Self {
        self.fqdn = value.into();
        self
    }

    pub fn max_header_line_len(&mut self, value: usize) -> &mut Self {
        self.max_header_line_len = value;
        self
    }

    pub fn max_requests(&mut self, value: u32) -> &mut Self {
        self.max_requests = value;
        self
    }

    pub fn max_body_length(&mut self, value: u64) -> &mut Self {
        self.max_body_length = value;
        self
    }

    pub fn timeouts(&mut self, value: TimeoutConfig) -> &mut Self {
        self.timeouts = value;
        self
    }

    pub fn threading(&mut self, value: ThreadingPolicy) -> &mut Self {
        self.threading = value;
        self
    }

    /// Create an `Arc`'d config clone to hand to `HttpServer::new`.
    pub fn done(&mut self) -> Arc<Config> {
        Arc::new(self.clone())
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

impl From<&Config> for ClientConfig {
    fn from(cfg: &Config) -> ClientConfig {
        ClientConfig {
            max_header_line_len: cfg.max_header_line_len,
            max_requests: cfg.max_requests,
            fqdn: cfg.fqdn.clone(),
            max_body_length: cfg.max_body_length,
        }
    }
}

/// Owns the routing tree and hands worker tasks out round-robin (§4.12,
/// §5). The actual transport accept loops live in `transport::tcp` /
/// `transport::fastcgi`; this type is the dispatch root they call into.
pub struct HttpServer {
    config: Arc<Config>,
    root: HttpNode,
    error_node: Option<HttpNode>,
    next_worker: AtomicUsize,
    worker_count: usize,
}

impl HttpServer {
    pub fn new(config: Arc<Config>, root: HttpNode) -> HttpServer {
        let worker_count = match config.threading {
            ThreadingPolicy::NoThreading => 1,
            ThreadingPolicy::Fixed(n) => n.max(1),
            ThreadingPolicy::OneThreadPerCore => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        };
        HttpServer {
            config,
            root,
            error_node: None,
            next_worker: AtomicUsize::new(0),
            worker_count,
        }
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn set_error_node(&mut self, node: HttpNode) {
        self.error_node = Some(node);
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Round-robin worker index for a freshly-accepted transport (§5).
    pub fn next_worker(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.worker_count
    }

    /// §4.12: split the path, walk the root node, and fall back to 404
    /// if nothing along the way answered. `range` is the requested
    /// `(start, end)` from a parsed `Range` header, if any.
    pub fn invoke_by_path(&self, path: &str, verb: Verb, secure: bool, range: Option<(u64, u64)>) -> Resolution {
        let parts = split_path(path);
        match self.root.invoke_path(&parts, 0, verb, secure, range) {
            Resolution::NotFound => Resolution::NotFound,
            other => other,
        }
    }

    /// Status to serve for a `Resolution` that isn't `Slot`/`StaticFile`
    /// (i.e. every outcome the transport glue can answer without
    /// invoking a handler).
    pub fn status_for(&self, resolution: &Resolution) -> Option<Status> {
        match resolution {
            Resolution::Forbidden => Some(Status::Forbidden),
            Resolution::NotFound => Some(Status::NotFound),
            Resolution::MethodNotAllowed => Some(Status::MethodNotAllowed),
            Resolution::RedirectSecure => Some(Status::TemporaryRedirect),
            Resolution::RangeNotSatisfiable => Some(Status::RangeNotSatisfiable),
            Resolution::Slot { .. } | Resolution::StaticFile { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::routing::Slot;

    #[test]
    fn config_builder_chains_and_clones() {
        let mut builder = Config::new();
        let config = builder.fqdn("example.com").max_requests(5).done();
        assert_eq!(config.fqdn, "example.com");
        assert_eq!(config.max_requests, 5);
    }

    #[test]
    fn fixed_threading_sets_worker_count() {
        let mut builder = Config::new();
        builder.threading(ThreadingPolicy::Fixed(4));
        let server = HttpServer::new(builder.done(), HttpNode::new());
        assert_eq!(server.worker_count(), 4);
    }

    #[test]
    fn round_robin_cycles_through_workers() {
        let mut builder = Config::new();
        builder.threading(ThreadingPolicy::Fixed(3));
        let server = HttpServer::new(builder.done(), HttpNode::new());
        let picks: Vec<usize> = (0..6).map(|_| server.next_worker()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn unmatched_path_is_not_found() {
        let config = Config::new().done();
        let server = HttpServer::new(config, HttpNode::new());
        assert_eq!(server.invoke_by_path("/nope", Verb::Get, false, None), Resolution::NotFound);
    }

    #[test]
    fn matched_slot_resolves_through_invoke_by_path() {
        let mut root = HttpNode::new();
        root.add_slot("ping", Slot::new(vec![Verb::Get]));
        let config = Config::new().done();
        let server = HttpServer::new(config, root);
        assert_eq!(
            server.invoke_by_path("/ping", Verb::Get, false, None),
            Resolution::Slot { name: "ping".to_string() }
        );
    }
}
