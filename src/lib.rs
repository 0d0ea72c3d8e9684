//! Multi-protocol HTTP server core on top of `tokio`.
//!
//! This crate owns the wire-level state machinery shared by an HTTP/1.0
//! and HTTP/1.1 server: the per-connection request/response engine,
//! WebSocket upgrades (RFC 6455), a FastCGI responder backend, multipart
//! and url-encoded body parsing, and a hierarchical routing tree with
//! RESTful pattern matching.
//!
//! Transport I/O, TLS termination and handler business logic are supplied
//! by the embedder; this crate specifies only the protocol state and the
//! dispatch contract.

pub mod enums;
pub mod headers;
pub mod parser;
pub mod writer;
pub mod chunked;
pub mod buffer;
pub mod json_stream;
pub mod body;
pub mod filter;
pub mod websocket;
pub mod transport;
pub mod client;
pub mod routing;
pub mod value;
pub mod server;
pub mod error;

pub use enums::{Status, Version, Verb};
pub use error::Error;
