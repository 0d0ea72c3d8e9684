//! Library-wide error type.
//!
//! The teacher's `quick_error!`-based `Error` wrapped `httparse`/`io`
//! errors behind a single enum so protocol handlers had one type to
//! propagate; we keep that shape but build it with `thiserror`, which is
//! the error-derive macro the rest of this generation of crates reaches
//! for.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("header parse error: {0:?}")]
    Parse(httparse::Error),

    #[error("malformed request: {0}")]
    Malformed(&'static str),

    #[error("request body exceeds configured limit")]
    BodyTooLarge,

    #[error("range not satisfiable")]
    RangeNotSatisfiable,

    #[error("protocol violation: {0}")]
    Protocol(&'static str),

    #[error("handler conversion failed: {0}")]
    Conversion(String),

    #[error("connection timed out ({0})")]
    Timeout(&'static str),
}

impl From<httparse::Error> for Error {
    fn from(err: httparse::Error) -> Error {
        Error::Parse(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
