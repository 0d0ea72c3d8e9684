//! Small closed enums shared across the crate: HTTP verb, version and
//! status code. Kept dependency-free so the parser and writer modules can
//! use them without pulling in I/O types.

mod verb;
mod version;
mod status;

pub use self::verb::Verb;
pub use self::version::Version;
pub use self::status::Status;
