//! Hierarchical routing tree (§4.11): a plain node tree for static
//! resources and named slots, a `RestfulNode` overlay for pattern-based
//! dispatch, and a `RewriteNode` overlay for path rewriting.

pub mod node;
pub mod restful;
pub mod rewrite;

pub use node::{HttpNode, Resolution, Slot, StaticMode};
pub use restful::RestfulNode;
pub use rewrite::{RewriteMode, RewriteNode};

/// Split a request path on `/`, dropping empty segments (leading slash,
/// trailing slash, `//`), the way `Server::invoke_by_path` does before
/// handing the parts to the root node (§4.12).
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn splits_and_drops_empty_segments() {
        assert_eq!(split_path("/a//b/"), vec!["a", "b"]);
        assert_eq!(split_path("/"), Vec::<&str>::new());
        assert_eq!(split_path(""), Vec::<&str>::new());
    }
}
