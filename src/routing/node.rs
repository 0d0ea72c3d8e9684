//! `HttpNode`: the static part of the routing tree (§4.11) — named
//! children, named slots, and an optional static-resource root.

use crate::enums::Verb;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// How a node's static root maps request path segments to files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticMode {
    /// The node's static root mirrors the request path below it,
    /// including further subdirectories.
    Nested,
    /// Only a single remaining segment is accepted; deeper paths 404.
    Flat,
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub allowed_verbs: Vec<Verb>,
    pub force_encrypted: bool,
    pub wait_for_body: bool,
    pub max_body_length: u64,
}

impl Slot {
    pub fn new(allowed_verbs: Vec<Verb>) -> Slot {
        Slot {
            allowed_verbs,
            force_encrypted: false,
            wait_for_body: false,
            max_body_length: 4 * 1024 * 1024,
        }
    }
}

/// Outcome of walking the tree for one request (§4.11 steps 1-5 plus
/// slot invocation rules).
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Slot { name: String },
    StaticFile { path: PathBuf },
    RedirectSecure,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RangeNotSatisfiable,
}

/// A node's access guard: given the remaining path parts and the
/// current index into them, decide whether the client may proceed.
/// Kept as a plain closure (not threaded through a `Request`) so the
/// routing tree has no dependency on `client::Request`.
pub type AccessPolicy = Arc<dyn Fn(&[&str], usize) -> bool + Send + Sync>;

/// Given a resolved static-file path and the requested `(start, end)`
/// range, decide whether that range is satisfiable against the file's
/// actual length. A plain closure for the same reason as
/// `AccessPolicy`: routing has no filesystem access of its own, the
/// embedder supplies the stat.
pub type RangePolicy = Arc<dyn Fn(&std::path::Path, u64, u64) -> bool + Send + Sync>;

#[derive(Default)]
pub struct HttpNode {
    children: HashMap<String, HttpNode>,
    slots: HashMap<String, Slot>,
    static_root: Option<PathBuf>,
    static_mode: StaticMode,
    access_policy: Option<AccessPolicy>,
    range_policy: Option<RangePolicy>,
}

impl Default for StaticMode {
    fn default() -> StaticMode {
        StaticMode::Nested
    }
}

impl HttpNode {
    pub fn new() -> HttpNode {
        HttpNode::default()
    }

    pub fn add_child(&mut self, name: impl Into<String>, child: HttpNode) {
        self.children.insert(name.into(), child);
    }

    pub fn add_slot(&mut self, name: impl Into<String>, slot: Slot) {
        self.slots.insert(name.into(), slot);
    }

    pub fn set_static_root(&mut self, root: PathBuf, mode: StaticMode) {
        self.static_root = Some(root);
        self.static_mode = mode;
    }

    pub fn set_access_policy(&mut self, policy: AccessPolicy) {
        self.access_policy = Some(policy);
    }

    pub fn set_range_policy(&mut self, policy: RangePolicy) {
        self.range_policy = Some(policy);
    }

    /// §4.11 `invoke_path`. `range` is the requested `(start, end)` from
    /// a parsed `Range` header, if any; it only matters for static
    /// resources.
    pub fn invoke_path(
        &self,
        parts: &[&str],
        index: usize,
        verb: Verb,
        secure: bool,
        range: Option<(u64, u64)>,
    ) -> Resolution {
        if let Some(policy) = &self.access_policy {
            if !policy(parts, index) {
                return Resolution::Forbidden;
            }
        }

        if index == parts.len() {
            if let Some(slot) = self.slots.get("index") {
                return resolve_slot("index", slot, verb, secure);
            }
            return self.static_resource(&["index.html"], verb, range);
        }

        let cur = parts[index];
        if let Some(child) = self.children.get(cur) {
            return child.invoke_path(parts, index + 1, verb, secure, range);
        }

        if index == parts.len() - 1 {
            if let Some(slot) = self.slots.get(cur) {
                return resolve_slot(cur, slot, verb, secure);
            }
        }

        self.static_resource(&parts[index..], verb, range)
    }

    /// §4.11 "Static resource": GET only (else 405), reject `.`/`..`
    /// segments, honor `Flat` mode, and reject a requested range the
    /// configured `range_policy` reports as unsatisfiable (else 416).
    fn static_resource(&self, remaining: &[&str], verb: Verb, range: Option<(u64, u64)>) -> Resolution {
        let Some(root) = &self.static_root else {
            return Resolution::NotFound;
        };
        if verb != Verb::Get {
            return Resolution::MethodNotAllowed;
        }
        if remaining.iter().any(|seg| *seg == "." || *seg == "..") {
            return Resolution::NotFound;
        }
        if self.static_mode == StaticMode::Flat && remaining.len() > 1 {
            return Resolution::NotFound;
        }
        let mut path = root.clone();
        for seg in remaining {
            path.push(seg);
        }
        if let (Some((start, end)), Some(policy)) = (range, &self.range_policy) {
            if !policy(&path, start, end) {
                return Resolution::RangeNotSatisfiable;
            }
        }
        Resolution::StaticFile { path }
    }
}

fn resolve_slot(name: &str, slot: &Slot, verb: Verb, secure: bool) -> Resolution {
    if !slot.allowed_verbs.contains(&verb) {
        return Resolution::MethodNotAllowed;
    }
    if slot.force_encrypted && !secure {
        return Resolution::RedirectSecure;
    }
    Resolution::Slot { name: name.to_string() }
}
