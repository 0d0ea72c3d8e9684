//! `RewriteNode` (§4.11.2): an ordered list of regex rewrite rules with
//! `\0`..`\99` back-references, applied to either the path segment below
//! a node (`RewriteSubpath`) or the whole request path (`RewritePath`).
//! Only the first matching rule applies.

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Match only the path segment(s) below the node's position; on
    /// match, the node re-enters its own `invoke_path` with the
    /// rewritten suffix.
    RewriteSubpath,
    /// Match the whole request path; on match, the server performs a
    /// server-internal redispatch to the rewritten path (no 30x).
    RewritePath,
}

struct Rule {
    regex: Regex,
    replacement: String,
}

#[derive(Default)]
pub struct RewriteNode {
    mode: Option<RewriteMode>,
    rules: Vec<Rule>,
}

impl RewriteNode {
    pub fn new(mode: RewriteMode) -> RewriteNode {
        RewriteNode { mode: Some(mode), rules: Vec::new() }
    }

    pub fn mode(&self) -> RewriteMode {
        self.mode.unwrap_or(RewriteMode::RewriteSubpath)
    }

    /// `pattern` is a plain regex; `replacement` uses `\0`..`\99`
    /// back-references (translated to the `regex` crate's `$N` form).
    pub fn add_rule(&mut self, pattern: &str, replacement: &str) -> Result<(), regex::Error> {
        let regex = Regex::new(pattern)?;
        self.rules.push(Rule { regex, replacement: translate_backrefs(replacement) });
        Ok(())
    }

    /// Apply the first matching rule to `input`; `None` if no rule
    /// matches at all.
    pub fn apply(&self, input: &str) -> Option<String> {
        for rule in &self.rules {
            if rule.regex.is_match(input) {
                return Some(rule.regex.replace(input, rule.replacement.as_str()).into_owned());
            }
        }
        None
    }
}

/// `\0` through `\99` become `$0`..`$99`; a bare `\\` preceding anything
/// else is passed through untouched.
fn translate_backrefs(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit() {
            out.push('$');
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                out.push(chars[i]);
                i += 1;
            }
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn translates_backreferences_to_dollar_form() {
        assert_eq!(translate_backrefs(r"/archive/\1/\2"), "/archive/$1/$2");
        assert_eq!(translate_backrefs(r"\0-suffix"), "$0-suffix");
    }

    #[test]
    fn applies_the_first_matching_rule() {
        let mut node = RewriteNode::new(RewriteMode::RewriteSubpath);
        node.add_rule(r"^old/(\d+)$", r"new/\1").unwrap();
        node.add_rule(r"^.*$", "fallback").unwrap();
        assert_eq!(node.apply("old/42"), Some("new/42".to_string()));
        assert_eq!(node.apply("whatever"), Some("fallback".to_string()));
    }

    #[test]
    fn no_rule_matches_returns_none() {
        let mut node = RewriteNode::new(RewriteMode::RewritePath);
        node.add_rule(r"^/only-this$", "/elsewhere").unwrap();
        assert_eq!(node.apply("/something-else"), None);
    }
}
