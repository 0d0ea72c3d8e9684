//! `RestfulNode` (§4.11.1): pattern-based dispatch on top of the plain
//! routing tree. `{name}` placeholders compile to a regex group anchored
//! against the literal character that follows the closing brace (or
//! `.+` if the placeholder is the last thing in the pattern).

use crate::enums::Verb;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug)]
pub struct CompiledPattern {
    regex: Regex,
    arg_names: Vec<String>,
}

/// Compile a `{name}` pattern into an anchored regex, per §4.11.1.
pub fn compile_pattern(pattern: &str) -> CompiledPattern {
    let mut source = String::from("^");
    let mut arg_names = Vec::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '{' {
            let close = chars[i..].iter().position(|&c| c == '}').map(|p| p + i);
            let Some(close) = close else {
                // Unterminated placeholder: treat the rest as a literal.
                source.push_str(&regex::escape(&chars[i..].iter().collect::<String>()));
                break;
            };
            let name: String = chars[i + 1..close].iter().collect();
            arg_names.push(name);
            match chars.get(close + 1) {
                Some(&boundary) => {
                    source.push_str(&format!("([^{}]+){}", regex::escape(&boundary.to_string()), regex::escape(&boundary.to_string())));
                    i = close + 2;
                }
                None => {
                    source.push_str("(.+)");
                    i = close + 1;
                }
            }
        } else {
            let start = i;
            while i < chars.len() && chars[i] != '{' {
                i += 1;
            }
            source.push_str(&regex::escape(&chars[start..i].iter().collect::<String>()));
        }
    }
    source.push('$');
    CompiledPattern {
        regex: Regex::new(&source).expect("restful pattern compiles to a valid regex"),
        arg_names,
    }
}

struct Registration {
    pattern: CompiledPattern,
    verb: Verb,
    handler: String,
}

/// Pattern registrations in insertion order; dispatch walks them
/// most-to-least-recently inserted (§4.11.1, §9 Open Question).
#[derive(Default)]
pub struct RestfulNode {
    registrations: Vec<Registration>,
}

impl RestfulNode {
    pub fn new() -> RestfulNode {
        RestfulNode::default()
    }

    pub fn register(&mut self, pattern: &str, verb: Verb, handler: impl Into<String>) {
        self.registrations.push(Registration {
            pattern: compile_pattern(pattern),
            verb,
            handler: handler.into(),
        });
    }

    /// First match wins, walking from the most recently registered
    /// pattern backward. Returns the handler id and its captured
    /// arguments keyed by declared name, in declaration order.
    pub fn dispatch(&self, path: &str, verb: Verb) -> Option<(&str, HashMap<String, String>)> {
        for reg in self.registrations.iter().rev() {
            if reg.verb != verb {
                continue;
            }
            if let Some(caps) = reg.pattern.regex.captures(path) {
                let mut args = HashMap::new();
                for (idx, name) in reg.pattern.arg_names.iter().enumerate() {
                    if let Some(m) = caps.get(idx + 1) {
                        args.insert(name.clone(), m.as_str().to_string());
                    }
                }
                return Some((reg.handler.as_str(), args));
            }
        }
        None
    }
}
