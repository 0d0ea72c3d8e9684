//! `StreamingJsonHelper`: an incremental framer that pulls complete
//! top-level JSON values out of an arbitrary byte stream (§4, component
//! 4) — e.g. reading newline-agnostic JSON-RPC requests off a
//! persistent WebSocket or chunked body without buffering the whole
//! connection.
//!
//! This implementation frames top-level objects and arrays, which
//! covers every practical JSON-RPC/REST payload; bare top-level scalars
//! (`42`, `"str"`, `true`) are intentionally out of scope here because
//! their end is only knowable from a following delimiter or EOF, which
//! a generic byte-stream framer can't assume — see DESIGN.md.

#[derive(Debug, Default)]
pub struct StreamingJsonHelper {
    buffer: Vec<u8>,
    scan_pos: usize,
    depth: u32,
    in_string: bool,
    escaped: bool,
    started: bool,
}

impl StreamingJsonHelper {
    pub fn new() -> StreamingJsonHelper {
        StreamingJsonHelper::default()
    }

    /// Feed new bytes in; returns every complete top-level JSON document
    /// found so far, in order. Partial trailing bytes are retained for
    /// the next call.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(data);
        let mut emitted = Vec::new();
        let mut value_start = 0usize;

        while self.scan_pos < self.buffer.len() {
            let b = self.buffer[self.scan_pos];

            if !self.started {
                if b.is_ascii_whitespace() {
                    self.scan_pos += 1;
                    continue;
                }
                if b != b'{' && b != b'[' {
                    // Not an object/array start: drop the byte so a
                    // malformed stream doesn't spin forever.
                    self.scan_pos += 1;
                    continue;
                }
                self.started = true;
                value_start = self.scan_pos;
                self.depth = 1;
                self.scan_pos += 1;
                continue;
            }

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                self.scan_pos += 1;
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' | b'[' => self.depth += 1,
                b'}' | b']' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let doc = self.buffer[value_start..=self.scan_pos].to_vec();
                        emitted.push(doc);
                        self.started = false;
                        self.scan_pos += 1;
                        self.buffer.drain(..self.scan_pos);
                        self.scan_pos = 0;
                        continue;
                    }
                }
                _ => {}
            }
            self.scan_pos += 1;
        }
        emitted
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frames_single_object() {
        let mut helper = StreamingJsonHelper::new();
        let docs = helper.feed(br#"{"a":1}"#);
        assert_eq!(docs, vec![br#"{"a":1}"#.to_vec()]);
    }

    #[test]
    fn frames_across_feed_boundaries() {
        let mut helper = StreamingJsonHelper::new();
        assert!(helper.feed(br#"{"a":"#).is_empty());
        let docs = helper.feed(br#"1}"#);
        assert_eq!(docs, vec![br#"{"a":1}"#.to_vec()]);
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let mut helper = StreamingJsonHelper::new();
        let docs = helper.feed(br#"{"a":"}{"}"#);
        assert_eq!(docs, vec![br#"{"a":"}{"}"#.to_vec()]);
    }

    #[test]
    fn frames_consecutive_values() {
        let mut helper = StreamingJsonHelper::new();
        let docs = helper.feed(br#"{"a":1}[1,2]"#);
        assert_eq!(docs, vec![br#"{"a":1}"#.to_vec(), br#"[1,2]"#.to_vec()]);
    }
}
