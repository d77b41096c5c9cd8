//! Incremental parser for the text/event-stream wire format.
//!
//! Only the `data` field matters to this layer; `event`, `id`, `retry` and
//! comment lines are accepted and ignored. An event is complete at the first
//! empty line, and multi-line data joins with `\n` per the SSE format.

/// Accumulates raw transport chunks and yields complete event payloads.
///
/// Chunks may split lines (and UTF-8 sequences) at arbitrary byte
/// boundaries; bytes are only decoded once a full line is buffered.
#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk; returns the data payloads of any events the
    /// chunk completed, in arrival order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // trailing \n
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(payload) = self.take_line(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Process one complete line, returning a payload if it ends an event.
    fn take_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            if self.data_lines.is_empty() {
                return None;
            }
            return Some(self.data_lines.drain(..).collect::<Vec<_>>().join("\n"));
        }

        let line = String::from_utf8_lossy(line);
        if let Some(value) = line.strip_prefix("data:") {
            // A single leading space after the colon is part of the framing
            self.data_lines
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comments (leading ':') and other fields are ignored
        None
    }
}
