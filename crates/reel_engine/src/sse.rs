//! Incremental decoder for `text/event-stream` bodies.
//!
//! Only the `data` field matters for progress messages; `event`, `id`,
//! `retry` and comment lines are skipped. Multiple `data` lines in one event
//! are joined with `\n`, and an event is dispatched on the blank line that
//! ends it.

use reel_logging::reel_warn;

/// Longest line kept while waiting for its newline. Progress messages are a
/// few hundred bytes; anything past this is dropped up to the next newline.
const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    data: Vec<String>,
    has_data: bool,
    overflowed: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of the body and returns the data payloads of every
    /// event completed by it. Chunks may split lines anywhere.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut dispatched = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if std::mem::take(&mut self.overflowed) {
                    continue;
                }
                if self.line.last() == Some(&b'\r') {
                    self.line.pop();
                }
                let line = std::mem::take(&mut self.line);
                if let Some(payload) = self.process_line(&line) {
                    dispatched.push(payload);
                }
            } else if self.overflowed {
                continue;
            } else if self.line.len() >= MAX_LINE_BYTES {
                reel_warn!("Dropping progress stream line longer than {} bytes", MAX_LINE_BYTES);
                self.line = Vec::new();
                self.overflowed = true;
            } else {
                self.line.push(byte);
            }
        }
        dispatched
    }

    fn process_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line[0] == b':' {
            return None;
        }

        let text = String::from_utf8_lossy(line);
        let (field, value) = match text.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (text.as_ref(), ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
            self.has_data = true;
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if !std::mem::take(&mut self.has_data) {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}
