//! Minimal `text/event-stream` parser for the relay's own events.
//!
//! Only `id:` and `data:` matter; `event:`, `retry:` and comments are
//! skipped. Input arrives in arbitrary chunks, so partial lines are buffered
//! until their newline shows up.

/// One dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    line: String,
    id: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completed.
    pub fn feed(&mut self, chunk: &str) -> Vec<SseEvent> {
        let mut out = Vec::new();
        self.line.push_str(chunk);
        while let Some(pos) = self.line.find('\n') {
            let mut line: String = self.line.drain(..=pos).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(&line) {
                out.push(event);
            }
        }
        out
    }

    /// Feed raw bytes. A UTF-8 sequence split across chunks is held back
    /// until the rest arrives.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);
        let valid = match std::str::from_utf8(&self.pending) {
            Ok(s) => s.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            // Invalid bytes, not just truncated: replace them and move on.
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                return self.feed(&text);
            }
        };
        let rest = self.pending.split_off(valid);
        let head = std::mem::replace(&mut self.pending, rest);
        match String::from_utf8(head) {
            Ok(text) => self.feed(&text),
            Err(_) => Vec::new(),
        }
    }

    /// Flush whatever is pending at end of stream.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.line);
        let rest = rest.trim_end_matches('\r');
        if !rest.is_empty() {
            // A dangling line cannot itself dispatch: it is never blank.
            let _ = self.process_line(rest);
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        let line = line.trim();
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("id:") {
            self.id = Some(value.trim().to_owned());
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data.push(value.trim().to_owned());
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { id, data })
    }
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;
