//! Line assembly and event parsing for the agent stdout stream.
//!
//! Stdout arrives in arbitrary chunks; a JSON event may span chunk
//! boundaries. [`LineBuffer`] reassembles complete newline-terminated
//! lines across chunks. A trailing line that never receives its newline
//! before stream end is dropped, not parsed.

use crate::event::AgentEvent;

/// Accumulates stdout chunks and yields complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line completed by it, in order.
    ///
    /// The partial tail after the last newline is retained for the next
    /// chunk. Returned lines do not include the newline.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let rest = self.buf.split_off(pos.saturating_add(1));
            let mut line = std::mem::replace(&mut self.buf, rest);
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Bytes currently held without a terminating newline.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// Parse one complete line into an event.
///
/// Empty (after trim) and malformed lines yield `None`; malformed JSON is
/// never fatal to the stream.
#[must_use]
pub fn parse_line(line: &str) -> Option<AgentEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<AgentEvent>(trimmed) {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::debug!(%err, "dropping malformed stream line");
            None
        },
    }
}
