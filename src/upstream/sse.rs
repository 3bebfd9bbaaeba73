//! SSE byte-stream decoding.
//!
//! Provides [`SseDecoder`] for line-buffered extraction of `data:` payloads
//! from a server-sent-event byte stream. Handles TCP chunk boundary
//! reassembly correctly: a `data:` line split across two network chunks is
//! emitted once, whole, when its terminating newline arrives.

/// Cap on buffered bytes for a single line. A line that grows past this
/// without a newline is discarded so a misbehaving upstream cannot grow the
/// buffer without bound.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Incremental SSE decoder.
///
/// Feed raw network chunks with [`feed`](Self::feed); each call returns the
/// `data:` payloads whose lines completed within that chunk, in order.
/// Non-`data:` fields (`event:`, `id:`, `retry:`, comments) are skipped.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Process a chunk of bytes, returning completed `data:` payloads in order.
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line[..line.len() - 1]) {
                payloads.push(payload);
            }
        }

        if self.buffer.len() > MAX_LINE_BYTES {
            tracing::warn!(
                buffered = self.buffer.len(),
                "Discarding oversized SSE line without newline"
            );
            self.buffer.clear();
        }

        payloads
    }

    /// Flush any trailing line that arrived without a final newline.
    pub(crate) fn finish(mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

/// Extract the payload of a `data:` line, tolerating `\r` endings and a
/// missing space after the colon. Returns None for every other field.
fn data_payload(line: &[u8]) -> Option<String> {
    let line = std::str::from_utf8(line).ok()?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest).to_string())
}
