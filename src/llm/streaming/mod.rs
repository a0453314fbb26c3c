//! Streaming support for chat-completions responses
//!
//! The response body arrives as byte chunks of `text/event-stream`-style
//! framing; frames may split at arbitrary chunk boundaries. [`SseDecoder`]
//! reassembles complete `data:` payloads, [`ToolCallAssembler`] accumulates
//! partial tool-call fragments keyed by the server-assigned index.

mod assembler;

pub use assembler::ToolCallAssembler;

/// Buffers incoming bytes and extracts complete SSE `data:` payloads.
///
/// Incomplete trailing lines carry over to the next [`push`](Self::push);
/// [`finish`](Self::finish) flushes a final event that arrived without a
/// trailing newline. Decoding is lossy UTF-8 so a bad byte cannot poison the
/// stream.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return the `data:` payloads it completed
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            if let Some(payload) = Self::payload_of(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush payloads still buffered when the stream ends
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        rest.lines().filter_map(Self::payload_of).collect()
    }

    fn payload_of(line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        // Non-`data:` lines (comments, `event:` fields) are skipped.
        line.strip_prefix("data:").map(|p| p.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_event() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"text\":\"hel").is_empty());
        assert_eq!(decoder.push(b"lo\"}\n"), vec!["{\"text\":\"hello\"}"]);
    }

    #[test]
    fn test_multiple_events_in_one_chunk() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\":2}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_done_marker_passes_through() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: [DONE]\n\n");
        assert_eq!(payloads, vec!["[DONE]"]);
    }

    #[test]
    fn test_final_event_without_trailing_newline() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"b\":2}").is_empty());
        assert_eq!(decoder.finish(), vec!["{\"b\":2}"]);
        // Buffer is consumed; a second finish yields nothing.
        assert!(decoder.finish().is_empty());
    }

    #[test]
    fn test_non_data_lines_skipped() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b": keepalive\nevent: message\ndata: {\"x\":1}\n");
        assert_eq!(payloads, vec!["{\"x\":1}"]);
    }

    #[test]
    fn test_invalid_utf8_does_not_abort() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.push(b"data: {\"t\":\"\xFF\"}\n");
        assert_eq!(payloads.len(), 1);
    }

    #[test]
    fn test_split_points_do_not_change_output() {
        let stream = b"data: {\"a\":1}\ndata: {\"b\":2}\n\ndata: {\"c\":3}\n";
        let mut whole = SseDecoder::new();
        let mut expected = whole.push(stream);
        expected.extend(whole.finish());

        for split in 0..stream.len() {
            let mut decoder = SseDecoder::new();
            let mut got = decoder.push(&stream[..split]);
            got.extend(decoder.push(&stream[split..]));
            got.extend(decoder.finish());
            assert_eq!(got, expected, "split at {}", split);
        }
    }
}
