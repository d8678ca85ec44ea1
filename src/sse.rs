//! Incremental Server-Sent-Events framing.
//!
//! The backend emits `data: <payload>\n\n` frames over long-lived responses.
//! Chunks arrive with arbitrary boundaries, so the decoder buffers bytes and
//! yields complete events as they close. Payload interpretation is left to
//! the channel: chat and ingest events are JSON, job log lines are plain
//! text.

use serde::de::DeserializeOwned;

/// One complete SSE event: all `data:` lines joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub data: String,
}

impl SseFrame {
    /// Parse the payload as JSON. Malformed frames are the caller's cue to
    /// skip the event, never to tear the stream down.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and collect every event that completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, skip)) = find_event_boundary(&self.buffer) {
            let raw: Vec<u8> = self.buffer.drain(..end + skip).collect();
            if let Some(frame) = parse_event(&raw[..end]) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Drain whatever is left when the stream closes. A trailing partial
    /// event with data lines is surfaced; pure whitespace is not.
    pub fn flush(&mut self) -> Option<SseFrame> {
        let raw = std::mem::take(&mut self.buffer);
        parse_event(&raw)
    }
}

/// Locate the first blank line. Returns the event length and the separator
/// width, tolerating both `\n\n` and CRLF framing.
fn find_event_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let mut index = 0;
    while index < buffer.len() {
        if buffer[index] != b'\n' {
            index += 1;
            continue;
        }
        match buffer.get(index + 1) {
            Some(b'\n') => return Some((index, 2)),
            Some(b'\r') if buffer.get(index + 2) == Some(&b'\n') => return Some((index, 3)),
            _ => index += 1,
        }
    }
    None
}

fn parse_event(raw: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(raw);
    let mut data_lines = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        data: data_lines.join("\n"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn decodes_single_event() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: {\"type\":\"done\"}\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "{\"type\":\"done\"}");
    }

    #[test]
    fn tolerates_arbitrary_chunk_boundaries() {
        let wire = b"data: {\"type\":\"token\",\"text\":\"he\"}\n\ndata: {\"type\":\"token\",\"text\":\"llo\"}\n\n";
        for chunk_size in 1..wire.len() {
            let mut decoder = SseDecoder::new();
            let mut frames = Vec::new();
            for chunk in wire.chunks(chunk_size) {
                frames.extend(decoder.feed(chunk));
            }
            assert_eq!(frames.len(), 2, "chunk size {chunk_size}");
            assert!(frames[0].data.contains("he"));
            assert!(frames[1].data.contains("llo"));
        }
    }

    #[test]
    fn joins_multiple_data_lines_with_newline() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "first\nsecond");
    }

    #[test]
    fn handles_crlf_framing() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: line\r\n\r\ndata: next\r\n\r\n");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "line");
        assert_eq!(frames[1].data, "next");
    }

    #[test]
    fn ignores_comments_and_foreign_fields() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b": keepalive\nevent: log\nid: 4\ndata: payload\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "payload");
    }

    #[test]
    fn events_arrive_in_order() {
        let mut decoder = SseDecoder::new();
        let mut frames = decoder.feed(b"data: 1\n\ndata: 2\n\nda");
        frames.extend(decoder.feed(b"ta: 3\n\n"));
        let order: Vec<&str> = frames.iter().map(|f| f.data.as_str()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
    }

    #[test]
    fn malformed_json_is_a_recoverable_parse_error() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: {not json\n\ndata: {\"ok\":true}\n\n");
        assert_eq!(frames.len(), 2);
        assert!(frames[0].json::<Value>().is_err());
        assert!(frames[1].json::<Value>().is_ok());
    }

    #[test]
    fn flush_surfaces_trailing_partial_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        let frame = decoder.flush().unwrap();
        assert_eq!(frame.data, "tail");
        assert!(decoder.flush().is_none());
    }

    #[test]
    fn plain_text_log_lines_pass_through_verbatim() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.feed(b"data: Crawl job complete.\n\n");
        assert_eq!(frames[0].data, "Crawl job complete.");
    }
}
