//! Frame splitting for SSE-style byte streams.

/// Frame delimiter after CRLF normalization.
const FRAME_DELIMITER: &str = "\n\n";

/// Prefix of lines that carry a payload.
const DATA_PREFIX: &str = "data:";

/// Incremental decoder that turns raw response bytes into complete frames.
///
/// Bytes are decoded as UTF-8 across chunk boundaries, so a multi-byte
/// character split between two reads is reassembled instead of being replaced
/// with U+FFFD. Invalid sequences are replaced.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    undecoded: Vec<u8>,
    text: String,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers `chunk` and returns every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.undecoded.extend_from_slice(chunk);
        self.decode_available();
        self.drain_frames()
    }

    /// Returns the trailing unterminated frame once the byte stream ended.
    pub fn finish(mut self) -> Option<String> {
        if !self.undecoded.is_empty() {
            let rest = std::mem::take(&mut self.undecoded);
            self.text.push_str(&String::from_utf8_lossy(&rest));
        }
        normalize_line_endings(&mut self.text);
        let frame = self.text.trim_end_matches('\n');
        (!frame.trim().is_empty()).then(|| frame.to_string())
    }

    fn decode_available(&mut self) {
        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(text) => {
                    self.text.push_str(text);
                    self.undecoded.clear();
                    return;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.undecoded[..valid]));
                    match err.error_len() {
                        // Incomplete sequence at the end: wait for more bytes.
                        None => {
                            self.undecoded.drain(..valid);
                            return;
                        }
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid + len);
                        }
                    }
                }
            }
        }
    }

    fn drain_frames(&mut self) -> Vec<String> {
        normalize_line_endings(&mut self.text);

        let mut frames = Vec::new();
        while let Some(pos) = self.text.find(FRAME_DELIMITER) {
            let frame: String = self.text.drain(..pos + FRAME_DELIMITER.len()).collect();
            let frame = &frame[..pos];
            if !frame.trim().is_empty() {
                frames.push(frame.to_string());
            }
        }
        frames
    }
}

/// A trailing `\r` is left alone until the next chunk shows whether a `\n`
/// follows it.
fn normalize_line_endings(text: &mut String) {
    if text.contains("\r\n") {
        *text = text.replace("\r\n", "\n");
    }
}

/// Yields the trimmed payload of every `data:` line in a frame.
pub fn frame_payloads(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_splits_on_blank_line() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: one\n\ndata: two\n\ndata: thr");
        assert_eq!(frames, vec!["data: one", "data: two"]);

        let frames = decoder.push(b"ee\n\n");
        assert_eq!(frames, vec!["data: three"]);
    }

    #[test]
    fn test_delimiter_split_across_chunks() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(b"data: a\n").is_empty());
        assert_eq!(decoder.push(b"\ndata: b"), vec!["data: a"]);
        assert_eq!(decoder.finish().as_deref(), Some("data: b"));
    }

    #[test]
    fn test_crlf_frames() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: a\r\n\r");
        assert!(frames.is_empty());
        let frames = decoder.push(b"\ndata: b\r\n\r\n");
        assert_eq!(frames, vec!["data: a", "data: b"]);
    }

    #[test]
    fn test_utf8_split_across_chunks() {
        let bytes = "data: Hello 👋\n\n".as_bytes();
        let emoji_start = bytes
            .windows(4)
            .position(|w| w == [0xF0, 0x9F, 0x91, 0x8B])
            .expect("emoji not found");

        let mut decoder = FrameDecoder::new();
        assert!(decoder.push(&bytes[..emoji_start + 2]).is_empty());
        let frames = decoder.push(&bytes[emoji_start + 2..]);
        assert_eq!(frames, vec!["data: Hello 👋"]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut decoder = FrameDecoder::new();
        let frames = decoder.push(b"data: a\xFFb\n\n");
        assert_eq!(frames, vec!["data: a\u{FFFD}b"]);
    }

    #[test]
    fn test_finish_ignores_blank_remainder() {
        let mut decoder = FrameDecoder::new();
        decoder.push(b"data: a\n\n\n");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_frame_payloads_only_reads_data_lines() {
        let frame = ": keep-alive\nevent: message\ndata:  {\"chunk\":\"x\"}  \nid: 7\ndata:[DONE]";
        let payloads: Vec<&str> = frame_payloads(frame).collect();
        assert_eq!(payloads, vec!["{\"chunk\":\"x\"}", "[DONE]"]);
    }
}
