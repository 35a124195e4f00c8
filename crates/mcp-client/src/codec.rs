//! `Content-Length` framing codec for the stdio wire format.
//!
//! Each message on the wire is an ASCII header line, a blank-line
//! separator, then exactly that many bytes of UTF-8 JSON:
//!
//! ```text
//! Content-Length: 47\r\n
//! \r\n
//! {"jsonrpc":"2.0","id":1,"method":"tools/list"}
//! ```
//!
//! The decoder accumulates bytes across calls, so input may arrive in
//! arbitrary chunk sizes: mid-message splits, several messages per chunk,
//! or partial headers.

use serde_json::Value;

const SEPARATOR: &[u8] = b"\r\n\r\n";

/// Errors produced while decoding a framed byte stream.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// The bytes before the blank-line separator carried no usable
    /// `Content-Length` header. There is no marker to resynchronize on,
    /// so the whole buffer is discarded.
    #[error("missing or malformed Content-Length header")]
    BadHeader,
}

/// Incremental encoder/decoder for `Content-Length`-framed JSON payloads.
///
/// One instance is owned by exactly one transport; the internal buffer is
/// never shared.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buf: Vec<u8>,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode one payload as a length-prefixed frame.
    ///
    /// The declared length is the payload's UTF-8 *byte* length, not its
    /// character count. No trailing separator is emitted.
    pub fn encode(payload: &Value) -> Result<Vec<u8>, serde_json::Error> {
        let body = serde_json::to_vec(payload)?;
        let mut frame = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Append raw bytes read from the stream.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Pull the next complete payload out of the buffer.
    ///
    /// Returns `Ok(None)` when the buffered bytes do not yet hold a full
    /// frame (partial header or partial body). A frame whose body is not
    /// valid JSON is logged and skipped. A malformed header discards the
    /// entire buffer and yields [`FramingError::BadHeader`]; decoding
    /// cannot continue past that point.
    pub fn next(&mut self) -> Result<Option<Value>, FramingError> {
        loop {
            let Some(header_end) = find_separator(&self.buf) else {
                return Ok(None);
            };

            let Some(len) = content_length(&self.buf[..header_end]) else {
                self.buf.clear();
                return Err(FramingError::BadHeader);
            };

            let body_start = header_end + SEPARATOR.len();
            // A length too large to even address is as unrecoverable as a
            // non-numeric one.
            let Some(frame_end) = body_start.checked_add(len) else {
                self.buf.clear();
                return Err(FramingError::BadHeader);
            };
            if self.buf.len() < frame_end {
                return Ok(None);
            }

            let parsed = serde_json::from_slice(&self.buf[body_start..frame_end]);
            self.buf.drain(..frame_end);

            match parsed {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping frame with invalid JSON payload");
                    continue;
                }
            }
        }
    }

    /// Number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn find_separator(buf: &[u8]) -> Option<usize> {
    buf.windows(SEPARATOR.len()).position(|w| w == SEPARATOR)
}

/// Extract the `Content-Length` value from the header region,
/// case-insensitively. Other headers are ignored.
fn content_length(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    for line in text.split("\r\n") {
        let (name, value) = match line.split_once(':') {
            Some(pair) => pair,
            None => continue,
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse().ok();
        }
    }
    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drain(codec: &mut FrameCodec) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(value) = codec.next().unwrap() {
            out.push(value);
        }
        out
    }

    #[test]
    fn roundtrip_single_message() {
        let payload = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": {}});
        let frame = FrameCodec::encode(&payload).unwrap();

        let mut codec = FrameCodec::new();
        codec.extend(&frame);
        assert_eq!(drain(&mut codec), vec![payload]);
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn declared_length_is_byte_length_not_char_length() {
        let payload = json!({"result": "héllo wörld ✓"});
        let frame = FrameCodec::encode(&payload).unwrap();

        let header_end = find_separator(&frame).unwrap();
        let declared = content_length(&frame[..header_end]).unwrap();
        let body = &frame[header_end + 4..];
        assert_eq!(declared, body.len());
        assert!(declared > std::str::from_utf8(body).unwrap().chars().count());

        let mut codec = FrameCodec::new();
        codec.extend(&frame);
        assert_eq!(drain(&mut codec), vec![payload]);
    }

    #[test]
    fn split_at_every_byte_boundary() {
        let payload = json!({"id": 7, "result": {"text": "héllo ✓"}});
        let frame = FrameCodec::encode(&payload).unwrap();

        for split in 0..=frame.len() {
            let mut codec = FrameCodec::new();
            codec.extend(&frame[..split]);
            let mut got = drain(&mut codec);
            codec.extend(&frame[split..]);
            got.extend(drain(&mut codec));

            assert_eq!(got, vec![payload.clone()], "failed at split {split}");
            assert_eq!(codec.buffered(), 0);
        }
    }

    #[test]
    fn fed_byte_by_byte() {
        let payload = json!({"id": 1, "result": "✓"});
        let frame = FrameCodec::encode(&payload).unwrap();

        let mut codec = FrameCodec::new();
        let mut got = Vec::new();
        for byte in frame {
            codec.extend(&[byte]);
            got.extend(drain(&mut codec));
        }
        assert_eq!(got, vec![payload]);
    }

    #[test]
    fn two_frames_in_one_chunk() {
        let first = json!({"id": 1, "result": "a"});
        let second = json!({"id": 2, "result": "b"});
        let mut chunk = FrameCodec::encode(&first).unwrap();
        chunk.extend(FrameCodec::encode(&second).unwrap());

        let mut codec = FrameCodec::new();
        codec.extend(&chunk);
        assert_eq!(drain(&mut codec), vec![first, second]);
    }

    #[test]
    fn header_name_is_case_insensitive() {
        let mut codec = FrameCodec::new();
        codec.extend(b"content-LENGTH: 2\r\n\r\n{}");
        assert_eq!(codec.next().unwrap(), Some(json!({})));
    }

    #[test]
    fn extra_headers_are_ignored() {
        let mut codec = FrameCodec::new();
        codec.extend(b"Content-Type: application/json\r\nContent-Length: 2\r\n\r\n{}");
        assert_eq!(codec.next().unwrap(), Some(json!({})));
    }

    #[test]
    fn non_numeric_length_discards_buffer() {
        let mut codec = FrameCodec::new();
        codec.extend(b"Content-Length: banana\r\n\r\n{}");
        assert!(matches!(codec.next(), Err(FramingError::BadHeader)));
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn unaddressable_length_discards_buffer() {
        // usize::MAX parses as a number but can never describe a real body;
        // it must fail the stream, not wrap around the bounds check.
        let mut codec = FrameCodec::new();
        codec.extend(b"Content-Length: 18446744073709551615\r\n\r\n{}");
        assert!(matches!(codec.next(), Err(FramingError::BadHeader)));
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn missing_length_header_discards_buffer() {
        let mut codec = FrameCodec::new();
        codec.extend(b"X-Nonsense: 12\r\n\r\n{}tail bytes");
        assert!(matches!(codec.next(), Err(FramingError::BadHeader)));
        assert_eq!(codec.buffered(), 0);
    }

    #[test]
    fn invalid_json_payload_is_skipped() {
        let good = json!({"id": 2, "result": "ok"});
        let mut chunk = b"Content-Length: 9\r\n\r\nnot json!".to_vec();
        chunk.extend(FrameCodec::encode(&good).unwrap());

        let mut codec = FrameCodec::new();
        codec.extend(&chunk);
        assert_eq!(drain(&mut codec), vec![good]);
    }

    #[test]
    fn partial_header_waits_for_more_data() {
        let mut codec = FrameCodec::new();
        codec.extend(b"Content-Len");
        assert_eq!(codec.next().unwrap(), None);
        codec.extend(b"gth: 2\r\n\r\n{}");
        assert_eq!(codec.next().unwrap(), Some(json!({})));
    }
}
