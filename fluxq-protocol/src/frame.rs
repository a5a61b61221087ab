//! Text frame format for the fluxq wire protocol.
//!
//! A frame is an HTTP/1.1-shaped message:
//!
//! ```text
//! METHOD URL HTTP/1.1\r\n        start line (request)
//! HTTP/1.1 CODE TEXT\r\n         start line (response)
//! key: value\r\n                 header lines, keys lowercased
//! content-length: N\r\n          always derived from the body
//! \r\n
//! <N body bytes>
//! ```
//!
//! `content-length` is authoritative: it is computed from the body at
//! encode time, never taken from caller-supplied headers, and consumed
//! (not surfaced) at decode time.

use crate::error::ProtocolError;
use crate::headers::CONTENT_LENGTH;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;

/// Blank line separating the header block from the body.
const TERMINATOR: &[u8] = b"\r\n\r\n";

/// Returns the reason phrase for a status code.
///
/// Codes outside the known set map to `"Unknown Status"`.
pub fn status_text(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}

/// One wire message, request or response.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Response status; `None` marks a request.
    pub status: Option<u16>,
    /// Request method.
    pub method: String,
    /// Request url.
    pub url: String,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            status: None,
            method: "GET".to_string(),
            url: "/".to_string(),
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }
}

impl Frame {
    /// Creates an empty request frame (`GET /`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a response frame with the given status.
    pub fn response(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Looks up a header value. Keys are case-insensitive.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Sets a header, lowercasing the key.
    ///
    /// An empty value is silently dropped; every typed setter built on
    /// this inherits that behavior.
    pub fn set_header(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        self.headers.insert(key.to_ascii_lowercase(), value.to_string());
    }

    /// Sets a header only when it is not present yet.
    pub fn set_header_if_none(&mut self, key: &str, value: &str) {
        if self.header(key).is_none() {
            self.set_header(key, value);
        }
    }

    /// All headers, keyed by lowercased name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The frame body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Replaces the body with a string.
    pub fn set_body_str(&mut self, body: &str) {
        self.body = Bytes::copy_from_slice(body.as_bytes());
    }

    /// Serializes `value` as the JSON body and tags the content type.
    pub fn set_json_body<T: serde::Serialize>(&mut self, value: &T) -> Result<(), ProtocolError> {
        self.body = Bytes::from(serde_json::to_vec(value)?);
        self.set_header(crate::headers::CONTENT_TYPE, "application/json");
        Ok(())
    }

    /// Encodes the frame into bytes.
    ///
    /// Any caller-supplied `content-length` header is skipped; the true
    /// one is derived from the body and appended last.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.body.len() + 256);

        match self.status {
            Some(code) => {
                buf.put_slice(format!("HTTP/1.1 {} {}\r\n", code, status_text(code)).as_bytes());
            }
            None => {
                buf.put_slice(format!("{} {} HTTP/1.1\r\n", self.method, self.url).as_bytes());
            }
        }

        for (key, value) in &self.headers {
            if key == CONTENT_LENGTH {
                continue;
            }
            buf.put_slice(format!("{}: {}\r\n", key, value).as_bytes());
        }
        buf.put_slice(format!("content-length: {}\r\n", self.body.len()).as_bytes());

        buf.put_slice(b"\r\n");
        buf.put_slice(&self.body);
        buf
    }

    /// Decodes one frame from the buffer.
    ///
    /// Returns `Ok(None)` when the terminator has not arrived or the body
    /// is still short, leaving the buffer untouched. On success exactly
    /// one frame's span is consumed; callers loop until `None` to drain
    /// pipelined frames.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        let idx = match find_terminator(buf) {
            Some(idx) => idx,
            None => return Ok(None),
        };

        let head = std::str::from_utf8(&buf[..idx]).map_err(|_| ProtocolError::InvalidUtf8)?;
        let mut lines = head.split("\r\n");

        let start = lines.next().unwrap_or_default();
        let mut tokens = start.split_whitespace();
        let (first, second) = match (tokens.next(), tokens.next()) {
            (Some(first), Some(second)) => (first, second),
            _ => return Err(ProtocolError::MalformedStartLine(start.to_string())),
        };

        let mut frame = Frame::new();
        if first.to_ascii_uppercase().starts_with("HTTP") {
            // An unparsable or zero status token degrades to request
            // semantics, matching the protocol's lenient posture.
            frame.status = match second.parse::<u16>() {
                Ok(0) | Err(_) => None,
                Ok(code) => Some(code),
            };
        } else {
            frame.method = first.to_string();
            frame.url = second.to_string();
        }

        let mut body_len = 0usize;
        for line in lines {
            // Split on the first colon only; values may contain colons.
            let colon = match line.find(':') {
                Some(colon) => colon,
                None => continue,
            };
            let key = line[..colon].trim().to_ascii_lowercase();
            let value = line[colon + 1..].trim();
            if key == CONTENT_LENGTH {
                body_len = value.parse().unwrap_or(0);
            } else {
                frame.headers.insert(key, value.to_string());
            }
        }

        let total = idx + TERMINATOR.len() + body_len;
        if buf.len() < total {
            return Ok(None);
        }

        buf.advance(idx + TERMINATOR.len());
        frame.body = buf.split_to(body_len).freeze();
        Ok(Some(frame))
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(TERMINATOR.len()).position(|w| w == TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decode_all(mut buf: BytesMut) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Some(frame) = Frame::decode(&mut buf).unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn test_request_exact_bytes() {
        let mut frame = Frame::new();
        frame.set_header("tag", "x");

        let encoded = frame.encode();
        assert_eq!(&encoded[..], b"GET / HTTP/1.1\r\ntag: x\r\ncontent-length: 0\r\n\r\n");
    }

    #[test]
    fn test_request_roundtrip() {
        let mut frame = Frame::new();
        frame.method = "POST".to_string();
        frame.url = "/produce".to_string();
        frame.set_header("topic", "orders");
        frame.set_body_str("payload");

        let mut buf = frame.encode();
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded.status, None);
        assert_eq!(decoded.method, "POST");
        assert_eq!(decoded.url, "/produce");
        assert_eq!(decoded.header("topic"), Some("orders"));
        assert_eq!(decoded.body(), b"payload");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_response_roundtrip() {
        let mut frame = Frame::response(404);
        frame.set_body_str("no such topic");

        let mut buf = frame.encode();
        assert!(buf.starts_with(b"HTTP/1.1 404 Not Found\r\n"));

        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.status, Some(404));
        assert_eq!(decoded.body(), b"no such topic");
    }

    #[test]
    fn test_content_length_never_overridden() {
        let mut frame = Frame::new();
        frame.set_header("content-length", "999");
        frame.set_header("Content-Length", "12345");
        frame.set_body_str("hi");

        let encoded = frame.encode();
        let text = std::str::from_utf8(&encoded).unwrap();
        assert!(text.contains("content-length: 2\r\n"));
        assert!(!text.contains("999"));
        assert!(!text.contains("12345"));
    }

    #[test]
    fn test_decode_does_not_surface_content_length() {
        let mut frame = Frame::new();
        frame.set_body_str("abc");

        let mut buf = frame.encode();
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert!(decoded.header("content-length").is_none());
        assert_eq!(decoded.body(), b"abc");
    }

    #[test]
    fn test_incomplete_until_terminator_and_body() {
        let mut frame = Frame::new();
        frame.set_header("tag", "t");
        frame.set_body_str("0123456789");
        let encoded = frame.encode();

        let mut buf = BytesMut::new();
        for (i, byte) in encoded.iter().enumerate() {
            buf.put_u8(*byte);
            if i + 1 < encoded.len() {
                let before = buf.len();
                assert!(Frame::decode(&mut buf).unwrap().is_none(), "complete at byte {}", i);
                assert_eq!(buf.len(), before, "partial decode consumed bytes");
            }
        }

        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.header("tag"), Some("t"));
        assert_eq!(decoded.body(), b"0123456789");
    }

    #[test]
    fn test_pipelined_frames_decode_in_order() {
        let mut first = Frame::new();
        first.set_header("id", "1");
        first.set_body_str("one");
        let mut second = Frame::response(200);
        second.set_header("id", "2");
        second.set_body_str("two");

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first.encode());
        buf.extend_from_slice(&second.encode());

        let frames = decode_all(buf);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].header("id"), Some("1"));
        assert_eq!(frames[0].body(), b"one");
        assert_eq!(frames[1].status, Some(200));
        assert_eq!(frames[1].header("id"), Some("2"));
        assert_eq!(frames[1].body(), b"two");
    }

    #[test]
    fn test_header_value_keeps_colons() {
        let mut buf = BytesMut::from(
            &b"GET / HTTP/1.1\r\norigin_url: http://broker:8080/path\r\ncontent-length: 0\r\n\r\n"[..],
        );
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.header("origin_url"), Some("http://broker:8080/path"));
    }

    #[test]
    fn test_header_keys_case_insensitive() {
        let mut buf =
            BytesMut::from(&b"GET / HTTP/1.1\r\nTopic:  Orders \r\ncontent-length: 0\r\n\r\n"[..]);
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.header("topic"), Some("Orders"));
        assert_eq!(decoded.header("TOPIC"), Some("Orders"));
    }

    #[test]
    fn test_lowercase_http_marks_response() {
        let mut buf = BytesMut::from(&b"http/1.0 200 OK\r\ncontent-length: 0\r\n\r\n"[..]);
        let decoded = Frame::decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.status, Some(200));
    }

    #[test]
    fn test_malformed_start_line() {
        let mut buf = BytesMut::from(&b"GET\r\n\r\n"[..]);
        let result = Frame::decode(&mut buf);
        assert!(matches!(result, Err(ProtocolError::MalformedStartLine(_))));
    }

    #[test]
    fn test_unknown_status_text() {
        assert_eq!(status_text(200), "OK");
        assert_eq!(status_text(504), "Gateway Timeout");
        assert_eq!(status_text(299), "Unknown Status");
        let encoded = Frame::response(299).encode();
        assert!(encoded.starts_with(b"HTTP/1.1 299 Unknown Status\r\n"));
    }

    #[test]
    fn test_empty_value_setter_is_noop() {
        let mut frame = Frame::new();
        frame.set_header("tag", "");
        assert!(frame.header("tag").is_none());

        frame.set_header("tag", "kept");
        frame.set_header("tag", "");
        assert_eq!(frame.header("tag"), Some("kept"));
    }

    #[test]
    fn test_set_header_if_none() {
        let mut frame = Frame::new();
        frame.set_header_if_none("token", "first");
        frame.set_header_if_none("token", "second");
        assert_eq!(frame.header("token"), Some("first"));
    }

    #[test]
    fn test_json_body_sets_content_type() {
        #[derive(serde::Serialize)]
        struct Payload {
            seq: u64,
        }

        let mut frame = Frame::new();
        frame.set_json_body(&Payload { seq: 7 }).unwrap();
        assert_eq!(frame.header("content-type"), Some("application/json"));
        assert!(std::str::from_utf8(frame.body()).unwrap().contains("7"));
    }

    proptest! {
        #[test]
        fn prop_roundtrip_preserves_frame(
            method in "[A-Z]{3,7}",
            url in "/[a-z0-9/]{0,12}",
            keys in proptest::collection::vec("[a-z_]{1,10}", 0..4),
            values in proptest::collection::vec("[a-zA-Z0-9 _./-]{1,12}", 0..4),
            body in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut frame = Frame::new();
            frame.method = method.clone();
            frame.url = url.clone();
            for (key, value) in keys.iter().zip(values.iter()) {
                if key != "content-length" {
                    frame.set_header(key, value.trim());
                }
            }
            frame.set_body(body.clone());

            let mut buf = frame.encode();
            let decoded = Frame::decode(&mut buf).unwrap().unwrap();

            prop_assert_eq!(decoded.status, None);
            prop_assert_eq!(&decoded.method, &method);
            prop_assert_eq!(&decoded.url, &url);
            prop_assert_eq!(decoded.headers(), frame.headers());
            prop_assert_eq!(decoded.body(), &body[..]);
            prop_assert!(buf.is_empty());
        }
    }
}
