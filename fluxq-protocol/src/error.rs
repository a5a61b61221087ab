//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing.
///
/// An incomplete frame is not an error: decoding returns `Ok(None)` until
/// enough bytes have accumulated, and malformed bytes are reported through
/// one of these variants instead.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed start line: {0:?}")]
    MalformedStartLine(String),

    #[error("header block is not valid UTF-8")]
    InvalidUtf8,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
