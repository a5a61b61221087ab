//! Client error types.

use thiserror::Error;

/// Session errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] fluxq_protocol::ProtocolError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("operation timed out")]
    Timeout,

    #[error("session is closed")]
    Closed,
}

impl ClientError {
    /// Whether the dispatch loop may tear down and redial after this
    /// error. I/O and peer-close failures are the network-operation
    /// category; protocol errors and a closed session are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::ConnectionClosed | ClientError::NotConnected
        )
    }
}
