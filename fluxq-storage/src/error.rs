//! Buffer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening or addressing a mapped buffer.
#[derive(Debug, Error)]
pub enum BufferError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to stat {path}: {source}")]
    Stat {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to truncate {path} to {len} bytes: {source}")]
    Truncate {
        path: PathBuf,
        len: u64,
        source: std::io::Error,
    },

    #[error("failed to zero-extend {path} to {len} bytes: {source}")]
    Extend {
        path: PathBuf,
        len: u64,
        source: std::io::Error,
    },

    #[error("failed to map {path}: {source}")]
    Map {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to flush mapping: {0}")]
    Flush(std::io::Error),

    #[error("failed to sync file: {0}")]
    Sync(std::io::Error),

    #[error("cursor {pos} cannot advance {width} bytes in a {capacity}-byte buffer")]
    OutOfRange {
        pos: usize,
        width: usize,
        capacity: usize,
    },

    #[error("stored string length {0} exceeds the 127-byte limit")]
    InvalidStringLength(u8),

    #[error("string of {0} bytes exceeds the 127-byte limit")]
    StringTooLong(usize),
}
