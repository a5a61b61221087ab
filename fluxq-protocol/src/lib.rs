//! # fluxq-protocol
//!
//! Wire protocol implementation for fluxq.
//!
//! This crate provides:
//! - Text framing (request/status line + headers + body) with
//!   partial-read accumulation
//! - Typed accessors for the queue-domain header set (topic, consume
//!   group, offset bookmarks)
//! - Status-text lookup and the canonical header/command constants

pub mod codec;
pub mod error;
pub mod frame;
pub mod headers;

pub use codec::Decoder;
pub use error::ProtocolError;
pub use frame::{status_text, Frame};

/// Default port for a fluxq broker.
pub const DEFAULT_PORT: u16 = 15555;
