//! # fluxq
//!
//! Client-side runtime for the fluxq disk-backed message queue: the wire
//! protocol, the mapped segment buffer, and the TCP client session.
//!
//! This umbrella crate re-exports the workspace members; depend on the
//! individual crates to pull in only one layer.

pub use fluxq_client as client;
pub use fluxq_protocol as protocol;
pub use fluxq_storage as storage;

pub use fluxq_client::{ClientError, Session, SessionConfig};
pub use fluxq_protocol::{status_text, Decoder, Frame, ProtocolError};
pub use fluxq_storage::{BufferError, MappedBuf};
