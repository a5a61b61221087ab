//! # fluxq-client
//!
//! Client library for fluxq.
//!
//! This crate provides:
//! - Async TCP session with bounded dials and auto-reconnect
//! - Periodic heartbeat and a background receive/dispatch loop
//! - Request/response correlation for concurrent callers

pub mod error;
pub mod session;

pub use error::ClientError;
pub use session::{Session, SessionConfig};
