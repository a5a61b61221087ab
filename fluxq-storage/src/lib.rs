//! # fluxq-storage
//!
//! Storage primitives for fluxq.
//!
//! The queue engine lays its records out inside fixed-size segment files;
//! this crate provides [`MappedBuf`], the mapped, cursor-addressed buffer
//! those records are read and written through.

pub mod buffer;
pub mod error;

pub use buffer::{MappedBuf, MAX_STRING_LEN};
pub use error::BufferError;
