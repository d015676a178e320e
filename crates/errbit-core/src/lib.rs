//! errbit-core: shared types for notice delivery, i.e. configuration and the
//! wire format. No I/O happens in this crate.

pub mod config;
pub mod wire;

pub use config::{ConfigError, WriterConfig, DEFAULT_MTU};
pub use wire::{Envelope, MessageId, Scheme, WireError};
