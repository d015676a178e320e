//! errbit-writer: best-effort delivery of serialized notices.
//!
//! A notice is either posted over a TCP (optionally TLS) stream or, in
//! async mode, fragmented into UDP datagrams. Reporting a failure must never
//! cause a new one, so [`Writer::write`] swallows every transport error and
//! only reports whether the notice left this process.

use errbit_core::wire::Scheme;
use errbit_core::WriterConfig;

pub mod datagram;
pub mod error;
mod net;
pub mod stream;
#[cfg(feature = "tls")]
mod tls;

pub use error::WriteError;

/// Something that can hand a serialized notice to a collector.
pub trait Writer {
    /// Deliver `payload` using `config`. Never fails; the result may be ignored.
    fn write(&self, payload: &[u8], config: &WriterConfig) -> Delivery;
}

/// What a successful send put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    /// Bytes handed to the kernel.
    pub bytes: usize,
    /// 1 for the stream path. For the async path, datagrams the kernel
    /// accepted, which can fall short of the fragments planned.
    pub packets: usize,
}

/// Outcome of a fire-and-forget write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent(Sent),
    Abandoned,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent(_))
    }
}

/// Writer backed by raw sockets. Holds no state; every call opens and
/// releases its own socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketWriter;

impl SocketWriter {
    pub fn new() -> Self {
        Self
    }

    /// Like [`Writer::write`] but surfaces the error instead of logging it.
    pub fn try_write(&self, payload: &[u8], config: &WriterConfig) -> Result<Sent, WriteError> {
        match Scheme::for_config(config) {
            Scheme::Udp => datagram::send(payload, config),
            Scheme::Tcp | Scheme::Ssl => stream::send(payload, config),
        }
    }
}

impl Writer for SocketWriter {
    fn write(&self, payload: &[u8], config: &WriterConfig) -> Delivery {
        match self.try_write(payload, config) {
            Ok(sent) => Delivery::Sent(sent),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    scheme = %Scheme::for_config(config),
                    collector = %config.target(),
                    payload_len = payload.len(),
                    "notice delivery abandoned"
                );
                Delivery::Abandoned
            }
        }
    }
}
