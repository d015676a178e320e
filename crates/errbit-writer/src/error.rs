//! Transport failures. None of these reach the caller of `Writer::write`.

use std::io;

use errbit_core::WireError;

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("failed to resolve {0}: {1}")]
    Resolve(String, io::Error),

    #[error("{0} resolved to no addresses")]
    NoAddress(String),

    #[error("failed to connect to {0}: {1}")]
    Connect(String, io::Error),

    #[error("failed to create socket: {0}")]
    Socket(io::Error),

    #[error("failed to set {0}: {1}")]
    SocketOption(&'static str, io::Error),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("secure delivery requested but built without the `tls` feature")]
    TlsUnavailable,

    #[error("write failed: {0}")]
    Write(io::Error),

    #[error("unsendable payload: {0}")]
    Payload(#[from] WireError),
}
