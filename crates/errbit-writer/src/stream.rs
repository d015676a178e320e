//! Synchronous path: one HTTP POST per notice over TCP or TLS.
//!
//! Connect (bounded by `connect_timeout`), write the framed request in one
//! go (bounded by `write_timeout`), close. The response is never read.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use errbit_core::wire::{frame_request, Scheme};
use errbit_core::WriterConfig;

use crate::net::{resolve, timeout};
use crate::{Sent, WriteError};

pub fn send(payload: &[u8], config: &WriterConfig) -> Result<Sent, WriteError> {
    let scheme = Scheme::for_config(config);
    let request = frame_request(payload, config);

    let stream = connect(config)?;
    // Reads only happen during a TLS handshake; bound them the same way.
    stream
        .set_write_timeout(timeout(config.write_timeout))
        .map_err(|e| WriteError::SocketOption("SO_SNDTIMEO", e))?;
    stream
        .set_read_timeout(timeout(config.write_timeout))
        .map_err(|e| WriteError::SocketOption("SO_RCVTIMEO", e))?;

    tracing::debug!(
        scheme = %scheme,
        collector = %config.target(),
        request_len = request.len(),
        "posting notice"
    );

    match scheme {
        Scheme::Ssl => write_secure(stream, &config.host, &request)?,
        _ => write_plain(stream, &request)?,
    }

    Ok(Sent {
        bytes: request.len(),
        packets: 1,
    })
}

/// The stream is dropped, and so closed, on return.
fn write_plain(mut stream: TcpStream, request: &[u8]) -> Result<(), WriteError> {
    stream.write_all(request).map_err(WriteError::Write)?;
    stream.flush().map_err(WriteError::Write)
}

#[cfg(feature = "tls")]
fn write_secure(stream: TcpStream, host: &str, request: &[u8]) -> Result<(), WriteError> {
    crate::tls::write(stream, host, request)
}

#[cfg(not(feature = "tls"))]
fn write_secure(_stream: TcpStream, _host: &str, _request: &[u8]) -> Result<(), WriteError> {
    Err(WriteError::TlsUnavailable)
}

/// Try every resolved address in order; first to connect wins.
fn connect(config: &WriterConfig) -> Result<TcpStream, WriteError> {
    let addrs = resolve(config)?;
    connect_any(&addrs, timeout(config.connect_timeout))
        .map_err(|e| WriteError::Connect(config.target(), e))
}

/// `limit` bounds all attempts together, not each one.
fn connect_any(addrs: &[SocketAddr], limit: Option<Duration>) -> io::Result<TcpStream> {
    let deadline = limit.map(|l| Instant::now() + l);
    let mut last_err = None;

    for addr in addrs {
        let attempt = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                TcpStream::connect_timeout(addr, remaining)
            }
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::trace!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::TimedOut, "connect timeout spent before any attempt")
    }))
}
