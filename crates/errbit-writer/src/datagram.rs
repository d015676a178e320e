//! Asynchronous path: fragmenting a notice into UDP datagrams.
//!
//! Every datagram carries one envelope (see `errbit_core::wire`). Nothing
//! is acknowledged or retried; a lost fragment leaves the collector with a
//! message it cannot reassemble, and this side never finds out.

use std::net::SocketAddr;
use std::time::Duration;

use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use errbit_core::wire::Fragments;
use errbit_core::WriterConfig;

use crate::net::{resolve, timeout};
use crate::{Sent, WriteError};

/// Kernel send buffer requested for the datagram socket.
pub const SEND_BUFFER_BYTES: usize = 50_000;

pub fn send(payload: &[u8], config: &WriterConfig) -> Result<Sent, WriteError> {
    let dest = resolve(config)?[0];
    let socket = make_datagram_socket(&dest, config.write_timeout)?;

    let fragments = Fragments::plan(payload, config.mtu())?;
    tracing::debug!(
        collector = %dest,
        message_id = %fragments.message_id,
        payload_len = payload.len(),
        chunk_size = fragments.chunk_size,
        fragments = fragments.len(),
        "sending notice fragments"
    );

    let dest = SockAddr::from(dest);
    let mut bytes = 0;
    let mut packets = 0;
    for (idx, datagram) in fragments.datagrams.iter().enumerate() {
        // Per-datagram failures are not fatal to the rest of the message.
        match socket.send_to(datagram, &dest) {
            Ok(n) => {
                bytes += n;
                packets += 1;
                tracing::trace!(idx, bytes = n, "fragment sent");
            }
            Err(e) => tracing::trace!(idx, error = %e, "fragment send failed"),
        }
    }

    if packets < fragments.len() {
        tracing::debug!(
            message_id = %fragments.message_id,
            sent = packets,
            planned = fragments.len(),
            "some fragments were not sent"
        );
    }

    Ok(Sent { bytes, packets })
}

/// Create a UDP socket for the address family of `dest`.
///
/// The socket closes when it drops, on every return path.
fn make_datagram_socket(dest: &SocketAddr, write_timeout: Duration) -> Result<Socket, WriteError> {
    let socket = Socket::new(Domain::for_address(*dest), Type::DGRAM, Some(Protocol::UDP))
        .map_err(WriteError::Socket)?;

    socket
        .set_reuse_address(true)
        .map_err(|e| WriteError::SocketOption("SO_REUSEADDR", e))?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    socket
        .set_reuse_port(true)
        .map_err(|e| WriteError::SocketOption("SO_REUSEPORT", e))?;
    socket
        .set_send_buffer_size(SEND_BUFFER_BYTES)
        .map_err(|e| WriteError::SocketOption("SO_SNDBUF", e))?;
    // Seconds and microseconds split happens in the timeval conversion.
    socket
        .set_write_timeout(timeout(write_timeout))
        .map_err(|e| WriteError::SocketOption("SO_SNDTIMEO", e))?;

    Ok(socket)
}
