//! Address resolution and timeout helpers shared by both transports.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use errbit_core::WriterConfig;

use crate::WriteError;

/// Resolve `host:port`. DNS failure is a resolve error, an empty answer is
/// `NoAddress`.
pub(crate) fn resolve(config: &WriterConfig) -> Result<Vec<SocketAddr>, WriteError> {
    let target = config.target();
    let addrs: Vec<SocketAddr> = target
        .to_socket_addrs()
        .map_err(|e| WriteError::Resolve(target.clone(), e))?
        .collect();
    if addrs.is_empty() {
        return Err(WriteError::NoAddress(target));
    }
    Ok(addrs)
}

/// Zero means "no bound" at the socket layer.
pub(crate) fn timeout(d: Duration) -> Option<Duration> {
    (!d.is_zero()).then_some(d)
}
