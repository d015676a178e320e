//! TLS wrapping for the stream path.
//!
//! Server certificates are verified against the webpki root set with the
//! configured host as SNI name.

use std::io::Write;
use std::net::TcpStream;
use std::sync::{Arc, OnceLock};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::WriteError;

/// Immutable after first use; shared by every secure send in the process.
fn client_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();
    CONFIG
        .get_or_init(|| {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            Arc::new(
                ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth(),
            )
        })
        .clone()
}

/// Handshake, write `request`, send close_notify. The TCP stream is owned by
/// the TLS stream and closed when it drops.
pub(crate) fn write(stream: TcpStream, host: &str, request: &[u8]) -> Result<(), WriteError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| WriteError::Tls(format!("invalid server name {host:?}: {e}")))?;
    let conn = ClientConnection::new(client_config(), server_name)
        .map_err(|e| WriteError::Tls(e.to_string()))?;

    let mut tls = StreamOwned::new(conn, stream);
    tls.write_all(request).map_err(WriteError::Write)?;
    tls.flush().map_err(WriteError::Write)?;

    tls.conn.send_close_notify();
    tls.flush().map_err(WriteError::Write)
}
