//! errbit integration test harness.
//!
//! Each test stands up a loopback collector (a TCP listener or a UDP
//! socket on 127.0.0.1, port chosen by the OS) and drives the real
//! `SocketWriter` against it. No root, no external network.

mod failures;
mod sync_path;

use std::io::Read;
use std::net::{TcpListener, UdpSocket};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use errbit_core::WriterConfig;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Config pointing at 127.0.0.1:`port` with short timeouts.
pub fn loopback_config(port: u16) -> WriterConfig {
    WriterConfig {
        host: "127.0.0.1".into(),
        port,
        connect_timeout: Duration::from_millis(500),
        write_timeout: Duration::from_millis(500),
        agent: "errbit-integration".into(),
        ..WriterConfig::default()
    }
}

/// TCP collector that accepts one connection and returns everything sent
/// on it once the writer closes.
pub fn stream_collector() -> Result<(u16, JoinHandle<Result<Vec<u8>>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind tcp collector")?;
    let port = listener.local_addr()?.port();
    let handle = thread::spawn(move || -> Result<Vec<u8>> {
        let (mut conn, _) = listener.accept().context("accept")?;
        conn.set_read_timeout(Some(Duration::from_secs(5)))?;
        let mut received = Vec::new();
        conn.read_to_end(&mut received).context("read request")?;
        Ok(received)
    });
    Ok((port, handle))
}

/// UDP collector bound to loopback.
pub struct DatagramCollector {
    socket: UdpSocket,
}

impl DatagramCollector {
    pub fn bind() -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").context("bind udp collector")?;
        socket.set_read_timeout(Some(Duration::from_secs(2)))?;
        Ok(Self { socket })
    }

    pub fn port(&self) -> u16 {
        self.socket.local_addr().map(|a| a.port()).unwrap_or(0)
    }

    /// Receive exactly `n` datagrams as parsed JSON values.
    pub fn recv(&self, n: usize) -> Result<Vec<serde_json::Value>> {
        let mut buf = vec![0u8; 65536];
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let len = self
                .socket
                .recv(&mut buf)
                .with_context(|| format!("datagram {i} of {n} never arrived"))?;
            out.push(serde_json::from_slice(&buf[..len]).context("envelope is not JSON")?);
        }
        Ok(out)
    }

    /// True if nothing further arrives within `wait`.
    pub fn is_quiet(&self, wait: Duration) -> bool {
        let mut buf = [0u8; 16];
        self.socket.set_read_timeout(Some(wait)).ok();
        self.socket.recv(&mut buf).is_err()
    }
}

/// Concatenate the `data` fields of envelopes in arrival order.
pub fn reassemble(envelopes: &[serde_json::Value]) -> String {
    envelopes
        .iter()
        .filter_map(|e| e["data"].as_str())
        .collect()
}

/// A notice document of roughly `lines` backtrace lines.
pub fn sample_notice(lines: usize) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<notice version=\"2.0\">\n<error><class>RuntimeError</class><message>boom &amp; \"quoted\" naïve</message>\n<backtrace>\n");
    for i in 0..lines {
        doc.push_str(&format!(
            "<line number=\"{i}\" file=\"/srv/app/src/handler_{i}.rs\" method=\"handle\\t{i}\"/>\n"
        ));
    }
    doc.push_str("</backtrace></error></notice>\n");
    doc
}
