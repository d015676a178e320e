//! Errbit wire format: what the collector sees on the wire.
//!
//! Two shapes exist. In synchronous mode the notice goes out as a single
//! HTTP/1.1 POST over a stream. In asynchronous mode it is cut into
//! fragments, each wrapped in a JSON envelope and sent as one datagram:
//!
//! ```text
//! {"messageid":"<hex>","data":"<chunk>"}
//! {"messageid":"<hex>","data":"<chunk>","last":true}
//! ```
//!
//! The collector reassembles by `messageid`; nothing here assumes ordered
//! or exactly-once delivery.

use std::borrow::Cow;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::config::WriterConfig;

/// Collector route for notices.
pub const NOTICES_PATH: &str = "/notifier_api/v2/notices/";

/// Headroom added to the measured escaping ratio.
pub const ESCAPING_MARGIN: f64 = 1.05;

// ── Connection Scheme ─────────────────────────────────────────────────────────

/// Transport chosen for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Plain TCP stream.
    Tcp,
    /// TLS over TCP.
    Ssl,
    /// Fragmented datagrams.
    Udp,
}

impl Scheme {
    /// Pick the scheme for a config. `async` wins over `secure`.
    pub fn for_config(config: &WriterConfig) -> Self {
        if config.async_mode {
            Scheme::Udp
        } else if config.secure {
            Scheme::Ssl
        } else {
            Scheme::Tcp
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Tcp => "tcp",
            Scheme::Ssl => "ssl",
            Scheme::Udp => "udp",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection target string, e.g. `ssl://errbit.example.com`.
pub fn connection_scheme(config: &WriterConfig) -> String {
    format!("{}://{}", Scheme::for_config(config), config.host)
}

// ── HTTP Framing ──────────────────────────────────────────────────────────────

/// Frame a notice as a one-shot HTTP/1.1 POST. Header order is fixed.
pub fn frame_request(payload: &[u8], config: &WriterConfig) -> Vec<u8> {
    let head = [
        format!("POST {} HTTP/1.1", NOTICES_PATH),
        format!("Host: {}", config.host),
        format!("User-Agent: {}", config.agent),
        "Content-Type: text/xml".to_string(),
        "Accept: text/xml, application/xml".to_string(),
        format!("Content-Length: {}", payload.len()),
        "Connection: close".to_string(),
    ]
    .join("\r\n");

    let mut request = Vec::with_capacity(head.len() + 4 + payload.len());
    request.extend_from_slice(head.as_bytes());
    request.extend_from_slice(b"\r\n\r\n");
    request.extend_from_slice(payload);
    request
}

// ── Message Identifier ────────────────────────────────────────────────────────

/// Identifier shared by every fragment of one notice.
///
/// Hex BLAKE3 digest of a random token and the current time. Fresh per
/// send; collisions between sends are improbable, not impossible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

impl MessageId {
    pub fn generate() -> Self {
        let mut token = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut token);
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = blake3::Hasher::new();
        hasher.update(b"errbit-");
        hasher.update(&token);
        hasher.update(&nanos.to_le_bytes());
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// One fragment as it appears in a datagram.
///
/// `last` is omitted from the encoding unless true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<'a> {
    #[serde(borrow)]
    pub messageid: Cow<'a, str>,
    #[serde(borrow)]
    pub data: Cow<'a, str>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub last: bool,
}

impl<'a> Envelope<'a> {
    pub fn encode(&self) -> Vec<u8> {
        // Serializing borrowed strings and a bool into a Vec cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn decode(bytes: &'a [u8]) -> Result<Self, WireError> {
        serde_json::from_slice(bytes).map_err(|e| WireError::MalformedEnvelope(e.to_string()))
    }
}

// ── Fragmentation ─────────────────────────────────────────────────────────────

/// Estimated growth of text when encoded as a JSON string, with margin.
///
/// Measured once over the whole payload and applied to every chunk, so a
/// chunk much denser in escapes than the average can still overshoot.
/// Returns None for an empty payload.
pub fn escaping_ratio(payload: &str) -> Option<f64> {
    if payload.is_empty() {
        return None;
    }
    let encoded = json_string_len(payload);
    Some(encoded as f64 * ESCAPING_MARGIN / payload.len() as f64)
}

fn json_string_len(s: &str) -> usize {
    serde_json::to_string(s).map(|e| e.len()).unwrap_or(s.len() + 2)
}

/// Largest raw chunk whose estimated encoding fits in `mtu`. Never zero.
pub fn max_chunk_size(mtu: usize, ratio: f64) -> usize {
    ((mtu as f64 / ratio).floor() as usize).max(1)
}

/// Split text into consecutive chunks of at most `max` bytes, cut on
/// character boundaries. A character wider than `max` forms its own chunk.
/// An empty input yields a single empty chunk.
pub fn split_chunks(payload: &str, max: usize) -> Vec<&str> {
    let max = max.max(1);
    if payload.is_empty() {
        return vec![payload];
    }

    let mut chunks = Vec::with_capacity(payload.len().div_ceil(max));
    let mut rest = payload;
    while !rest.is_empty() {
        let mut end = max.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

/// A notice cut into datagrams, ready to send in order.
#[derive(Debug, Clone)]
pub struct Fragments {
    pub message_id: MessageId,
    /// Raw chunk size bound used for this message.
    pub chunk_size: usize,
    /// Encoded envelopes, last one carries `last: true`.
    pub datagrams: Vec<Vec<u8>>,
}

impl Fragments {
    /// Plan the fragments of `payload` for a datagram bound of `mtu` bytes.
    pub fn plan(payload: &[u8], mtu: usize) -> Result<Self, WireError> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| WireError::NonUtf8Payload(e.valid_up_to()))?;

        let message_id = MessageId::generate();
        let chunk_size = match escaping_ratio(text) {
            Some(ratio) => max_chunk_size(mtu, ratio),
            None => mtu.max(1),
        };

        let chunks = split_chunks(text, chunk_size);
        let count = chunks.len();
        let datagrams = chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                Envelope {
                    messageid: Cow::Borrowed(message_id.as_str()),
                    data: Cow::Borrowed(chunk),
                    last: idx + 1 == count,
                }
                .encode()
            })
            .collect();

        Ok(Self {
            message_id,
            chunk_size,
            datagrams,
        })
    }

    pub fn len(&self) -> usize {
        self.datagrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datagrams.is_empty()
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("payload is not UTF-8 (valid up to byte {0})")]
    NonUtf8Payload(usize),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
