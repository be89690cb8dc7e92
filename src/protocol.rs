//! Wire protocol codec.
//!
//! Every datagram carries exactly one [`Message`], encoded in a fixed field
//! order with big-endian integers and u32-length-prefixed UTF-8 strings, so a
//! decoder recovers field boundaries without delimiters. Encoding and
//! decoding are pure functions; both roles call them from multiple tasks.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DecodeError;

/// Protocol version stamped on every outgoing message.
pub const PROTOCOL_VERSION: u8 = 1;

/// Node id the server uses on its aggregate broadcasts.
pub const SERVER_NODE_ID: &str = "server";

/// Receive buffer size and the practical MTU-safe ceiling for one datagram.
/// Larger encodes are a caller error; the send paths warn and do not fragment.
pub const MAX_DATAGRAM: usize = 1024;

/// One wire unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub version: u8,
    /// false = client-server. true is reserved for peer-to-peer operation.
    pub mode: bool,
    pub node_id: String,
    /// Sender wall clock, epoch milliseconds. Informational only on the
    /// server side; liveness uses the receipt clock.
    pub timestamp: i64,
    /// Unused. Must survive a round trip unchanged.
    pub reserve: i32,
    pub payload: String,
}

impl Message {
    /// Client-server message stamped with the current wall clock.
    pub fn new(node_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            mode: false,
            node_id: node_id.into(),
            timestamp: now_ms(),
            reserve: 0,
            payload: payload.into(),
        }
    }
}

/// Current wall clock as epoch milliseconds.
#[inline]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Encode in wire order: version, mode, node_id, timestamp, reserve, payload.
pub fn encode(msg: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(18 + msg.node_id.len() + msg.payload.len());
    buf.push(msg.version);
    buf.push(msg.mode as u8);
    put_str(&mut buf, &msg.node_id);
    buf.extend_from_slice(&msg.timestamp.to_be_bytes());
    buf.extend_from_slice(&msg.reserve.to_be_bytes());
    put_str(&mut buf, &msg.payload);
    buf
}

/// Decode one datagram. Trailing bytes after the payload are ignored, since
/// receivers hand over fixed-size receive buffers. Performs no semantic
/// validation beyond field boundaries and UTF-8.
pub fn decode(buf: &[u8]) -> Result<Message, DecodeError> {
    let mut r = Reader::new(buf);
    let version = r.u8("version")?;
    // any non-zero flag byte reads as true
    let mode = r.u8("mode")? != 0;
    let node_id = r.string("node_id")?;
    let timestamp = r.i64("timestamp")?;
    let reserve = r.i32("reserve")?;
    let payload = r.string("payload")?;
    Ok(Message {
        version,
        mode,
        node_id,
        timestamp,
        reserve,
        payload,
    })
}

fn put_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Bounds-checked cursor over an incoming datagram.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Fixed-width read. Coming up short here is a truncated datagram.
    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        let remaining = self.buf.len() - self.pos;
        if n > remaining {
            return Err(DecodeError::Truncated {
                field,
                needed: n - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, field)?[0])
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, field)?);
        Ok(i32::from_be_bytes(raw))
    }

    fn i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8, field)?);
        Ok(i64::from_be_bytes(raw))
    }

    /// Length-prefixed string. A declared length that overruns the buffer is
    /// a malformed datagram rather than a truncated one: the prefix itself
    /// was intact but lies about what follows.
    fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4, field)?);
        let len = u32::from_be_bytes(raw) as usize;

        let remaining = self.buf.len() - self.pos;
        if len > remaining {
            return Err(DecodeError::Malformed {
                field,
                reason: format!("declared length {len} exceeds {remaining} remaining byte(s)"),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;

        String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::Malformed {
            field,
            reason: e.to_string(),
        })
    }
}
