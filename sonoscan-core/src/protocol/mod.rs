//! Ping-protocol framing.
//!
//! The scanning sonar speaks a simple framed protocol over its serial byte
//! transport. All functions here are pure (no I/O) - just `&[u8]` to
//! `Result<T>` and back.
//!
//! # Frame layout
//!
//! ```text
//! +------+------+----------------+------------+-----+-----+---------+----------+
//! | 'B'  | 'R'  | payload_length | message_id | src | dst | payload | checksum |
//! | u8   | u8   | u16 LE         | u16 LE     | u8  | u8  | N bytes | u16 LE   |
//! +------+------+----------------+------------+-----+-----+---------+----------+
//! ```
//!
//! The checksum is the wrapping 16-bit sum of every byte preceding it.

pub mod ping360;

use crate::error::ParseError;

/// First start byte of every frame
pub const START1: u8 = b'B';

/// Second start byte of every frame
pub const START2: u8 = b'R';

/// Bytes before the payload
pub const HEADER_LEN: usize = 8;

/// Trailing checksum bytes
pub const CHECKSUM_LEN: usize = 2;

/// Message ids shared by all ping-protocol devices
pub mod message_id {
    /// Negative acknowledgement, payload carries the rejected message id
    pub const NACK: u16 = 2;
}

/// Rejected message id carried by a NACK payload, when present
pub fn nack_rejected_id(payload: &[u8]) -> Option<u16> {
    if payload.len() >= 2 {
        Some(u16::from_le_bytes([payload[0], payload[1]]))
    } else {
        None
    }
}

/// Wrapping 16-bit sum of `data`
pub fn checksum(data: &[u8]) -> u16 {
    data.iter().fold(0u16, |sum, &b| sum.wrapping_add(b as u16))
}

/// A single decoded protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_id: u16,
    pub src_device_id: u8,
    pub dst_device_id: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a host-to-device frame around `payload`
    pub fn new(message_id: u16, payload: Vec<u8>) -> Self {
        Frame {
            message_id,
            src_device_id: 0,
            dst_device_id: 1,
            payload,
        }
    }

    /// Total on-wire length of a frame with a `payload_len`-byte payload
    pub fn wire_len(payload_len: usize) -> usize {
        HEADER_LEN + payload_len + CHECKSUM_LEN
    }

    /// Serialize the frame, appending the checksum
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::wire_len(self.payload.len()));
        out.push(START1);
        out.push(START2);
        out.extend_from_slice(&(self.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.message_id.to_le_bytes());
        out.push(self.src_device_id);
        out.push(self.dst_device_id);
        out.extend_from_slice(&self.payload);
        out.extend_from_slice(&checksum(&out).to_le_bytes());
        out
    }

    /// Parse one complete frame, verifying start bytes, length and checksum.
    pub fn parse(data: &[u8]) -> Result<Frame, ParseError> {
        if data.len() < Self::wire_len(0) {
            return Err(ParseError::TooShort {
                expected: Self::wire_len(0),
                actual: data.len(),
            });
        }
        if data[0] != START1 || data[1] != START2 {
            return Err(ParseError::InvalidStart {
                actual: data[..2].to_vec(),
            });
        }

        let payload_len = u16::from_le_bytes([data[2], data[3]]) as usize;
        let total = Self::wire_len(payload_len);
        if data.len() < total {
            return Err(ParseError::TooShort {
                expected: total,
                actual: data.len(),
            });
        }
        if data.len() != total {
            return Err(ParseError::LengthMismatch {
                header_len: payload_len,
                actual_len: data.len() - Self::wire_len(0),
            });
        }

        let expected = u16::from_le_bytes([data[total - 2], data[total - 1]]);
        let computed = checksum(&data[..total - 2]);
        if expected != computed {
            return Err(ParseError::ChecksumMismatch { expected, computed });
        }

        Ok(Frame {
            message_id: u16::from_le_bytes([data[4], data[5]]),
            src_device_id: data[6],
            dst_device_id: data[7],
            payload: data[HEADER_LEN..HEADER_LEN + payload_len].to_vec(),
        })
    }
}

/// Incremental frame decoder for a raw byte stream.
///
/// Bytes arrive from the transport in arbitrary chunks; the accumulator
/// buffers them, resynchronizes on the `'B' 'R'` start marker after garbage
/// or a corrupt frame, and yields complete frames in order.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buf: Vec<u8>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the transport
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pop the next complete frame, if the buffer holds one.
    ///
    /// Corrupt frames (bad checksum or length) are discarded and scanning
    /// resumes at the next start marker.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            self.resync();
            if self.buf.len() < HEADER_LEN {
                return None;
            }
            let payload_len = u16::from_le_bytes([self.buf[2], self.buf[3]]) as usize;
            let total = Frame::wire_len(payload_len);
            if self.buf.len() < total {
                return None;
            }
            let result = Frame::parse(&self.buf[..total]);
            self.buf.drain(..total);
            match result {
                Ok(frame) => return Some(frame),
                // drop the corrupt frame and keep scanning
                Err(_) => continue,
            }
        }
    }

    /// Drop leading bytes until the buffer starts with a frame marker
    fn resync(&mut self) {
        let start = self
            .buf
            .windows(2)
            .position(|w| w[0] == START1 && w[1] == START2)
            .unwrap_or_else(|| self.buf.len().saturating_sub(1));
        if start > 0 {
            self.buf.drain(..start);
        }
    }

    /// Number of buffered bytes not yet consumed
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}
