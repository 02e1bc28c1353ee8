//! Legacy single-field envelope with a bit-packed 64-bit header.
//!
//! Header layout, preserved bit for bit for existing peers:
//! ```text
//!  63                36 35          20 19            4 3       0
//! ┌────────────────────┬──────────────┬───────────────┬─────────┐
//! │ reserved (0)       │ length (16)  │ id (16)       │ bus (4) │
//! └────────────────────┴──────────────┴───────────────┴─────────┘
//! ```
//! followed by a fixed 1024-byte payload. Encoding and decoding are total:
//! lengths above the payload size are clamped, never trusted.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{EnvelopeError, Result};

/// Fixed payload size of a legacy frame.
pub const LEGACY_PAYLOAD_SIZE: usize = 1024;
/// Header size on the wire.
pub const LEGACY_HEADER_SIZE: usize = 8;
/// Total wire size: header plus fixed payload.
pub const LEGACY_WIRE_SIZE: usize = LEGACY_HEADER_SIZE + LEGACY_PAYLOAD_SIZE;

const BUS_TYPE_MASK: u64 = 0xF;
const ID_SHIFT: u32 = 4;
const LENGTH_SHIFT: u32 = 20;
const FIELD_MASK: u64 = 0xFFFF;

/// Bus type nibble of the legacy scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyBusType {
    Can,
    FlexRay,
    Video,
    /// Any other 4-bit value, carried through unchanged.
    Reserved(u8),
}

impl LegacyBusType {
    pub fn from_nibble(nibble: u8) -> Self {
        match nibble & 0xF {
            0 => LegacyBusType::Can,
            1 => LegacyBusType::FlexRay,
            2 => LegacyBusType::Video,
            other => LegacyBusType::Reserved(other),
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            LegacyBusType::Can => 0,
            LegacyBusType::FlexRay => 1,
            LegacyBusType::Video => 2,
            LegacyBusType::Reserved(raw) => raw & 0xF,
        }
    }
}

/// Decoded legacy message.
#[derive(Clone, PartialEq, Eq)]
pub struct SimpleEnvelope {
    pub bus_type: LegacyBusType,
    pub id: u16,
    /// Number of meaningful payload bytes. Values above 1024 are clamped on encode.
    pub length: u16,
    pub data: [u8; LEGACY_PAYLOAD_SIZE],
}

impl SimpleEnvelope {
    /// Build a message from a payload, keeping at most 1024 bytes.
    pub fn new(bus_type: LegacyBusType, id: u16, payload: &[u8]) -> Self {
        let len = payload.len().min(LEGACY_PAYLOAD_SIZE);
        let mut data = [0u8; LEGACY_PAYLOAD_SIZE];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            bus_type,
            id,
            length: len as u16,
            data,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..clamped_len(self.length)]
    }
}

impl fmt::Debug for SimpleEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleEnvelope")
            .field("bus_type", &self.bus_type)
            .field("id", &self.id)
            .field("length", &self.length)
            .field("payload", &format_args!("<{} bytes>", self.payload().len()))
            .finish()
    }
}

/// Legacy wire frame: packed header and fixed payload.
#[derive(Clone, PartialEq, Eq)]
pub struct LegacyFrame {
    pub header: u64,
    pub payload: [u8; LEGACY_PAYLOAD_SIZE],
}

impl LegacyFrame {
    pub fn bus_type(&self) -> LegacyBusType {
        LegacyBusType::from_nibble((self.header & BUS_TYPE_MASK) as u8)
    }

    pub fn id(&self) -> u16 {
        ((self.header >> ID_SHIFT) & FIELD_MASK) as u16
    }

    /// Length field as carried in the header, before clamping.
    pub fn raw_length(&self) -> u16 {
        ((self.header >> LENGTH_SHIFT) & FIELD_MASK) as u16
    }

    /// Serialize as an 8-byte little-endian header followed by the payload.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(LEGACY_WIRE_SIZE);
        buf.put_u64_le(self.header);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse the wire form produced by [`LegacyFrame::to_bytes`].
    pub fn from_bytes(mut src: &[u8]) -> Result<Self> {
        if src.len() < LEGACY_WIRE_SIZE {
            return Err(EnvelopeError::Malformed(format!(
                "legacy frame needs {LEGACY_WIRE_SIZE} bytes, got {}",
                src.len()
            )));
        }
        let header = src.get_u64_le();
        let mut payload = [0u8; LEGACY_PAYLOAD_SIZE];
        src.copy_to_slice(&mut payload);
        Ok(Self { header, payload })
    }
}

impl fmt::Debug for LegacyFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyFrame")
            .field("header", &format_args!("{:#018x}", self.header))
            .finish_non_exhaustive()
    }
}

/// Pack a legacy message. Never fails.
pub fn encode(msg: &SimpleEnvelope) -> LegacyFrame {
    let len = clamped_len(msg.length);
    let header = (u64::from(msg.bus_type.nibble()) & BUS_TYPE_MASK)
        | (u64::from(msg.id) << ID_SHIFT)
        | ((len as u64 & FIELD_MASK) << LENGTH_SHIFT);

    let mut payload = [0u8; LEGACY_PAYLOAD_SIZE];
    payload[..len].copy_from_slice(&msg.data[..len]);
    LegacyFrame { header, payload }
}

/// Unpack a legacy frame. Bytes at or beyond the decoded length are zero.
pub fn decode(frame: &LegacyFrame) -> SimpleEnvelope {
    let len = clamped_len(frame.raw_length());
    let mut data = [0u8; LEGACY_PAYLOAD_SIZE];
    data[..len].copy_from_slice(&frame.payload[..len]);
    SimpleEnvelope {
        bus_type: frame.bus_type(),
        id: frame.id(),
        length: len as u16,
        data,
    }
}

fn clamped_len(length: u16) -> usize {
    let len = usize::from(length);
    if len > LEGACY_PAYLOAD_SIZE {
        debug!(length, max = LEGACY_PAYLOAD_SIZE, "legacy length clamped");
        return LEGACY_PAYLOAD_SIZE;
    }
    len
}
