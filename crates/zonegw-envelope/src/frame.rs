use std::fmt;

use bytes::Bytes;

use crate::error::{EnvelopeError, Result};

/// Largest valid CAN identifier (29-bit extended format).
pub const CAN_MAX_ID: u32 = 0x1FFF_FFFF;
/// Classic CAN / LIN data field capacity.
pub const CAN_MAX_DLC: u8 = 8;
/// FlexRay data field capacity carried by the envelope.
pub const FLEXRAY_MAX_PAYLOAD: u8 = 64;

/// Bus protocol carried by an envelope.
///
/// The discriminants are the values written to the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ProtocolTag {
    Can = 0,
    Lin = 1,
    FlexRay = 2,
    Ethernet = 3,
}

impl ProtocolTag {
    /// Human-readable protocol name.
    pub fn name(self) -> &'static str {
        match self {
            ProtocolTag::Can => "CAN",
            ProtocolTag::Lin => "LIN",
            ProtocolTag::FlexRay => "FlexRay",
            ProtocolTag::Ethernet => "Ethernet",
        }
    }
}

impl TryFrom<u32> for ProtocolTag {
    type Error = EnvelopeError;

    fn try_from(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(ProtocolTag::Can),
            1 => Ok(ProtocolTag::Lin),
            2 => Ok(ProtocolTag::FlexRay),
            3 => Ok(ProtocolTag::Ethernet),
            other => Err(EnvelopeError::UnsupportedProtocol(other)),
        }
    }
}

impl fmt::Display for ProtocolTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classic CAN frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanFrame {
    /// 11-bit or 29-bit identifier in a 32-bit container.
    pub id: u32,
    /// Number of valid bytes in `data` (0..=8).
    pub dlc: u8,
    pub data: [u8; 8],
    /// Additional flags (RTR, error frame, ...).
    pub flags: u8,
}

impl CanFrame {
    /// Build a frame from an identifier and up to 8 data bytes.
    pub fn new(id: u32, payload: &[u8]) -> Result<Self> {
        if id > CAN_MAX_ID {
            return Err(EnvelopeError::InvalidArgument(format!(
                "CAN id 0x{id:X} exceeds 29 bits"
            )));
        }
        let dlc = checked_len(payload.len(), CAN_MAX_DLC, "CAN")?;
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            dlc,
            data,
            flags: 0,
        })
    }

    /// The valid data bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(CAN_MAX_DLC))]
    }
}

/// A LIN frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinFrame {
    pub id: u8,
    /// Number of valid bytes in `data` (0..=8).
    pub dlc: u8,
    pub data: [u8; 8],
    pub checksum: u8,
}

impl LinFrame {
    /// Build a frame from an identifier and up to 8 data bytes.
    pub fn new(id: u8, payload: &[u8], checksum: u8) -> Result<Self> {
        let dlc = checked_len(payload.len(), CAN_MAX_DLC, "LIN")?;
        let mut data = [0u8; 8];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            id,
            dlc,
            data,
            checksum,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.dlc.min(CAN_MAX_DLC))]
    }
}

/// A FlexRay frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexRayFrame {
    pub frame_id: u16,
    /// Number of valid bytes in `data` (0..=64).
    pub payload_length: u8,
    pub data: [u8; 64],
    /// Channel A, B or both.
    pub channel: u8,
    pub cycle: u8,
}

impl FlexRayFrame {
    /// Build a frame from an identifier and up to 64 data bytes.
    pub fn new(frame_id: u16, payload: &[u8], channel: u8, cycle: u8) -> Result<Self> {
        let payload_length = checked_len(payload.len(), FLEXRAY_MAX_PAYLOAD, "FlexRay")?;
        let mut data = [0u8; 64];
        data[..payload.len()].copy_from_slice(payload);
        Ok(Self {
            frame_id,
            payload_length,
            data,
            channel,
            cycle,
        })
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.payload_length.min(FLEXRAY_MAX_PAYLOAD))]
    }
}

impl Default for FlexRayFrame {
    fn default() -> Self {
        Self {
            frame_id: 0,
            payload_length: 0,
            data: [0u8; 64],
            channel: 0,
            cycle: 0,
        }
    }
}

/// An automotive Ethernet frame.
///
/// The payload is owned by the frame; its length travels with it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EthernetFrame {
    pub dest_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub ethertype: u16,
    pub payload: Bytes,
}

impl EthernetFrame {
    pub fn new(
        dest_mac: [u8; 6],
        src_mac: [u8; 6],
        ethertype: u16,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            dest_mac,
            src_mac,
            ethertype,
            payload: payload.into(),
        }
    }
}

/// Exactly one protocol-native frame.
///
/// The protocol tag is derived from the variant, so an envelope can never
/// claim one protocol while carrying another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusFrame {
    Can(CanFrame),
    Lin(LinFrame),
    FlexRay(FlexRayFrame),
    Ethernet(EthernetFrame),
}

impl BusFrame {
    /// The protocol of this frame.
    pub fn tag(&self) -> ProtocolTag {
        match self {
            BusFrame::Can(_) => ProtocolTag::Can,
            BusFrame::Lin(_) => ProtocolTag::Lin,
            BusFrame::FlexRay(_) => ProtocolTag::FlexRay,
            BusFrame::Ethernet(_) => ProtocolTag::Ethernet,
        }
    }

    /// The frame's native identifier, used as the backbone message id.
    pub fn native_id(&self) -> u32 {
        match self {
            BusFrame::Can(frame) => frame.id,
            BusFrame::Lin(frame) => u32::from(frame.id),
            BusFrame::FlexRay(frame) => u32::from(frame.frame_id),
            BusFrame::Ethernet(frame) => u32::from(frame.ethertype),
        }
    }

    /// Check that every length and identifier field is within protocol limits.
    pub fn validate(&self) -> Result<()> {
        match self {
            BusFrame::Can(frame) => {
                if frame.id > CAN_MAX_ID {
                    return Err(EnvelopeError::InvalidArgument(format!(
                        "CAN id 0x{:X} exceeds 29 bits",
                        frame.id
                    )));
                }
                checked_len(usize::from(frame.dlc), CAN_MAX_DLC, "CAN").map(drop)
            }
            BusFrame::Lin(frame) => checked_len(usize::from(frame.dlc), CAN_MAX_DLC, "LIN").map(drop),
            BusFrame::FlexRay(frame) => checked_len(
                usize::from(frame.payload_length),
                FLEXRAY_MAX_PAYLOAD,
                "FlexRay",
            )
            .map(drop),
            BusFrame::Ethernet(_) => Ok(()),
        }
    }
}

fn checked_len(len: usize, max: u8, protocol: &str) -> Result<u8> {
    if len > usize::from(max) {
        return Err(EnvelopeError::InvalidArgument(format!(
            "{protocol} payload length {len} exceeds {max}"
        )));
    }
    Ok(len as u8)
}

/// A protocol-native frame type that can be wrapped in a [`BusFrame`].
pub trait ProtocolFrame: Sized + Clone + Into<BusFrame> {
    /// Protocol of this frame type.
    const TAG: ProtocolTag;

    /// Borrow the frame if `frame` holds this protocol.
    fn from_bus_frame(frame: &BusFrame) -> Option<&Self>;
}

macro_rules! protocol_frame {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for BusFrame {
            fn from(frame: $ty) -> Self {
                BusFrame::$variant(frame)
            }
        }

        impl ProtocolFrame for $ty {
            const TAG: ProtocolTag = ProtocolTag::$variant;

            fn from_bus_frame(frame: &BusFrame) -> Option<&Self> {
                match frame {
                    BusFrame::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

protocol_frame!(CanFrame, Can);
protocol_frame!(LinFrame, Lin);
protocol_frame!(FlexRayFrame, FlexRay);
protocol_frame!(EthernetFrame, Ethernet);
