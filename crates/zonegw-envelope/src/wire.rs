//! Fixed-size binary layout of [`PcieEnvelope`].
//!
//! Wire format (all fields little-endian):
//! ```text
//! ┌─────────────── routing header (20B) ───────────────┬── bus envelope (84B) ──────────┐
//! │ zone_id │ device_id │ message_id │ priority │ size  │ tag │ timestamp │ payload area │
//! │ u32     │ u32       │ u32        │ u32      │ u32   │ u32 │ u64       │ 72B, padded  │
//! └─────────┴───────────┴────────────┴──────────┴───────┴─────┴───────────┴──────────────┘
//! ```
//!
//! Payload area contents by protocol:
//! - CAN: id u32, dlc u8, data[8], flags u8
//! - LIN: id u8, dlc u8, data[8], checksum u8
//! - FlexRay: frame_id u16, payload_length u8, data[64], channel u8, cycle u8
//! - Ethernet: dest_mac[6], src_mac[6], ethertype u16, payload_len u16, payload

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::envelope::{BusEnvelope, PcieEnvelope};
use crate::error::{EnvelopeError, Result};
use crate::frame::{BusFrame, CanFrame, EthernetFrame, FlexRayFrame, LinFrame, ProtocolTag};

/// Routing header: five u32 fields.
pub const ROUTING_HEADER_SIZE: usize = 20;
/// Bus envelope header: tag (4) + timestamp (8).
pub const BUS_HEADER_SIZE: usize = 12;
/// Payload area, sized for the largest variant (FlexRay needs 69 bytes).
pub const PAYLOAD_AREA_SIZE: usize = 72;
/// Serialized size of a [`BusEnvelope`].
pub const BUS_ENVELOPE_SIZE: usize = BUS_HEADER_SIZE + PAYLOAD_AREA_SIZE;
/// Serialized size of a [`PcieEnvelope`], identical for every protocol.
pub const PCIE_ENVELOPE_SIZE: usize = ROUTING_HEADER_SIZE + BUS_ENVELOPE_SIZE;

const ETHERNET_HEADER_SIZE: usize = 16;
/// Largest Ethernet payload that fits into the payload area.
pub const ETHERNET_MAX_PAYLOAD: usize = PAYLOAD_AREA_SIZE - ETHERNET_HEADER_SIZE;

/// Append the wire form of `envelope` to `dst`.
///
/// Fails with `InvalidArgument` for out-of-range frame fields and with
/// `SerializationOverflow` when an Ethernet payload exceeds the payload area.
pub fn encode_envelope(envelope: &PcieEnvelope, dst: &mut BytesMut) -> Result<()> {
    let inner = envelope.inner();
    inner.frame.validate()?;
    if let BusFrame::Ethernet(frame) = &inner.frame {
        if frame.payload.len() > ETHERNET_MAX_PAYLOAD {
            return Err(EnvelopeError::SerializationOverflow {
                needed: ETHERNET_HEADER_SIZE + frame.payload.len(),
                capacity: PAYLOAD_AREA_SIZE,
            });
        }
    }

    dst.reserve(PCIE_ENVELOPE_SIZE);
    dst.put_u32_le(envelope.zone_id());
    dst.put_u32_le(envelope.device_id());
    dst.put_u32_le(envelope.message_id());
    dst.put_u32_le(envelope.priority());
    dst.put_u32_le(envelope.payload_size());
    dst.put_u32_le(inner.tag() as u32);
    dst.put_u64_le(inner.timestamp_us);

    let area_start = dst.len();
    match &inner.frame {
        BusFrame::Can(frame) => {
            dst.put_u32_le(frame.id);
            dst.put_u8(frame.dlc);
            dst.put_slice(&frame.data);
            dst.put_u8(frame.flags);
        }
        BusFrame::Lin(frame) => {
            dst.put_u8(frame.id);
            dst.put_u8(frame.dlc);
            dst.put_slice(&frame.data);
            dst.put_u8(frame.checksum);
        }
        BusFrame::FlexRay(frame) => {
            dst.put_u16_le(frame.frame_id);
            dst.put_u8(frame.payload_length);
            dst.put_slice(&frame.data);
            dst.put_u8(frame.channel);
            dst.put_u8(frame.cycle);
        }
        BusFrame::Ethernet(frame) => {
            dst.put_slice(&frame.dest_mac);
            dst.put_slice(&frame.src_mac);
            dst.put_u16_le(frame.ethertype);
            dst.put_u16_le(frame.payload.len() as u16);
            dst.put_slice(&frame.payload);
        }
    }
    let written = dst.len() - area_start;
    dst.put_bytes(0, PAYLOAD_AREA_SIZE - written);
    Ok(())
}

/// Decode one envelope from exactly [`PCIE_ENVELOPE_SIZE`] bytes.
pub fn decode_envelope(src: &[u8]) -> Result<PcieEnvelope> {
    if src.len() != PCIE_ENVELOPE_SIZE {
        return Err(EnvelopeError::Malformed(format!(
            "expected {PCIE_ENVELOPE_SIZE} bytes, got {}",
            src.len()
        )));
    }

    let mut buf = src;
    let zone_id = buf.get_u32_le();
    let device_id = buf.get_u32_le();
    let message_id = buf.get_u32_le();
    let priority = buf.get_u32_le();
    let payload_size = buf.get_u32_le();
    if payload_size as usize != BUS_ENVELOPE_SIZE {
        return Err(EnvelopeError::Malformed(format!(
            "payload size {payload_size} does not match bus envelope size {BUS_ENVELOPE_SIZE}"
        )));
    }

    let tag = ProtocolTag::try_from(buf.get_u32_le())?;
    let timestamp_us = buf.get_u64_le();
    let frame = decode_frame(tag, &buf[..PAYLOAD_AREA_SIZE])?;

    let envelope = PcieEnvelope::new(
        zone_id,
        device_id,
        priority,
        BusEnvelope::with_timestamp(frame, timestamp_us),
    );
    if envelope.message_id() != message_id {
        return Err(EnvelopeError::Malformed(format!(
            "message id 0x{message_id:X} does not match {} frame id 0x{:X}",
            tag,
            envelope.message_id()
        )));
    }
    Ok(envelope)
}

fn decode_frame(tag: ProtocolTag, mut area: &[u8]) -> Result<BusFrame> {
    let frame = match tag {
        ProtocolTag::Can => {
            let id = area.get_u32_le();
            let dlc = area.get_u8();
            let mut data = [0u8; 8];
            area.copy_to_slice(&mut data);
            let flags = area.get_u8();
            BusFrame::Can(CanFrame {
                id,
                dlc,
                data,
                flags,
            })
        }
        ProtocolTag::Lin => {
            let id = area.get_u8();
            let dlc = area.get_u8();
            let mut data = [0u8; 8];
            area.copy_to_slice(&mut data);
            let checksum = area.get_u8();
            BusFrame::Lin(LinFrame {
                id,
                dlc,
                data,
                checksum,
            })
        }
        ProtocolTag::FlexRay => {
            let frame_id = area.get_u16_le();
            let payload_length = area.get_u8();
            let mut data = [0u8; 64];
            area.copy_to_slice(&mut data);
            let channel = area.get_u8();
            let cycle = area.get_u8();
            BusFrame::FlexRay(FlexRayFrame {
                frame_id,
                payload_length,
                data,
                channel,
                cycle,
            })
        }
        ProtocolTag::Ethernet => {
            let mut dest_mac = [0u8; 6];
            area.copy_to_slice(&mut dest_mac);
            let mut src_mac = [0u8; 6];
            area.copy_to_slice(&mut src_mac);
            let ethertype = area.get_u16_le();
            let len = usize::from(area.get_u16_le());
            if len > ETHERNET_MAX_PAYLOAD {
                return Err(EnvelopeError::Malformed(format!(
                    "ethernet payload length {len} exceeds {ETHERNET_MAX_PAYLOAD}"
                )));
            }
            BusFrame::Ethernet(EthernetFrame {
                dest_mac,
                src_mac,
                ethertype,
                payload: Bytes::copy_from_slice(&area[..len]),
            })
        }
    };

    frame.validate().map_err(|err| match err {
        EnvelopeError::InvalidArgument(msg) => EnvelopeError::Malformed(msg),
        other => other,
    })?;
    Ok(frame)
}
