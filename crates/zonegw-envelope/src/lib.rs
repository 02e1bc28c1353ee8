//! Unified multi-protocol bus envelope for zonal gateways.
//!
//! Every in-vehicle frame (CAN, LIN, FlexRay, Ethernet) is wrapped in a
//! [`BusEnvelope`] and routed across the backbone inside a [`PcieEnvelope`]
//! carrying zone, device, message id and priority. The binary layout is
//! fixed-size so that every protocol serializes to the same number of bytes:
//!
//! ```text
//! ┌──────┬────────┬────────┬──────────┬──────────┬─────┬───────────┬────────────────┐
//! │ zone │ device │ msg id │ priority │ pl. size │ tag │ timestamp │ payload area   │
//! │ u32  │ u32    │ u32    │ u32      │ u32      │ u32 │ u64       │ 72 bytes       │
//! └──────┴────────┴────────┴──────────┴──────────┴─────┴───────────┴────────────────┘
//! ```
//!
//! The [`legacy`] module holds the older single-field scheme with a bit-packed
//! 64-bit header, kept for wire compatibility with existing peers.

pub mod clock;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod legacy;
pub mod scratch;
pub mod wire;

pub use clock::monotonic_micros;
pub use envelope::{BusEnvelope, PcieEnvelope};
pub use error::{EnvelopeError, Result};
pub use frame::{
    BusFrame, CanFrame, EthernetFrame, FlexRayFrame, LinFrame, ProtocolFrame, ProtocolTag,
};
pub use legacy::{LegacyBusType, LegacyFrame, SimpleEnvelope, LEGACY_PAYLOAD_SIZE, LEGACY_WIRE_SIZE};
pub use scratch::{ScratchBuffer, DEFAULT_SCRATCH_CAPACITY};
pub use wire::{
    decode_envelope, encode_envelope, BUS_ENVELOPE_SIZE, ETHERNET_MAX_PAYLOAD, PAYLOAD_AREA_SIZE,
    PCIE_ENVELOPE_SIZE,
};
