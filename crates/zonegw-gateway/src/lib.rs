//! Protocol adapter and gateway orchestration for zonal automotive gateways.
//!
//! A [`Gateway`] wraps native bus frames into routed envelopes, serializes
//! them into a size-checked scratch buffer and moves them over a backbone
//! [`Channel`](zonegw_transport::Channel). The [`zone`] loops connect a
//! gateway to a local [`BusPort`].
//!
//! ```no_run
//! use zonegw_envelope::{BusEnvelope, CanFrame};
//! use zonegw_gateway::{Gateway, Routing};
//! use zonegw_transport::EnvConfig;
//!
//! # fn main() -> zonegw_gateway::Result<()> {
//! let mut gateway = Gateway::new(EnvConfig::new());
//! let frame = CanFrame::new(0x123, &[0, 1, 2, 3, 4, 5, 6, 7])?;
//! gateway.send_bus_message(&BusEnvelope::new(frame), Routing::new(1, 42))?;
//! gateway.cleanup();
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod bus;
pub mod error;
pub mod gateway;
pub mod zone;

pub use adapter::{
    envelope_to_frame, extract, frame_to_envelope, protocol_tag_from_raw, wrap, Routing,
};
pub use bus::{BusPort, SimulatedCanBus, SIMULATED_CAN_ID};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayConfig};
pub use zone::{
    run_downlink, run_uplink, ZoneStats, DEFAULT_UPLINK_INTERVAL, UPLINK_DEVICE_ID,
    UPLINK_ZONE_ID,
};
