//! Memory-mapped backbone channel for zonal gateways.
//!
//! A [`Channel`] models a hardware FIFO as two independent directions, each a
//! shared 4 KiB mapping of a device resource file:
//! - outbound: `<device-root>/<device-id>/resource0`
//! - inbound: `<device-root>/<device-id>/resource1`
//!
//! Messages are framed with a 4-byte native-order length prefix. Resources are
//! acquired lazily on first use and released by [`Channel::cleanup`] or drop.
//!
//! This is the lowest layer of zonegw; the gateway crate serializes envelopes
//! on top of it.

pub mod config;
pub mod error;

#[cfg(unix)]
pub mod channel;
#[cfg(unix)]
mod region;

pub use config::{ConfigProvider, DeviceConfig, EnvConfig, StaticConfig};
pub use error::{Result, TransportError};

#[cfg(unix)]
pub use channel::{
    Channel, ChannelConfig, ChannelState, Direction, PollProbe, ReadinessProbe,
    DEFAULT_DEVICE_ROOT, DEFAULT_POLL_TIMEOUT, DEFAULT_REGION_SIZE, LENGTH_PREFIX_SIZE,
    MIN_REGION_SIZE,
};
