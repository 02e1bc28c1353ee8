use tracing::{debug, info};
use zonegw_envelope::{decode_envelope, BusEnvelope, PcieEnvelope, ScratchBuffer, DEFAULT_SCRATCH_CAPACITY};
use zonegw_transport::{Channel, ChannelConfig, ConfigProvider, PollProbe, ReadinessProbe};

use crate::adapter::{wrap, Routing};
use crate::error::Result;

/// Buffer sizes for a [`Gateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Send-side serialization capacity. Default: 1024 bytes.
    pub scratch_capacity: usize,
    /// Receive buffer size. Default: 1024 bytes.
    pub receive_capacity: usize,
    pub channel: ChannelConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            scratch_capacity: DEFAULT_SCRATCH_CAPACITY,
            receive_capacity: DEFAULT_SCRATCH_CAPACITY,
            channel: ChannelConfig::default(),
        }
    }
}

/// Composes the protocol adapter with a backbone channel.
///
/// The gateway owns its channel, so resources are released on drop even
/// without an explicit [`Gateway::cleanup`].
#[derive(Debug)]
pub struct Gateway<P, R = PollProbe> {
    channel: Channel<P, R>,
    scratch: ScratchBuffer,
    recv_buf: Vec<u8>,
}

impl<P: ConfigProvider> Gateway<P> {
    pub fn new(provider: P) -> Self {
        Self::with_config(provider, GatewayConfig::default())
    }

    pub fn with_config(provider: P, config: GatewayConfig) -> Self {
        Self::from_channel(
            Channel::with_config(provider, config.channel),
            config.scratch_capacity,
            config.receive_capacity,
        )
    }
}

impl<P: ConfigProvider, R: ReadinessProbe> Gateway<P, R> {
    /// Wrap an existing channel.
    pub fn from_channel(
        channel: Channel<P, R>,
        scratch_capacity: usize,
        receive_capacity: usize,
    ) -> Self {
        Self {
            channel,
            scratch: ScratchBuffer::with_capacity(scratch_capacity),
            recv_buf: vec![0u8; receive_capacity],
        }
    }

    /// Route `envelope` over the backbone.
    ///
    /// The frame is validated and serialized before the channel is touched,
    /// so invalid input never opens a device resource.
    pub fn send_bus_message(&mut self, envelope: &BusEnvelope, routing: Routing) -> Result<()> {
        let routed = wrap(envelope.clone(), routing)?;
        let bytes = self.scratch.encode_envelope(&routed)?;
        self.channel.send(bytes)?;
        debug!(
            zone_id = routed.zone_id(),
            device_id = routed.device_id(),
            message_id = routed.message_id(),
            tag = %routed.tag(),
            "bus message sent"
        );
        Ok(())
    }

    /// Wait for one envelope from the backbone and decode it.
    pub fn receive_bus_message(&mut self) -> Result<PcieEnvelope> {
        let len = self.channel.receive(&mut self.recv_buf)?;
        let envelope = decode_envelope(&self.recv_buf[..len])?;
        debug!(
            zone_id = envelope.zone_id(),
            device_id = envelope.device_id(),
            message_id = envelope.message_id(),
            tag = %envelope.tag(),
            "bus message received"
        );
        Ok(envelope)
    }

    /// Release the backbone channel. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        self.channel.cleanup();
        info!("gateway cleaned up");
    }

    pub fn channel(&self) -> &Channel<P, R> {
        &self.channel
    }
}
