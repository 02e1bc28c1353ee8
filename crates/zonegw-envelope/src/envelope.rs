use crate::clock::monotonic_micros;
use crate::frame::{BusFrame, ProtocolTag};
use crate::wire::BUS_ENVELOPE_SIZE;

/// One bus frame plus the monotonic time it was captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEnvelope {
    /// Monotonic clock reading in microseconds.
    pub timestamp_us: u64,
    pub frame: BusFrame,
}

impl BusEnvelope {
    /// Wrap a frame, stamping it with the current monotonic time.
    pub fn new(frame: impl Into<BusFrame>) -> Self {
        Self::with_timestamp(frame, monotonic_micros())
    }

    /// Wrap a frame with an explicit timestamp.
    pub fn with_timestamp(frame: impl Into<BusFrame>, timestamp_us: u64) -> Self {
        Self {
            timestamp_us,
            frame: frame.into(),
        }
    }

    pub fn tag(&self) -> ProtocolTag {
        self.frame.tag()
    }
}

/// A bus envelope with backbone routing metadata.
///
/// `message_id` and `payload_size` are derived from the inner envelope when
/// the value is built and cannot be set independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcieEnvelope {
    zone_id: u32,
    device_id: u32,
    message_id: u32,
    priority: u32,
    payload_size: u32,
    inner: BusEnvelope,
}

impl PcieEnvelope {
    /// Route `inner` to `zone_id`/`device_id` with the given priority (0 = highest).
    pub fn new(zone_id: u32, device_id: u32, priority: u32, inner: BusEnvelope) -> Self {
        Self {
            zone_id,
            device_id,
            message_id: inner.frame.native_id(),
            priority,
            payload_size: BUS_ENVELOPE_SIZE as u32,
            inner,
        }
    }

    pub fn zone_id(&self) -> u32 {
        self.zone_id
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    /// Native identifier of the inner frame.
    pub fn message_id(&self) -> u32 {
        self.message_id
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Serialized size of the inner bus envelope.
    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    pub fn tag(&self) -> ProtocolTag {
        self.inner.tag()
    }

    pub fn inner(&self) -> &BusEnvelope {
        &self.inner
    }

    pub fn into_inner(self) -> BusEnvelope {
        self.inner
    }
}
