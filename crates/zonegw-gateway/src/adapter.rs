//! Conversion between protocol-native frames and routed envelopes.

use tracing::trace;
use zonegw_envelope::{BusEnvelope, BusFrame, PcieEnvelope, ProtocolFrame, ProtocolTag};

use crate::error::{GatewayError, Result};

/// Backbone routing for an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Routing {
    pub zone_id: u32,
    pub device_id: u32,
    /// 0 is the highest priority.
    pub priority: u32,
}

impl Routing {
    /// Route to `zone_id`/`device_id` at the highest priority.
    pub fn new(zone_id: u32, device_id: u32) -> Self {
        Self {
            zone_id,
            device_id,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }
}

/// Wrap a native frame, stamped with the current monotonic time.
///
/// The message id is the frame's native identifier: CAN id, LIN id, FlexRay
/// frame id or Ethernet ethertype.
pub fn frame_to_envelope(frame: impl Into<BusFrame>, routing: Routing) -> Result<PcieEnvelope> {
    wrap(BusEnvelope::new(frame), routing)
}

/// Attach routing to an already stamped bus envelope.
pub fn wrap(inner: BusEnvelope, routing: Routing) -> Result<PcieEnvelope> {
    inner.frame.validate()?;
    let envelope = PcieEnvelope::new(routing.zone_id, routing.device_id, routing.priority, inner);
    trace!(
        zone_id = envelope.zone_id(),
        message_id = envelope.message_id(),
        tag = %envelope.tag(),
        "frame wrapped"
    );
    Ok(envelope)
}

/// Unwrap the frame if the envelope carries `expected`.
pub fn envelope_to_frame(envelope: &PcieEnvelope, expected: ProtocolTag) -> Result<BusFrame> {
    let actual = envelope.tag();
    if actual != expected {
        return Err(GatewayError::TypeMismatch { expected, actual });
    }
    Ok(envelope.inner().frame.clone())
}

/// Typed form of [`envelope_to_frame`].
pub fn extract<F: ProtocolFrame>(envelope: &PcieEnvelope) -> Result<F> {
    F::from_bus_frame(&envelope.inner().frame)
        .cloned()
        .ok_or(GatewayError::TypeMismatch {
            expected: F::TAG,
            actual: envelope.tag(),
        })
}

/// Interpret a raw wire tag.
pub fn protocol_tag_from_raw(raw: u32) -> Result<ProtocolTag> {
    Ok(ProtocolTag::try_from(raw)?)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use zonegw_envelope::{CanFrame, EthernetFrame, FlexRayFrame, LinFrame, BUS_ENVELOPE_SIZE};

    use super::*;

    #[test]
    fn can_frame_becomes_routed_envelope() {
        let frame = CanFrame::new(0x123, &[0, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let env = frame_to_envelope(frame, Routing::new(1, 42)).unwrap();

        assert_eq!(env.zone_id(), 1);
        assert_eq!(env.device_id(), 42);
        assert_eq!(env.message_id(), 0x123);
        assert_eq!(env.priority(), 0);
        assert_eq!(env.payload_size() as usize, BUS_ENVELOPE_SIZE);
        assert_eq!(env.tag(), ProtocolTag::Can);
    }

    #[test]
    fn message_id_follows_native_id() {
        let lin = frame_to_envelope(LinFrame::new(0x3C, &[1], 0xAA).unwrap(), Routing::new(0, 0));
        assert_eq!(lin.unwrap().message_id(), 0x3C);

        let fr = FlexRayFrame::new(0x155, &[9; 32], 1, 5).unwrap();
        assert_eq!(
            frame_to_envelope(fr, Routing::new(0, 0)).unwrap().message_id(),
            0x155
        );

        let eth = EthernetFrame::new([1; 6], [2; 6], 0x86DD, Bytes::from_static(b"ip"));
        assert_eq!(
            frame_to_envelope(eth, Routing::new(0, 0)).unwrap().message_id(),
            0x86DD
        );
    }

    #[test]
    fn priority_override() {
        let env = frame_to_envelope(
            CanFrame::default(),
            Routing::new(2, 3).with_priority(7),
        )
        .unwrap();
        assert_eq!(env.priority(), 7);
    }

    #[test]
    fn invalid_frames_are_rejected() {
        let bad_dlc = CanFrame {
            dlc: 9,
            ..CanFrame::default()
        };
        assert!(matches!(
            frame_to_envelope(bad_dlc, Routing::new(0, 0)),
            Err(GatewayError::InvalidArgument(_))
        ));

        let bad_len = FlexRayFrame {
            payload_length: 65,
            ..FlexRayFrame::default()
        };
        assert!(matches!(
            frame_to_envelope(bad_len, Routing::new(0, 0)),
            Err(GatewayError::InvalidArgument(_))
        ));

        let bad_id = CanFrame {
            id: 0x2000_0000,
            ..CanFrame::default()
        };
        assert!(matches!(
            frame_to_envelope(bad_id, Routing::new(0, 0)),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn extraction_checks_protocol() {
        let frame = CanFrame::new(0x7FF, &[0xDE, 0xAD]).unwrap();
        let env = frame_to_envelope(frame, Routing::new(1, 1)).unwrap();

        assert_eq!(
            envelope_to_frame(&env, ProtocolTag::Can).unwrap(),
            BusFrame::Can(frame)
        );
        assert_eq!(extract::<CanFrame>(&env).unwrap(), frame);

        assert!(matches!(
            envelope_to_frame(&env, ProtocolTag::Lin),
            Err(GatewayError::TypeMismatch {
                expected: ProtocolTag::Lin,
                actual: ProtocolTag::Can
            })
        ));
        assert!(matches!(
            extract::<EthernetFrame>(&env),
            Err(GatewayError::TypeMismatch {
                expected: ProtocolTag::Ethernet,
                ..
            })
        ));
    }

    #[test]
    fn can_round_trip_for_every_dlc() {
        for dlc in 0..=8u8 {
            let payload: Vec<u8> = (0..dlc).map(|i| 0xA0 + i).collect();
            let frame = CanFrame::new(0x18DA_F110, &payload).unwrap();
            let env = frame_to_envelope(frame, Routing::new(3, 9)).unwrap();

            let BusFrame::Can(back) = envelope_to_frame(&env, ProtocolTag::Can).unwrap() else {
                panic!("dlc {dlc}: expected a CAN frame");
            };
            assert_eq!(back.id, 0x18DA_F110, "dlc {dlc}");
            assert_eq!(back.dlc, dlc);
            assert_eq!(&back.data[..dlc as usize], payload.as_slice(), "dlc {dlc}");
            assert_eq!(env.message_id(), 0x18DA_F110);
        }
    }

    #[test]
    fn wrap_keeps_caller_timestamp() {
        let inner = BusEnvelope::with_timestamp(CanFrame::default(), 1234);
        let env = wrap(inner, Routing::new(0, 0)).unwrap();
        assert_eq!(env.inner().timestamp_us, 1234);
    }

    #[test]
    fn raw_tags() {
        assert_eq!(protocol_tag_from_raw(2).unwrap(), ProtocolTag::FlexRay);
        assert!(matches!(
            protocol_tag_from_raw(4),
            Err(GatewayError::UnsupportedProtocol(4))
        ));
    }
}
