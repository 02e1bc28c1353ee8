//! Boundary between a gateway and its local in-vehicle bus.

use std::io;

use tracing::info;
use zonegw_envelope::{BusFrame, CanFrame, ProtocolTag};

/// A local bus the gateway reads frames from and writes frames to.
pub trait BusPort {
    /// Protocol spoken on this bus.
    fn protocol(&self) -> ProtocolTag;

    /// Read the next frame from the bus.
    fn receive_frame(&mut self) -> io::Result<BusFrame>;

    /// Put a frame on the bus.
    fn send_frame(&mut self, frame: &BusFrame) -> io::Result<()>;
}

/// Identifier used by [`SimulatedCanBus`] for generated frames.
pub const SIMULATED_CAN_ID: u32 = 0x123;

/// In-memory CAN bus.
///
/// Each received frame has id 0x123, dlc 8 and data `counter + i`, with the
/// counter advancing (and wrapping) per frame. Frames sent to the bus are
/// logged and recorded.
#[derive(Debug, Default)]
pub struct SimulatedCanBus {
    counter: u8,
    sent: Vec<BusFrame>,
}

impl SimulatedCanBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames sent to this bus so far, oldest first.
    pub fn sent(&self) -> &[BusFrame] {
        &self.sent
    }

    fn next_frame(&mut self) -> CanFrame {
        let mut data = [0u8; 8];
        for (i, byte) in data.iter_mut().enumerate() {
            *byte = self.counter.wrapping_add(i as u8);
        }
        self.counter = self.counter.wrapping_add(1);
        CanFrame {
            id: SIMULATED_CAN_ID,
            dlc: 8,
            data,
            flags: 0,
        }
    }
}

impl BusPort for SimulatedCanBus {
    fn protocol(&self) -> ProtocolTag {
        ProtocolTag::Can
    }

    fn receive_frame(&mut self) -> io::Result<BusFrame> {
        Ok(self.next_frame().into())
    }

    fn send_frame(&mut self, frame: &BusFrame) -> io::Result<()> {
        if let BusFrame::Can(can) = frame {
            info!(
                id = %format!("{:#X}", can.id),
                data = ?can.payload(),
                "simulated CAN send"
            );
        }
        self.sent.push(frame.clone());
        Ok(())
    }
}
