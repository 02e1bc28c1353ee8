//! Zone gateway loops: bus to backbone (uplink) and backbone to bus (downlink).
//!
//! Both loops run until the shared run flag is cleared. Transient failures
//! are logged and retried; programmer errors end the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};
use zonegw_envelope::BusEnvelope;
use zonegw_transport::{ConfigProvider, ReadinessProbe};

use crate::adapter::{envelope_to_frame, Routing};
use crate::bus::BusPort;
use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;

/// Zone of the uplink gateway.
pub const UPLINK_ZONE_ID: u32 = 1;
/// Device id the uplink gateway routes to.
pub const UPLINK_DEVICE_ID: u32 = 42;
/// Pause between uplink frames.
pub const DEFAULT_UPLINK_INTERVAL: Duration = Duration::from_secs(1);

const PAUSE_SLICE: Duration = Duration::from_millis(50);

/// Counters reported when a loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneStats {
    /// Frames moved to their destination.
    pub forwarded: u64,
    /// Envelopes dropped because the local bus does not speak their protocol.
    pub ignored: u64,
    /// Transient failures that were retried.
    pub retried: u64,
}

/// Read frames from `bus` and route them over the backbone.
pub fn run_uplink<P, R, B>(
    gateway: &mut Gateway<P, R>,
    bus: &mut B,
    routing: Routing,
    interval: Duration,
    running: &AtomicBool,
) -> Result<ZoneStats>
where
    P: ConfigProvider,
    R: ReadinessProbe,
    B: BusPort,
{
    info!(zone_id = routing.zone_id, device_id = routing.device_id, "uplink started");
    let mut stats = ZoneStats::default();

    while running.load(Ordering::SeqCst) {
        match bus.receive_frame() {
            Ok(frame) => {
                let envelope = BusEnvelope::new(frame);
                match gateway.send_bus_message(&envelope, routing) {
                    Ok(()) => {
                        stats.forwarded += 1;
                        debug!(forwarded = stats.forwarded, "frame sent to backbone");
                    }
                    Err(err) if err.is_transient() => {
                        stats.retried += 1;
                        warn!(error = %err, "backbone send failed, retrying");
                    }
                    Err(err) => return Err(err),
                }
            }
            Err(err) => {
                stats.retried += 1;
                warn!(error = %err, "bus read failed, retrying");
            }
        }
        pause(interval, running);
    }

    info!(?stats, "uplink stopped");
    Ok(stats)
}

/// Receive envelopes from the backbone and put matching frames on `bus`.
///
/// Reading the inbound region does not consume it, so an envelope identical
/// in message id, timestamp and zone to the previous one is the same message
/// and is not delivered again. Envelopes for a protocol other than the bus's
/// are logged and skipped.
/// `retry_delay` is waited after a transient failure; plain timeouts are
/// retried immediately.
pub fn run_downlink<P, R, B>(
    gateway: &mut Gateway<P, R>,
    bus: &mut B,
    retry_delay: Duration,
    running: &AtomicBool,
) -> Result<ZoneStats>
where
    P: ConfigProvider,
    R: ReadinessProbe,
    B: BusPort,
{
    info!(protocol = %bus.protocol(), "downlink started");
    let mut stats = ZoneStats::default();
    let mut last_seen = None;

    while running.load(Ordering::SeqCst) {
        let envelope = match gateway.receive_bus_message() {
            Ok(envelope) => envelope,
            Err(GatewayError::Timeout(_)) => continue,
            Err(err) if err.is_transient() => {
                stats.retried += 1;
                warn!(error = %err, "backbone receive failed, retrying");
                pause(retry_delay, running);
                continue;
            }
            Err(err) => return Err(err),
        };
        let key = (
            envelope.message_id(),
            envelope.inner().timestamp_us,
            envelope.zone_id(),
        );
        if last_seen == Some(key) {
            trace!(message_id = key.0, "envelope already handled");
            continue;
        }
        last_seen = Some(key);
        info!(
            zone_id = envelope.zone_id(),
            device_id = envelope.device_id(),
            "received message"
        );

        let frame = match envelope_to_frame(&envelope, bus.protocol()) {
            Ok(frame) => frame,
            Err(GatewayError::TypeMismatch { actual, .. }) => {
                stats.ignored += 1;
                info!(protocol = %actual, "ignoring message for another protocol");
                continue;
            }
            Err(err) => return Err(err),
        };
        match bus.send_frame(&frame) {
            Ok(()) => stats.forwarded += 1,
            Err(err) => {
                stats.retried += 1;
                warn!(error = %err, "bus write failed");
            }
        }
    }

    info!(?stats, "downlink stopped");
    Ok(stats)
}

/// Sleep for `total`, waking early once the run flag is cleared.
fn pause(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        thread::sleep(remaining.min(PAUSE_SLICE));
    }
}
