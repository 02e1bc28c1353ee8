use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use tracing::debug;
use zonegw_envelope::{BusFrame, ProtocolTag};
use zonegw_gateway::{BusPort, Gateway, GatewayConfig, Routing, UPLINK_DEVICE_ID, UPLINK_ZONE_ID};
use zonegw_transport::{ChannelConfig, ConfigProvider, StaticConfig, DEFAULT_DEVICE_ROOT};

use crate::exit::{transport_error, CliError, CliResult, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod downlink;
pub mod recv;
pub mod send;
pub mod uplink;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Zone 1 gateway: forward simulated CAN frames to the backbone.
    Uplink(UplinkArgs),
    /// Zone 2 gateway: deliver CAN frames from the backbone to the local bus.
    Downlink(DownlinkArgs),
    /// Send a single bus frame over the backbone.
    Send(SendArgs),
    /// Receive and print envelopes from the backbone.
    Recv(RecvArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Uplink(args) => uplink::run(args, format),
        Command::Downlink(args) => downlink::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Recv(args) => recv::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Backbone device selection, shared by every gateway subcommand.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Backbone device identifier (e.g. 0000:03:00.0).
    #[arg(long, env = "PCIE_DEVICE_ID")]
    pub device_id: Option<String>,
    /// Backbone vendor identifier.
    #[arg(long, env = "PCIE_VENDOR_ID")]
    pub vendor_id: Option<String>,
    /// Backbone subsystem identifier.
    #[arg(long, env = "PCIE_SUBSYSTEM_ID")]
    pub subsystem_id: Option<String>,
    /// Directory holding one subdirectory per device.
    #[arg(long, value_name = "DIR", default_value = DEFAULT_DEVICE_ROOT)]
    pub device_root: PathBuf,
    /// Maximum wait for inbound data (e.g. 100ms, 2s).
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub poll_timeout: Duration,
}

impl DeviceArgs {
    /// Build a gateway, failing early when an identifier is missing.
    pub fn gateway(&self) -> CliResult<Gateway<StaticConfig>> {
        let provider = StaticConfig {
            device_id: self.device_id.clone(),
            vendor_id: self.vendor_id.clone(),
            subsystem_id: self.subsystem_id.clone(),
        };
        let device = provider
            .resolve()
            .map_err(|err| transport_error("invalid device configuration", err))?;
        debug!(device_id = %device.device_id, root = ?self.device_root, "backbone device selected");

        let config = GatewayConfig {
            channel: ChannelConfig {
                device_root: self.device_root.clone(),
                poll_timeout: self.poll_timeout,
                ..ChannelConfig::default()
            },
            ..GatewayConfig::default()
        };
        Ok(Gateway::with_config(provider, config))
    }
}

/// Backbone routing for outgoing frames.
#[derive(Args, Debug, Clone, Copy)]
pub struct RoutingArgs {
    /// Source zone written into the envelope.
    #[arg(long, default_value_t = UPLINK_ZONE_ID)]
    pub zone: u32,
    /// Destination device written into the envelope.
    #[arg(long, default_value_t = UPLINK_DEVICE_ID)]
    pub dest_device: u32,
    /// Priority, 0 is highest.
    #[arg(long, default_value_t = 0)]
    pub priority: u32,
}

impl From<RoutingArgs> for Routing {
    fn from(args: RoutingArgs) -> Self {
        Routing::new(args.zone, args.dest_device).with_priority(args.priority)
    }
}

#[derive(Args, Debug)]
pub struct UplinkArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub routing: RoutingArgs,
    /// Pause between frames (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub interval: Duration,
    /// Exit after reading N frames from the bus.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DownlinkArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Wait after a failed receive before retrying.
    #[arg(long, default_value = "1s", value_parser = parse_duration)]
    pub retry_delay: Duration,
    /// Exit after delivering N frames to the bus.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    Can,
    Lin,
    Flexray,
    Ethernet,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    #[command(flatten)]
    pub routing: RoutingArgs,
    /// Bus protocol of the frame.
    #[arg(long, short = 'p', default_value = "can")]
    pub protocol: Protocol,
    /// Native identifier: CAN/LIN id, FlexRay frame id or Ethernet ethertype.
    /// Accepts decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_u32)]
    pub id: u32,
    /// Frame data as hex (e.g. 0011223344556677).
    #[arg(long, value_parser = parse_hex)]
    pub data: Option<HexBytes>,
    /// LIN checksum.
    #[arg(long, default_value_t = 0)]
    pub checksum: u8,
    /// FlexRay channel.
    #[arg(long, default_value_t = 0)]
    pub fr_channel: u8,
    /// FlexRay cycle.
    #[arg(long, default_value_t = 0)]
    pub cycle: u8,
    /// Ethernet destination MAC (aa:bb:cc:dd:ee:ff).
    #[arg(long, default_value = "00:00:00:00:00:00", value_parser = parse_mac)]
    pub dest_mac: [u8; 6],
    /// Ethernet source MAC.
    #[arg(long, default_value = "00:00:00:00:00:00", value_parser = parse_mac)]
    pub src_mac: [u8; 6],
}

#[derive(Args, Debug)]
pub struct RecvArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Number of envelopes to print.
    #[arg(long, default_value_t = 1)]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build and wire-format details.
    #[arg(long)]
    pub extended: bool,
}

/// Hex-decoded frame data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

pub fn parse_u32(input: &str) -> Result<u32, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid identifier {input:?}: {err}"))
}

pub fn parse_hex(input: &str) -> Result<HexBytes, String> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    if digits.len() % 2 != 0 {
        return Err("hex data must have an even number of digits".to_string());
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(HexBytes)
}

pub fn parse_mac(input: &str) -> Result<[u8; 6], String> {
    let bytes = parse_hex(input)?.0;
    bytes
        .try_into()
        .map_err(|_| format!("MAC address must be 6 bytes: {input}"))
}

/// Clear `running` on Ctrl-C.
pub fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Reject a zero `--count`, which would never do anything.
pub fn check_count(count: Option<u64>) -> CliResult<()> {
    if count == Some(0) {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    Ok(())
}

/// Bus wrapper that clears the run flag once `limit` frames have passed in
/// the counted direction.
pub struct Limited<B> {
    inner: B,
    limit: Option<u64>,
    seen: u64,
    count_sends: bool,
    running: Arc<AtomicBool>,
}

impl<B: BusPort> Limited<B> {
    /// Count frames read from the bus.
    pub fn reads(inner: B, limit: Option<u64>, running: Arc<AtomicBool>) -> Self {
        Self::new(inner, limit, false, running)
    }

    /// Count frames written to the bus.
    pub fn writes(inner: B, limit: Option<u64>, running: Arc<AtomicBool>) -> Self {
        Self::new(inner, limit, true, running)
    }

    fn new(inner: B, limit: Option<u64>, count_sends: bool, running: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            limit,
            seen: 0,
            count_sends,
            running,
        }
    }

    fn tick(&mut self) {
        self.seen += 1;
        if self.limit.is_some_and(|limit| self.seen >= limit) {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}

impl<B: BusPort> BusPort for Limited<B> {
    fn protocol(&self) -> ProtocolTag {
        self.inner.protocol()
    }

    fn receive_frame(&mut self) -> io::Result<BusFrame> {
        let frame = self.inner.receive_frame()?;
        if !self.count_sends {
            self.tick();
        }
        Ok(frame)
    }

    fn send_frame(&mut self, frame: &BusFrame) -> io::Result<()> {
        self.inner.send_frame(frame)?;
        if self.count_sends {
            self.tick();
        }
        Ok(())
    }
}
