use tracing::info;
use zonegw_envelope::{BusEnvelope, BusFrame, CanFrame, EthernetFrame, FlexRayFrame, LinFrame};
use zonegw_gateway::Routing;

use crate::cmd::{Protocol, SendArgs};
use crate::exit::{frame_error, gateway_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let frame = build_frame(&args)?;
    let routing = Routing::from(args.routing);
    let mut gateway = args.device.gateway()?;

    let result = gateway.send_bus_message(&BusEnvelope::new(frame), routing);
    gateway.cleanup();
    result.map_err(|err| gateway_error("send failed", err))?;

    info!(
        zone_id = routing.zone_id,
        device_id = routing.device_id,
        "frame sent to backbone"
    );
    Ok(SUCCESS)
}

fn build_frame(args: &SendArgs) -> CliResult<BusFrame> {
    let data = args.data.as_ref().map(|d| d.0.as_slice()).unwrap_or_default();
    let frame = match args.protocol {
        Protocol::Can => CanFrame::new(args.id, data)
            .map_err(|err| frame_error("invalid CAN frame", err))?
            .into(),
        Protocol::Lin => {
            let id = narrow(args.id, "LIN id")?;
            LinFrame::new(id, data, args.checksum)
                .map_err(|err| frame_error("invalid LIN frame", err))?
                .into()
        }
        Protocol::Flexray => {
            let id = narrow(args.id, "FlexRay frame id")?;
            FlexRayFrame::new(id, data, args.fr_channel, args.cycle)
                .map_err(|err| frame_error("invalid FlexRay frame", err))?
                .into()
        }
        Protocol::Ethernet => {
            let ethertype = narrow(args.id, "ethertype")?;
            EthernetFrame::new(args.dest_mac, args.src_mac, ethertype, data.to_vec()).into()
        }
    };
    Ok(frame)
}

fn narrow<T: TryFrom<u32>>(value: u32, what: &str) -> CliResult<T> {
    T::try_from(value).map_err(|_| CliError::new(USAGE, format!("{what} {value:#X} out of range")))
}
