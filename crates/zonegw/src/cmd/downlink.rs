use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;
use zonegw_gateway::{run_downlink, SimulatedCanBus};

use crate::cmd::{check_count, install_ctrlc_handler, DownlinkArgs, Limited};
use crate::exit::{gateway_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: DownlinkArgs, format: OutputFormat) -> CliResult<i32> {
    check_count(args.count)?;
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut gateway = args.device.gateway()?;
    let mut bus = Limited::writes(SimulatedCanBus::new(), args.count, running.clone());

    info!("starting zone 2 gateway (backbone to CAN)");
    let result = run_downlink(&mut gateway, &mut bus, args.retry_delay, &running);
    gateway.cleanup();

    let stats = result.map_err(|err| gateway_error("downlink failed", err))?;
    print_stats("downlink", &stats, format);
    Ok(SUCCESS)
}
