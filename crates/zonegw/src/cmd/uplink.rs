use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tracing::info;
use zonegw_gateway::{run_uplink, SimulatedCanBus};

use crate::cmd::{check_count, install_ctrlc_handler, Limited, UplinkArgs};
use crate::exit::{gateway_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: UplinkArgs, format: OutputFormat) -> CliResult<i32> {
    check_count(args.count)?;
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut gateway = args.device.gateway()?;
    let mut bus = Limited::reads(SimulatedCanBus::new(), args.count, running.clone());

    info!(interval = ?args.interval, "starting zone 1 gateway (CAN to backbone)");
    let result = run_uplink(
        &mut gateway,
        &mut bus,
        args.routing.into(),
        args.interval,
        &running,
    );
    gateway.cleanup();

    let stats = result.map_err(|err| gateway_error("uplink failed", err))?;
    print_stats("uplink", &stats, format);
    Ok(SUCCESS)
}
