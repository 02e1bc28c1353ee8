use zonegw_envelope::{BUS_ENVELOPE_SIZE, ETHERNET_MAX_PAYLOAD, LEGACY_WIRE_SIZE, PCIE_ENVELOPE_SIZE};
use zonegw_transport::{DEFAULT_POLL_TIMEOUT, DEFAULT_REGION_SIZE};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("zonegw {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: zonegw");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ZONEGW_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("ZONEGW_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("envelope_size: {PCIE_ENVELOPE_SIZE} (bus envelope {BUS_ENVELOPE_SIZE})");
    println!("ethernet_max_payload: {ETHERNET_MAX_PAYLOAD}");
    println!("legacy_frame_size: {LEGACY_WIRE_SIZE}");
    println!("region_size: {DEFAULT_REGION_SIZE}");
    println!("poll_timeout: {DEFAULT_POLL_TIMEOUT:?}");

    Ok(SUCCESS)
}
