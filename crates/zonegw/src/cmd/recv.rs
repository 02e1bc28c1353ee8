use crate::cmd::RecvArgs;
use crate::exit::{gateway_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: RecvArgs, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    let mut gateway = args.device.gateway()?;

    let mut result = Ok(SUCCESS);
    for _ in 0..args.count {
        match gateway.receive_bus_message() {
            Ok(envelope) => print_envelope(&envelope, format),
            Err(err) => {
                result = Err(gateway_error("receive failed", err));
                break;
            }
        }
    }
    gateway.cleanup();
    result
}
