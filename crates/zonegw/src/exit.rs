use std::fmt;
use std::io;

use zonegw_envelope::EnvelopeError;
use zonegw_gateway::GatewayError;
use zonegw_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_code(err: &io::Error) -> i32 {
    match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        _ => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::MissingConfig(_) | TransportError::RegionTooSmall { .. } => USAGE,
        TransportError::Open { source, .. } | TransportError::Map { source, .. } => {
            io_code(source)
        }
        TransportError::Timeout(_) => TIMEOUT,
        TransportError::MessageTooLarge { .. }
        | TransportError::EmptyPayload
        | TransportError::CorruptFrame { .. }
        | TransportError::BufferTooSmall { .. } => DATA_INVALID,
        TransportError::Poll(_) | TransportError::Sync(_) => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn gateway_error(context: &str, err: GatewayError) -> CliError {
    match err {
        GatewayError::Transport(err) => transport_error(context, err),
        GatewayError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

/// Frames built from command-line values fail on bad arguments.
pub fn frame_error(context: &str, err: EnvelopeError) -> CliError {
    CliError::new(USAGE, format!("{context}: {err}"))
}
