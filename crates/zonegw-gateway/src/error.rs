use std::time::Duration;

use zonegw_envelope::{EnvelopeError, ProtocolTag};
use zonegw_transport::TransportError;

/// Errors that can occur in gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A frame field is outside its protocol's valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The protocol tag is not one of the known bus protocols.
    #[error("unsupported protocol tag {0}")]
    UnsupportedProtocol(u32),

    /// The envelope carries a different protocol than requested.
    #[error("protocol mismatch: expected {expected}, envelope carries {actual}")]
    TypeMismatch {
        expected: ProtocolTag,
        actual: ProtocolTag,
    },

    /// The serialized envelope does not fit into the scratch buffer.
    #[error("serialization overflow ({needed} bytes, capacity {capacity})")]
    SerializationOverflow { needed: usize, capacity: usize },

    /// Bytes received from the backbone are not a valid envelope.
    #[error("corrupt envelope: {0}")]
    CorruptEnvelope(String),

    /// No message arrived within the receive bound.
    #[error("no message within {0:?}")]
    Timeout(Duration),

    /// Channel-level failure.
    #[error("transport error: {0}")]
    Transport(TransportError),
}

impl GatewayError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Timeouts, device and I/O failures, and corrupt data from the peer are
    /// transient. Misconfiguration and caller errors are not, including the
    /// transport's `MissingConfig`, `RegionTooSmall`, `EmptyPayload`,
    /// `MessageTooLarge` and `BufferTooSmall`.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Timeout(_) | GatewayError::CorruptEnvelope(_) => true,
            GatewayError::Transport(err) => !matches!(
                err,
                TransportError::MissingConfig(_)
                    | TransportError::RegionTooSmall { .. }
                    | TransportError::EmptyPayload
                    | TransportError::MessageTooLarge { .. }
                    | TransportError::BufferTooSmall { .. }
            ),
            _ => false,
        }
    }
}

impl From<EnvelopeError> for GatewayError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::InvalidArgument(msg) => GatewayError::InvalidArgument(msg),
            EnvelopeError::UnsupportedProtocol(tag) => GatewayError::UnsupportedProtocol(tag),
            EnvelopeError::SerializationOverflow { needed, capacity } => {
                GatewayError::SerializationOverflow { needed, capacity }
            }
            EnvelopeError::Malformed(msg) => GatewayError::CorruptEnvelope(msg),
        }
    }
}

impl From<TransportError> for GatewayError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(after) => GatewayError::Timeout(after),
            other => GatewayError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
