/// Errors that can occur while building, encoding or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// A frame field is outside its protocol's valid range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The protocol tag is not one of the known bus protocols.
    #[error("unsupported protocol tag {0}")]
    UnsupportedProtocol(u32),

    /// The serialized form does not fit into the destination buffer.
    #[error("serialization overflow ({needed} bytes, capacity {capacity})")]
    SerializationOverflow { needed: usize, capacity: usize },

    /// The bytes on the wire do not describe a valid envelope.
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
