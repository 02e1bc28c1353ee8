use std::path::PathBuf;
use std::time::Duration;

/// Errors that can occur on the backbone channel.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A required configuration value is absent.
    #[error("missing configuration value: {0}")]
    MissingConfig(&'static str),

    /// The configured region cannot hold a length prefix and one byte.
    #[error("region size {size} too small (minimum {min})")]
    RegionTooSmall { size: usize, min: usize },

    /// Failed to open the device resource.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to memory-map the device resource.
    #[error("failed to map {path}: {source}")]
    Map {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The framed message does not fit into the mapped region.
    #[error("message too large ({size} bytes framed, region {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Zero-length messages cannot be framed.
    #[error("refusing to send an empty message")]
    EmptyPayload,

    /// The length prefix in the region is zero or exceeds the region.
    #[error("corrupt frame (length prefix {len}, max {max})")]
    CorruptFrame { len: usize, max: usize },

    /// The caller's buffer cannot hold the framed message.
    #[error("receive buffer too small ({needed} bytes needed, {available} available)")]
    BufferTooSmall { needed: usize, available: usize },

    /// No data became ready within the wait bound.
    #[error("timed out after {0:?} waiting for data")]
    Timeout(Duration),

    /// The readiness wait itself failed.
    #[error("poll failed: {0}")]
    Poll(std::io::Error),

    /// Flushing the region to the device failed.
    #[error("msync failed: {0}")]
    Sync(std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
