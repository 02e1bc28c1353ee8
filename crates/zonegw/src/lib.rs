//! Zonal automotive gateway over a memory-mapped backbone.
//!
//! zonegw wraps CAN, LIN, FlexRay and automotive Ethernet frames in a unified,
//! fixed-size envelope and moves them between vehicle zones over a simulated
//! hardware FIFO.
//!
//! # Crate Structure
//!
//! - [`envelope`]: frame shapes, tagged envelope, wire layout, legacy header codec
//! - [`transport`]: device configuration and the mmap-backed duplex channel
//! - [`gateway`]: protocol adapter, gateway orchestration and zone loops

/// Re-export envelope types.
pub mod envelope {
    pub use zonegw_envelope::*;
}

/// Re-export transport types.
pub mod transport {
    pub use zonegw_transport::*;
}

/// Re-export gateway types.
pub mod gateway {
    pub use zonegw_gateway::*;
}
