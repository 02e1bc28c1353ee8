use tracing::debug;

use crate::error::{Result, TransportError};

/// Default environment variable prefix (`PCIE_DEVICE_ID`, ...).
pub const DEFAULT_ENV_PREFIX: &str = "PCIE";

/// Identity of the backbone device a channel binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Opaque hardware-resource identifier, e.g. `0000:03:00.0`.
    pub device_id: String,
    pub vendor_id: String,
    pub subsystem_id: String,
}

/// Source of device configuration.
///
/// A channel resolves its configuration each time it opens a direction, so
/// all three values must be present at open time.
pub trait ConfigProvider {
    fn device_id(&self) -> Option<String>;
    fn vendor_id(&self) -> Option<String>;
    fn subsystem_id(&self) -> Option<String>;

    /// Collect all values, failing on the first absent one.
    fn resolve(&self) -> Result<DeviceConfig> {
        let device_id = self
            .device_id()
            .ok_or(TransportError::MissingConfig("device_id"))?;
        let vendor_id = self
            .vendor_id()
            .ok_or(TransportError::MissingConfig("vendor_id"))?;
        let subsystem_id = self
            .subsystem_id()
            .ok_or(TransportError::MissingConfig("subsystem_id"))?;
        Ok(DeviceConfig {
            device_id,
            vendor_id,
            subsystem_id,
        })
    }
}

/// Configuration supplied directly by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticConfig {
    pub device_id: Option<String>,
    pub vendor_id: Option<String>,
    pub subsystem_id: Option<String>,
}

impl StaticConfig {
    /// A complete configuration.
    pub fn new(
        device_id: impl Into<String>,
        vendor_id: impl Into<String>,
        subsystem_id: impl Into<String>,
    ) -> Self {
        Self {
            device_id: Some(device_id.into()),
            vendor_id: Some(vendor_id.into()),
            subsystem_id: Some(subsystem_id.into()),
        }
    }
}

impl ConfigProvider for StaticConfig {
    fn device_id(&self) -> Option<String> {
        self.device_id.clone()
    }

    fn vendor_id(&self) -> Option<String> {
        self.vendor_id.clone()
    }

    fn subsystem_id(&self) -> Option<String> {
        self.subsystem_id.clone()
    }
}

impl From<DeviceConfig> for StaticConfig {
    fn from(config: DeviceConfig) -> Self {
        Self::new(config.device_id, config.vendor_id, config.subsystem_id)
    }
}

/// Configuration read from `<PREFIX>_DEVICE_ID`, `<PREFIX>_VENDOR_ID` and
/// `<PREFIX>_SUBSYSTEM_ID` on every lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn var(&self, suffix: &str) -> Option<String> {
        let name = format!("{}_{suffix}", self.prefix);
        let value = std::env::var(&name).ok().filter(|v| !v.is_empty());
        if value.is_none() {
            debug!(%name, "environment variable not set");
        }
        value
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigProvider for EnvConfig {
    fn device_id(&self) -> Option<String> {
        self.var("DEVICE_ID")
    }

    fn vendor_id(&self) -> Option<String> {
        self.var("VENDOR_ID")
    }

    fn subsystem_id(&self) -> Option<String> {
        self.var("SUBSYSTEM_ID")
    }
}
