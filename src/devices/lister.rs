use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;

use crate::error::DeviceError;
use crate::hw::{DiscoveredDevice, UvcTransport};

/// Four-field projection of a discovered device.
///
/// Fields serialize in declaration order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct DeviceSummary {
    name: String,
    vendor: u16,
    product: u16,
    address: u8,
}

impl DeviceSummary {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn vendor(&self) -> u16 {
        self.vendor
    }

    #[must_use]
    pub fn product(&self) -> u16 {
        self.product
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }
}

impl From<DiscoveredDevice> for DeviceSummary {
    fn from(device: DiscoveredDevice) -> Self {
        let identity = *device.identity();
        Self {
            name: device.name().to_string(),
            vendor: identity.vendor(),
            product: identity.product(),
            address: identity.address(),
        }
    }
}

/// Enumerates attached UVC devices.
pub struct DeviceLister {
    transport: Arc<dyn UvcTransport>,
}

impl DeviceLister {
    #[must_use]
    pub fn new(transport: Arc<dyn UvcTransport>) -> Self {
        Self { transport }
    }

    /// # Errors
    ///
    /// Returns [`DeviceError::Discovery`] when the transport cannot enumerate
    /// devices.
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<DeviceSummary>, DeviceError> {
        let devices = self
            .transport
            .discover()
            .await
            .map_err(DeviceError::Discovery)?;
        Ok(devices.into_iter().map(DeviceSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::hw::DeviceIdentity;

    #[test]
    fn summary_keeps_field_order() -> anyhow::Result<()> {
        let summary = DeviceSummary::from(DiscoveredDevice::new(
            "HD Pro Webcam C920",
            DeviceIdentity::new(0x046d, 0x082d, 7),
        ));

        assert_eq!(
            r#"{"name":"HD Pro Webcam C920","vendor":1133,"product":2093,"address":7}"#,
            serde_json::to_string(&summary)?
        );
        Ok(())
    }
}
