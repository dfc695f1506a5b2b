use async_trait::async_trait;

use super::model::{ControlFields, DeviceIdentity, DeviceSelector, DiscoveredDevice, FieldRange};
use crate::error::TransportError;

/// Device discovery and connection factory for UVC cameras.
#[async_trait]
pub trait UvcTransport: Send + Sync {
    /// Lists attached devices exposing a Video Control interface.
    async fn discover(&self) -> Result<Vec<DiscoveredDevice>, TransportError>;

    /// Opens the first device matching every specified selector field.
    ///
    /// Returns [`TransportError::NoMatchingDevice`] when nothing matches.
    async fn open(
        &self,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn DeviceConnection>, TransportError>;
}

/// One open connection to a UVC device.
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    /// Identity of the opened device.
    fn identity(&self) -> DeviceIdentity;

    /// Registry names of the controls the device advertises.
    fn supported_controls(&self) -> &[String];

    /// Reads the current value of a control.
    async fn get(&self, name: &str) -> Result<ControlFields, TransportError>;

    /// Reads the minimum and maximum of a control.
    async fn range(&self, name: &str) -> Result<FieldRange, TransportError>;

    /// Writes one value per field, in field order.
    async fn set(&self, name: &str, values: &[i64]) -> Result<(), TransportError>;

    /// Releases the device.
    async fn close(&self) -> Result<(), TransportError>;
}
