mod fake_backend;
mod model;
mod nusb_backend;
mod registry;
mod transport;

pub(crate) use self::fake_backend::FakeBackendConfig;
pub use self::fake_backend::{ControlFixture, DeviceFixture, FailingControls, FakeTransport};
pub use self::model::{
    ControlFields, DeviceIdentity, DeviceSelector, DiscoveredDevice, FieldRange,
};
pub(crate) use self::nusb_backend::NusbTransport;
pub use self::registry::{
    ControlDescriptor, ControlField, ControlRegistry, ControlUnit, RequestCode,
};
pub use self::transport::{DeviceConnection, UvcTransport};
