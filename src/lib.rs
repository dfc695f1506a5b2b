mod app;
mod cli;
mod controls;
mod devices;
mod dispatcher;
mod error;
mod handlers;
mod hw;
mod runtime;
mod telemetry;
mod terminal;
mod utils;

pub use app::{fake_transport, real_transport, run, run_with_clients};
pub use cli::{Args, Command, FakeArgs};
pub use controls::{
    CapabilityFlags, CapabilityTable, ControlAccessor, ControlClassifier, ControlRange,
    ControlRanges, ControlValue, ControlValues,
};
pub use devices::{DeviceFactory, DeviceLister, DeviceSummary, SelectorMismatchPolicy};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use error::{
    CommandError, ConfigError, ControlError, ControlOperation, DescriptorError, DeviceError,
    FixtureError, ImportError, TransportError,
};
pub use handlers::{
    Argument, ArgumentDescriptor, CommandHandler, CommandName, CommandRegistry, IMPORT_TIMEOUT,
    RuntimeField,
};
pub use hw::{
    ControlDescriptor, ControlField, ControlFields, ControlFixture, ControlRegistry, ControlUnit,
    DeviceConnection, DeviceFixture, DeviceIdentity, DeviceSelector, DiscoveredDevice,
    FailingControls, FakeTransport, FieldRange, RequestCode, UvcTransport,
};
pub use runtime::RuntimeConfiguration;
pub use terminal::TerminalClient;
