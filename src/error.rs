use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::hw::{DeviceIdentity, DeviceSelector};

/// Errors returned by UVC transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no UVC device matched the requested selector")]
    NoMatchingDevice,
    #[error("USB operation failed")]
    Usb(#[from] std::io::Error),
    #[error("USB control transfer failed")]
    Transfer(#[from] nusb::transfer::TransferError),
    #[error("failed to read device descriptors: {reason}")]
    Descriptors { reason: String },
    #[error("device does not expose a UVC video control interface")]
    MissingVideoControlInterface,
    #[error("control `{name}` is not in the control registry")]
    UnknownControl { name: String },
    #[error("control `{name}` is not supported by this device")]
    UnsupportedControl { name: String },
    #[error("control `{name}` takes {expected} value(s), got {actual}")]
    ValueCount {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("value {value} for field `{field}` of control `{name}` is outside {min}..={max}")]
    ValueOutOfRange {
        name: String,
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    #[error("control `{name}` returned {actual} byte(s), expected {expected}")]
    ShortResponse {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("simulated transfer stall on control `{name}`")]
    SimulatedStall { name: String },
    #[error("device connection is closed")]
    Closed,
}

/// Reasons a registry descriptor cannot be classified.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum DescriptorError {
    #[error("descriptor declares no payload fields")]
    NoFields,
    #[error("SET_CUR is listed as both mandatory and optional")]
    ConflictingSetRequest,
}

/// Single-control operation named in [`ControlError::Io`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
pub enum ControlOperation {
    #[display("get")]
    Get,
    #[display("set")]
    Set,
    #[display("get range of")]
    Range,
}

/// Errors returned by control classification and access.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("controls were not found in the control registry: {}", .names.join(", "))]
    UnknownControls { names: Vec<String> },
    #[error("controls were advertised more than once: {}", .names.join(", "))]
    DuplicateControls { names: Vec<String> },
    #[error("could not map control `{name}`")]
    Mapping {
        name: String,
        source: DescriptorError,
    },
    #[error("could not find a gettable control named `{name}`")]
    NotGettable { name: String },
    #[error("could not find a ranged control named `{name}`")]
    NotRanged { name: String },
    #[error("could not find a settable control named `{name}`")]
    NotSettable { name: String },
    #[error("could not find settable controls, aborting setting values: {}", .names.join(", "))]
    NonSettableControls { names: Vec<String> },
    #[error("failed to {operation} control `{name}`")]
    Io {
        name: String,
        operation: ControlOperation,
        source: TransportError,
    },
}

/// Errors returned when opening or enumerating devices.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("could not find UVC device, is a compatible camera connected? ({selector})")]
    NotFound {
        selector: DeviceSelector,
        source: TransportError,
    },
    #[error("could not open UVC device ({selector})")]
    Open {
        selector: DeviceSelector,
        source: TransportError,
    },
    #[error("opened device ({actual}) does not match the requested {fields} ({selector})", fields = .fields.join("/"))]
    SelectorMismatch {
        selector: DeviceSelector,
        actual: DeviceIdentity,
        fields: Vec<&'static str>,
    },
    #[error("failed to list UVC devices")]
    Discovery(#[source] TransportError),
    #[error("failed to close UVC device")]
    Close(#[source] TransportError),
}

/// Errors returned by the `import` command while reading its input.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error(
        "could not read configuration from stdin within the {} timeout, was any data piped in?",
        humantime::format_duration(*.timeout)
    )]
    Timeout { timeout: Duration },
    #[error("failed to read configuration from stdin")]
    Read(#[from] std::io::Error),
    #[error("stdin has already been consumed")]
    InputConsumed,
    #[error("configuration is not valid JSON")]
    Json(#[from] serde_json::Error),
    #[error("configuration must be a JSON object of control names to values")]
    NotObject,
    #[error("invalid value for control `{name}`: expected a number or an array of numbers")]
    InvalidValue {
        name: String,
        source: serde_json::Error,
    },
}

/// Errors returned when parsing fake transport fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("the fake device fixture is empty")]
    EmptyFixture,
    #[error("device fixture records must contain four pipe-delimited fields")]
    InvalidRecordFieldCount,
    #[error("device fixture records cannot contain empty fields")]
    EmptyRecordField,
    #[error("invalid number `{value}` in fixture")]
    InvalidNumber {
        value: String,
        source: std::num::ParseIntError,
    },
    #[error("control fixture entry `{entry}` must look like `name=value[,value]`")]
    InvalidControlEntry { entry: String },
}

/// Errors returned while resolving runtime configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{}`", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file `{}`", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid `{key}` value `{value}` in config file `{}`", .path.display())]
    InvalidNumber {
        path: PathBuf,
        key: &'static str,
        value: String,
    },
    #[error("could not determine the working directory")]
    WorkingDirectory(#[source] std::io::Error),
    #[error("missing fake device fixture while fake mode is enabled")]
    MissingFakeDeviceFixture,
}

/// Errors returned while assembling command arguments.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum CommandError {
    #[error("unknown command `{name}`")]
    UnknownCommand { name: String },
    #[error("command `{command}` requires a {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("command `{command}` received arguments that do not match its declaration")]
    InvalidArguments { command: &'static str },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}
