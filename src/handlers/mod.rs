//! Command handlers and the static command registry.

mod controls;
mod devices;
mod export;
mod get;
mod import;
mod range;
mod ranges;
mod set;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};
use tokio::io::AsyncRead;

use crate::controls::ControlAccessor;
use crate::devices::DeviceLister;
use crate::error::CommandError;
use crate::hw::UvcTransport;

pub use self::controls::ControlsCommand;
pub use self::devices::DevicesCommand;
pub use self::export::ExportCommand;
pub use self::get::GetCommand;
pub use self::import::{IMPORT_TIMEOUT, ImportCommand};
pub use self::range::RangeCommand;
pub use self::ranges::RangesCommand;
pub use self::set::SetCommand;

/// Closed set of commands understood by the dispatcher.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum CommandName {
    Get,
    Set,
    Range,
    Ranges,
    Controls,
    Devices,
    Export,
    Import,
}

/// Runtime configuration field a command reads as an argument.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RuntimeField {
    /// The control name.
    Control,
    /// The one or two numeric values.
    Values,
}

impl RuntimeField {
    /// Human-readable name used in missing-argument errors.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Control => "control name",
            Self::Values => "value",
        }
    }
}

/// One entry of a command's declared argument list.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArgumentDescriptor {
    /// Open a device and pass a [`ControlAccessor`] in this position.
    InjectAccessor,
    /// Pass the named runtime configuration field.
    Runtime(RuntimeField),
}

/// A resolved positional argument.
pub enum Argument<'a> {
    Accessor(&'a ControlAccessor<'a>),
    Control(String),
    Values(Vec<i64>),
}

/// Common capability set of every command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Arguments the command expects, in positional order.
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor];

    /// Runs the command, returning a value to print when it produces one.
    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>>;
}

/// Handlers for every [`CommandName`].
pub struct CommandRegistry {
    get: GetCommand,
    set: SetCommand,
    range: RangeCommand,
    ranges: RangesCommand,
    controls: ControlsCommand,
    devices: DevicesCommand,
    export: ExportCommand,
    import: ImportCommand,
}

impl CommandRegistry {
    /// Builds the registry; `input` is the stream `import` reads from.
    #[must_use]
    pub fn new(transport: Arc<dyn UvcTransport>, input: Box<dyn AsyncRead + Send + Unpin>) -> Self {
        Self::with_import_timeout(transport, input, IMPORT_TIMEOUT)
    }

    #[must_use]
    pub fn with_import_timeout(
        transport: Arc<dyn UvcTransport>,
        input: Box<dyn AsyncRead + Send + Unpin>,
        import_timeout: Duration,
    ) -> Self {
        Self {
            get: GetCommand,
            set: SetCommand,
            range: RangeCommand,
            ranges: RangesCommand,
            controls: ControlsCommand,
            devices: DevicesCommand::new(DeviceLister::new(transport)),
            export: ExportCommand,
            import: ImportCommand::new(input, import_timeout),
        }
    }

    #[must_use]
    pub fn handler(&self, name: CommandName) -> &dyn CommandHandler {
        match name {
            CommandName::Get => &self.get,
            CommandName::Set => &self.set,
            CommandName::Range => &self.range,
            CommandName::Ranges => &self.ranges,
            CommandName::Controls => &self.controls,
            CommandName::Devices => &self.devices,
            CommandName::Export => &self.export,
            CommandName::Import => &self.import,
        }
    }
}

fn invalid_arguments(command: CommandName) -> CommandError {
    CommandError::InvalidArguments {
        command: command.into(),
    }
}

fn output<T: Serialize>(value: &T) -> Result<Option<serde_json::Value>> {
    Ok(Some(serde_json::to_value(value)?))
}
