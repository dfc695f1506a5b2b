use std::io;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, instrument, trace};

use crate::controls::ControlAccessor;
use crate::devices::DeviceFactory;
use crate::error::{CommandError, DeviceError};
use crate::handlers::{
    Argument, ArgumentDescriptor, CommandHandler, CommandName, CommandRegistry, RuntimeField,
};
use crate::hw::{ControlRegistry, DeviceConnection};
use crate::runtime::RuntimeConfiguration;

/// Pause before closing a device so in-flight transfers can settle.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How a dispatch ended when it did not fail.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DispatchOutcome {
    Completed,
    /// The command name was not recognised; nothing was executed.
    UnknownCommand,
}

/// Routes a runtime configuration to its command handler.
pub struct Dispatcher {
    commands: CommandRegistry,
    factory: DeviceFactory,
    controls: &'static ControlRegistry,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        commands: CommandRegistry,
        factory: DeviceFactory,
        controls: &'static ControlRegistry,
    ) -> Self {
        Self {
            commands,
            factory,
            controls,
        }
    }

    /// Runs one command.
    ///
    /// Opens a device only when the command asks for an accessor, and always
    /// closes it again. A result value is written to `out` as pretty JSON.
    /// Unknown command names are reported on `err`.
    ///
    /// # Errors
    ///
    /// Returns an error if argument resolution, device acquisition, the
    /// command, or writing output fails. When both the command and the close
    /// fail, the command's error is returned.
    #[instrument(
        skip(self, runtime, out, err),
        level = "debug",
        fields(command = runtime.command())
    )]
    pub async fn dispatch<W, E>(
        &self,
        runtime: &RuntimeConfiguration,
        out: &mut W,
        err: &mut E,
    ) -> Result<DispatchOutcome>
    where
        W: io::Write,
        E: io::Write,
    {
        let Ok(name) = runtime.command().parse::<CommandName>() else {
            let error = CommandError::UnknownCommand {
                name: runtime.command().to_string(),
            };
            writeln!(err, "{error}")?;
            return Ok(DispatchOutcome::UnknownCommand);
        };
        let handler = self.commands.handler(name);
        let declared = handler.declared_arguments();
        let runtime_arguments = resolve_runtime_arguments(name, declared, runtime)?;
        debug!(%name, arguments = runtime_arguments.len(), "resolved command arguments");

        let result = if declared.contains(&ArgumentDescriptor::InjectAccessor) {
            let connection = self.factory.open(runtime.selector()).await?;
            let command_result =
                execute_with_connection(handler, connection.as_ref(), self.controls, runtime_arguments)
                    .await;
            tokio::time::sleep(SETTLE_DELAY).await;
            let close_result = connection.close().await;

            if let Err(error) = close_result {
                if command_result.is_ok() {
                    return Err(DeviceError::Close(error).into());
                }
                trace!(?error, "failed to close device cleanly");
            }
            command_result?
        } else {
            handler.execute(runtime_arguments).await?
        };

        if let Some(value) = result {
            serde_json::to_writer_pretty(&mut *out, &value)?;
            writeln!(out)?;
        }
        Ok(DispatchOutcome::Completed)
    }
}

async fn execute_with_connection(
    handler: &dyn CommandHandler,
    connection: &dyn DeviceConnection,
    controls: &'static ControlRegistry,
    runtime_arguments: Vec<Argument<'_>>,
) -> Result<Option<serde_json::Value>> {
    let accessor = ControlAccessor::new(connection, controls);
    let mut arguments = Vec::with_capacity(runtime_arguments.len() + 1);
    arguments.push(Argument::Accessor(&accessor));
    arguments.extend(runtime_arguments);
    handler.execute(arguments).await
}

fn resolve_runtime_arguments(
    name: CommandName,
    declared: &[ArgumentDescriptor],
    runtime: &RuntimeConfiguration,
) -> Result<Vec<Argument<'static>>, CommandError> {
    declared
        .iter()
        .filter_map(|descriptor| match descriptor {
            ArgumentDescriptor::InjectAccessor => None,
            ArgumentDescriptor::Runtime(field) => Some(*field),
        })
        .map(|field| {
            let missing = || CommandError::MissingArgument {
                command: name.into(),
                argument: field.description(),
            };
            match field {
                RuntimeField::Control => runtime
                    .control()
                    .map(|control| Argument::Control(control.to_string()))
                    .ok_or_else(missing),
                RuntimeField::Values if runtime.values().is_empty() => Err(missing()),
                RuntimeField::Values => Ok(Argument::Values(runtime.values().to_vec())),
            }
        })
        .collect()
}
