use anyhow::Result;
use async_trait::async_trait;

use super::{Argument, ArgumentDescriptor, CommandHandler, CommandName, invalid_arguments, output};

/// Prints the names of every control the device supports.
pub struct ControlsCommand;

#[async_trait]
impl CommandHandler for ControlsCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[ArgumentDescriptor::InjectAccessor]
    }

    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [Argument::Accessor(accessor)] = arguments.as_slice() else {
            return Err(invalid_arguments(CommandName::Controls).into());
        };
        output(&accessor.control_names()?)
    }
}
