use anyhow::Result;
use async_trait::async_trait;

use super::{Argument, ArgumentDescriptor, CommandHandler, CommandName, invalid_arguments, output};

/// Prints the current value of every settable control.
///
/// The output is the configuration shape `import` accepts.
pub struct ExportCommand;

#[async_trait]
impl CommandHandler for ExportCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[ArgumentDescriptor::InjectAccessor]
    }

    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [Argument::Accessor(accessor)] = arguments.as_slice() else {
            return Err(invalid_arguments(CommandName::Export).into());
        };
        output(&accessor.get_settable_values().await?)
    }
}
