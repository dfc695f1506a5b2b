use anyhow::Result;
use async_trait::async_trait;

use super::{Argument, ArgumentDescriptor, CommandHandler, CommandName, invalid_arguments, output};

/// Prints the range of every ranged control that could be read.
pub struct RangesCommand;

#[async_trait]
impl CommandHandler for RangesCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[ArgumentDescriptor::InjectAccessor]
    }

    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [Argument::Accessor(accessor)] = arguments.as_slice() else {
            return Err(invalid_arguments(CommandName::Ranges).into());
        };
        output(&accessor.get_ranges().await?)
    }
}
