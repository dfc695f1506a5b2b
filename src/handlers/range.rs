use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use super::{
    Argument, ArgumentDescriptor, CommandHandler, CommandName, RuntimeField, invalid_arguments,
    output,
};

/// Prints the minimum and maximum of one control.
pub struct RangeCommand;

#[async_trait]
impl CommandHandler for RangeCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[
            ArgumentDescriptor::InjectAccessor,
            ArgumentDescriptor::Runtime(RuntimeField::Control),
        ]
    }

    #[instrument(skip_all, level = "debug")]
    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [Argument::Accessor(accessor), Argument::Control(control)] = arguments.as_slice()
        else {
            return Err(invalid_arguments(CommandName::Range).into());
        };
        let range = accessor
            .get_range(control)
            .await
            .with_context(|| format!("failed to get the range of `{control}`"))?;
        output(&range)
    }
}
