use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;

use super::{
    Argument, ArgumentDescriptor, CommandHandler, CommandName, RuntimeField, invalid_arguments,
    output,
};

/// Prints the current value of one control.
pub struct GetCommand;

#[async_trait]
impl CommandHandler for GetCommand {
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
            return Err(invalid_arguments(CommandName::Get).into());
        };
        let value = accessor
            .get_value(control)
            .await
            .with_context(|| format!("failed to get `{control}`"))?;
        output(&value)
    }
}
