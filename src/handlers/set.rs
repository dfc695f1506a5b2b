use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{
    Argument, ArgumentDescriptor, CommandHandler, CommandName, RuntimeField, invalid_arguments,
};
use crate::controls::ControlValue;

/// Writes one or two values to a control. Prints nothing on success.
pub struct SetCommand;

#[async_trait]
impl CommandHandler for SetCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[
            ArgumentDescriptor::InjectAccessor,
            ArgumentDescriptor::Runtime(RuntimeField::Control),
            ArgumentDescriptor::Runtime(RuntimeField::Values),
        ]
    }

    #[instrument(skip_all, level = "debug")]
    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [
            Argument::Accessor(accessor),
            Argument::Control(control),
            Argument::Values(values),
        ] = arguments.as_slice()
        else {
            return Err(invalid_arguments(CommandName::Set).into());
        };
        let value = ControlValue::from_values(values.clone());
        debug!(%control, ?value, "setting control");
        accessor
            .set_value(control, &value)
            .await
            .with_context(|| format!("failed to set `{control}`"))?;
        Ok(None)
    }
}
