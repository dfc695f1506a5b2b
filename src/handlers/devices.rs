use anyhow::Result;
use async_trait::async_trait;

use super::{Argument, ArgumentDescriptor, CommandHandler, CommandName, invalid_arguments, output};
use crate::devices::DeviceLister;

/// Prints a summary of every attached UVC device.
pub struct DevicesCommand {
    lister: DeviceLister,
}

impl DevicesCommand {
    #[must_use]
    pub fn new(lister: DeviceLister) -> Self {
        Self { lister }
    }
}

#[async_trait]
impl CommandHandler for DevicesCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[]
    }

    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        if !arguments.is_empty() {
            return Err(invalid_arguments(CommandName::Devices).into());
        }
        output(&self.lister.list().await?)
    }
}
