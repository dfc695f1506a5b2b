use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{Argument, ArgumentDescriptor, CommandHandler, CommandName, invalid_arguments};
use crate::controls::{ControlValue, ControlValues};
use crate::error::ImportError;

/// How long `import` waits for piped input.
pub const IMPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Reads a configuration object from stdin and applies it.
pub struct ImportCommand {
    input: Mutex<Option<Box<dyn AsyncRead + Send + Unpin>>>,
    timeout: Duration,
}

impl ImportCommand {
    #[must_use]
    pub fn new(input: Box<dyn AsyncRead + Send + Unpin>, timeout: Duration) -> Self {
        Self {
            input: Mutex::new(Some(input)),
            timeout,
        }
    }

    /// Reads the whole input, giving up after the timeout.
    ///
    /// The reader is dropped either way, so a second read reports
    /// [`ImportError::InputConsumed`].
    async fn read_input(&self) -> Result<String, ImportError> {
        let mut reader = self
            .input
            .lock()
            .await
            .take()
            .ok_or(ImportError::InputConsumed)?;

        let mut buffer = String::new();
        match tokio::time::timeout(self.timeout, reader.read_to_string(&mut buffer)).await {
            Ok(read) => {
                read?;
                Ok(buffer)
            }
            Err(_elapsed) => Err(ImportError::Timeout {
                timeout: self.timeout,
            }),
        }
    }
}

/// Parses `{ "control": number | [number, ...], ... }`.
pub(crate) fn parse_configuration(raw: &str) -> Result<ControlValues, ImportError> {
    let serde_json::Value::Object(entries) = serde_json::from_str(raw)? else {
        return Err(ImportError::NotObject);
    };

    entries
        .into_iter()
        .map(|(name, value)| match serde_json::from_value::<ControlValue>(value) {
            Ok(value) => Ok((name, value)),
            Err(source) => Err(ImportError::InvalidValue { name, source }),
        })
        .collect()
}

#[async_trait]
impl CommandHandler for ImportCommand {
    fn declared_arguments(&self) -> &'static [ArgumentDescriptor] {
        &[ArgumentDescriptor::InjectAccessor]
    }

    #[instrument(skip_all, level = "debug", fields(timeout = %humantime::format_duration(self.timeout)))]
    async fn execute(&self, arguments: Vec<Argument<'_>>) -> Result<Option<serde_json::Value>> {
        let [Argument::Accessor(accessor)] = arguments.as_slice() else {
            return Err(invalid_arguments(CommandName::Import).into());
        };

        let raw = self.read_input().await?;
        let configuration = parse_configuration(&raw)?;
        debug!(controls = configuration.len(), "parsed configuration");
        accessor.set_values(&configuration).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn configuration_accepts_numbers_and_arrays() -> anyhow::Result<()> {
        let configuration =
            parse_configuration(r#"{"brightness": 128, "absolute_pan_tilt": [3600, -7200]}"#)?;

        assert_eq!(
            ControlValues::from([
                ("absolute_pan_tilt".to_string(), ControlValue::Multiple(vec![3600, -7200])),
                ("brightness".to_string(), ControlValue::Single(128)),
            ]),
            configuration
        );
        Ok(())
    }

    #[rstest]
    #[case("[1, 2]")]
    #[case("42")]
    #[case("null")]
    fn configuration_must_be_an_object(#[case] raw: &str) {
        assert_matches!(parse_configuration(raw), Err(ImportError::NotObject));
    }

    #[rstest]
    #[case(r#"{"brightness": "bright"}"#)]
    #[case(r#"{"brightness": [1, "two"]}"#)]
    #[case(r#"{"brightness": 1.5}"#)]
    fn configuration_values_must_be_integers(#[case] raw: &str) {
        assert_matches!(
            parse_configuration(raw),
            Err(ImportError::InvalidValue { name, .. }) if name == "brightness"
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert_matches!(parse_configuration("{"), Err(ImportError::Json(_)));
    }

    #[tokio::test]
    async fn read_input_returns_piped_data() -> anyhow::Result<()> {
        let command = ImportCommand::new(Box::new(&b"{\"gain\": 3}"[..]), IMPORT_TIMEOUT);

        assert_eq!("{\"gain\": 3}", command.read_input().await?);
        assert_matches!(command.read_input().await, Err(ImportError::InputConsumed));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn read_input_times_out_without_data() {
        let (_writer, reader) = tokio::io::duplex(64);
        let command = ImportCommand::new(Box::new(reader), IMPORT_TIMEOUT);

        let error = command
            .read_input()
            .await
            .expect_err("an idle stream should time out");

        assert_matches!(error, ImportError::Timeout { timeout } if timeout == IMPORT_TIMEOUT);
        assert_eq!(
            "could not read configuration from stdin within the 1s timeout, was any data piped in?",
            error.to_string()
        );
    }
}
