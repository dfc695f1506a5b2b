use std::sync::Arc;

use owo_colors::OwoColorize;
use tracing::{instrument, trace, warn};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::{DeviceError, TransportError};
use crate::hw::{DeviceConnection, DeviceSelector, UvcTransport};

/// What to do when the opened device does not match every selector field.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum SelectorMismatchPolicy {
    /// Log a warning and keep the connection.
    #[default]
    Warn,
    /// Close the connection and fail.
    Reject,
}

/// Opens one device connection from a selector.
pub struct DeviceFactory {
    transport: Arc<dyn UvcTransport>,
    mismatch_policy: SelectorMismatchPolicy,
}

impl DeviceFactory {
    #[must_use]
    pub fn new(transport: Arc<dyn UvcTransport>, mismatch_policy: SelectorMismatchPolicy) -> Self {
        Self {
            transport,
            mismatch_policy,
        }
    }

    /// Opens the device matching `selector`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::NotFound`] when no attached device matches,
    /// [`DeviceError::Open`] for any other open failure, and
    /// [`DeviceError::SelectorMismatch`] when the opened device differs from
    /// the selector under [`SelectorMismatchPolicy::Reject`].
    #[instrument(skip(self), level = "info", fields(%selector, policy = ?self.mismatch_policy))]
    pub async fn open(
        &self,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn DeviceConnection>, DeviceError> {
        let span = tracing::Span::current();
        span.pb_set_message("Opening UVC device");
        span.pb_set_finish_message(&format!("{} Opened", "✓".green()));

        let result = self.open_checked(selector).await;
        if result.is_err() {
            span.pb_set_finish_message(&format!("{} Open failed", "✗".red()));
        }
        result
    }

    async fn open_checked(
        &self,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn DeviceConnection>, DeviceError> {
        let connection = self
            .transport
            .open(selector)
            .await
            .map_err(|source| match source {
                TransportError::NoMatchingDevice => DeviceError::NotFound {
                    selector: *selector,
                    source,
                },
                source => DeviceError::Open {
                    selector: *selector,
                    source,
                },
            })?;

        let actual = connection.identity();
        let mismatched = selector.mismatched_fields(&actual);
        if mismatched.is_empty() {
            return Ok(connection);
        }

        match self.mismatch_policy {
            SelectorMismatchPolicy::Warn => {
                warn!(
                    %selector,
                    %actual,
                    fields = ?mismatched,
                    "opened device does not match the requested selector"
                );
                Ok(connection)
            }
            SelectorMismatchPolicy::Reject => {
                if let Err(error) = connection.close().await {
                    trace!(?error, "failed to close mismatched device cleanly");
                }
                Err(DeviceError::SelectorMismatch {
                    selector: *selector,
                    actual,
                    fields: mismatched,
                })
            }
        }
    }
}
