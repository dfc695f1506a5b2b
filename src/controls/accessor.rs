use std::collections::BTreeMap;

use tracing::{debug, instrument};

use super::best_effort::best_effort;
use super::classifier::{CapabilityFlags, ControlClassifier};
use super::value::{ControlRange, ControlValue};
use crate::error::{ControlError, ControlOperation};
use crate::hw::{ControlRegistry, DeviceConnection};

/// Control values keyed by control name.
pub type ControlValues = BTreeMap<String, ControlValue>;

/// Control ranges keyed by control name.
pub type ControlRanges = BTreeMap<String, ControlRange>;

/// Name-scoped, validated access to the controls of one open connection.
pub struct ControlAccessor<'a> {
    connection: &'a dyn DeviceConnection,
    classifier: ControlClassifier,
}

impl<'a> ControlAccessor<'a> {
    /// Wraps a connection, classifying the controls it advertises against
    /// `registry` on first use.
    #[must_use]
    pub fn new(connection: &'a dyn DeviceConnection, registry: &'static ControlRegistry) -> Self {
        let supported = connection.supported_controls().to_vec();
        Self {
            connection,
            classifier: ControlClassifier::new(registry, supported),
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &ControlClassifier {
        &self.classifier
    }

    /// Reads the current value of a gettable control.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotGettable`] when the device cannot report the
    /// control, or [`ControlError::Io`] when the transfer fails.
    pub async fn get_value(&self, name: &str) -> Result<ControlValue, ControlError> {
        if !self.has_flag(name, CapabilityFlags::is_gettable)? {
            return Err(ControlError::NotGettable {
                name: name.to_string(),
            });
        }
        let fields = self
            .connection
            .get(name)
            .await
            .map_err(|source| io_error(name, ControlOperation::Get, source))?;
        Ok(fields.into())
    }

    /// Reads the minimum and maximum of a ranged control.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotRanged`] when the device cannot report a
    /// range for the control, or [`ControlError::Io`] when a transfer fails.
    pub async fn get_range(&self, name: &str) -> Result<ControlRange, ControlError> {
        if !self.has_flag(name, CapabilityFlags::is_ranged)? {
            return Err(ControlError::NotRanged {
                name: name.to_string(),
            });
        }
        let range = self
            .connection
            .range(name)
            .await
            .map_err(|source| io_error(name, ControlOperation::Range, source))?;
        Ok(range.into())
    }

    /// Writes a settable control.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NotSettable`] when the control cannot be
    /// written, or [`ControlError::Io`] when the transfer fails.
    pub async fn set_value(&self, name: &str, value: &ControlValue) -> Result<(), ControlError> {
        if !self.has_flag(name, CapabilityFlags::is_settable)? {
            return Err(ControlError::NotSettable {
                name: name.to_string(),
            });
        }
        self.connection
            .set(name, &value.to_values())
            .await
            .map_err(|source| io_error(name, ControlOperation::Set, source))
    }

    /// Every control the device supports, sorted by name.
    ///
    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn control_names(&self) -> Result<Vec<String>, ControlError> {
        self.classifier.all_names()
    }

    /// Reads the range of every ranged control, skipping failures.
    ///
    /// # Errors
    ///
    /// Only classification errors are returned; per-control failures are
    /// logged and omitted.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_ranges(&self) -> Result<ControlRanges, ControlError> {
        let names = self.classifier.ranged_names()?;
        Ok(best_effort(names, |name| async move { self.get_range(&name).await })
            .await
            .into_iter()
            .collect())
    }

    /// Reads every control, skipping failures.
    ///
    /// # Errors
    ///
    /// Only classification errors are returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_values(&self) -> Result<ControlValues, ControlError> {
        let names = self.classifier.all_names()?;
        Ok(self.read_values(names).await)
    }

    /// Reads every settable control, skipping failures.
    ///
    /// # Errors
    ///
    /// Only classification errors are returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn get_settable_values(&self) -> Result<ControlValues, ControlError> {
        let names = self.classifier.settable_names()?;
        Ok(self.read_values(names).await)
    }

    /// Applies a configuration of control values.
    ///
    /// Every name is validated before anything is written. Once validated,
    /// writes are attempted for all entries and individual failures are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::NonSettableControls`] naming every entry that is
    /// not a settable control, in which case nothing is written.
    #[instrument(skip(self, configuration), level = "debug", fields(controls = configuration.len()))]
    pub async fn set_values(&self, configuration: &ControlValues) -> Result<(), ControlError> {
        let settable = self.classifier.settable_names()?;
        let invalid: Vec<String> = configuration
            .keys()
            .filter(|name| !settable.contains(name))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            return Err(ControlError::NonSettableControls { names: invalid });
        }

        let applied = best_effort(configuration.keys(), |name| {
            let value = &configuration[name];
            async move { self.set_value(name, value).await }
        })
        .await;
        debug!(
            applied = applied.len(),
            requested = configuration.len(),
            "applied control configuration"
        );
        Ok(())
    }

    async fn read_values(&self, names: Vec<String>) -> ControlValues {
        best_effort(names, |name| async move { self.get_value(&name).await })
            .await
            .into_iter()
            .collect()
    }

    fn has_flag(
        &self,
        name: &str,
        flag: impl Fn(&CapabilityFlags) -> bool,
    ) -> Result<bool, ControlError> {
        Ok(self
            .classifier
            .flags(name)?
            .is_some_and(|flags| flag(&flags)))
    }
}

fn io_error(
    name: &str,
    operation: ControlOperation,
    source: crate::error::TransportError,
) -> ControlError {
    ControlError::Io {
        name: name.to_string(),
        operation,
        source,
    }
}
