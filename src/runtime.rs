use bon::Builder;

use crate::devices::SelectorMismatchPolicy;
use crate::hw::DeviceSelector;

/// Flat, read-only configuration for one invocation.
#[derive(Debug, Clone, Builder)]
pub struct RuntimeConfiguration {
    #[builder(into)]
    command: String,
    #[builder(into)]
    control: Option<String>,
    #[builder(default)]
    values: Vec<i64>,
    #[builder(default)]
    selector: DeviceSelector,
    #[builder(default)]
    verbose: bool,
    #[builder(default)]
    mismatch_policy: SelectorMismatchPolicy,
}

impl RuntimeConfiguration {
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn control(&self) -> Option<&str> {
        self.control.as_deref()
    }

    #[must_use]
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    #[must_use]
    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn mismatch_policy(&self) -> SelectorMismatchPolicy {
        self.mismatch_policy
    }
}
