//! Capability classification of the controls a device advertises.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use crate::error::{ControlError, DescriptorError};
use crate::hw::{ControlDescriptor, ControlRegistry, RequestCode};

/// Gettable/ranged/settable flags derived from a descriptor's request codes.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct CapabilityFlags {
    gettable: bool,
    ranged: bool,
    settable: bool,
}

impl CapabilityFlags {
    /// Derives flags from the mandatory and optional request lists.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor has no payload fields or lists
    /// `SET_CUR` as both mandatory and optional.
    pub fn from_descriptor(descriptor: &ControlDescriptor) -> Result<Self, DescriptorError> {
        if descriptor.fields().is_empty() {
            return Err(DescriptorError::NoFields);
        }
        let requests = descriptor.requests();
        let optional_requests = descriptor.optional_requests();
        let mandatory_set = requests.contains(&RequestCode::SetCur);
        let optional_set = optional_requests.contains(&RequestCode::SetCur);
        if mandatory_set && optional_set {
            return Err(DescriptorError::ConflictingSetRequest);
        }

        Ok(Self {
            gettable: requests.contains(&RequestCode::GetCur),
            ranged: requests.contains(&RequestCode::GetMin) && requests.contains(&RequestCode::GetMax),
            settable: mandatory_set || optional_set,
        })
    }

    #[must_use]
    pub fn is_gettable(&self) -> bool {
        self.gettable
    }

    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.ranged
    }

    #[must_use]
    pub fn is_settable(&self) -> bool {
        self.settable
    }
}

/// Control name to flags, sorted by name.
pub type CapabilityTable = BTreeMap<String, CapabilityFlags>;

/// Resolves and caches the capability table of one device.
///
/// The table is built on first access and never invalidated.
#[derive(Debug)]
pub struct ControlClassifier {
    registry: &'static ControlRegistry,
    supported: Vec<String>,
    table: OnceLock<CapabilityTable>,
}

impl ControlClassifier {
    #[must_use]
    pub fn new(registry: &'static ControlRegistry, supported: Vec<String>) -> Self {
        Self {
            registry,
            supported,
            table: OnceLock::new(),
        }
    }

    /// Returns the cached capability table, building it on first use.
    ///
    /// A failed build is not cached; the next call retries.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::UnknownControls`] naming every advertised
    /// control missing from the registry, [`ControlError::DuplicateControls`]
    /// when a descriptor is advertised twice, or [`ControlError::Mapping`] when
    /// a descriptor cannot be classified.
    pub fn resolve_capabilities(&self) -> Result<&CapabilityTable, ControlError> {
        if let Some(table) = self.table.get() {
            return Ok(table);
        }
        let table = build_table(self.registry, &self.supported)?;
        Ok(self.table.get_or_init(|| table))
    }

    /// Every supported control name.
    ///
    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn all_names(&self) -> Result<Vec<String>, ControlError> {
        self.names_where(|_flags| true)
    }

    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn gettable_names(&self) -> Result<Vec<String>, ControlError> {
        self.names_where(CapabilityFlags::is_gettable)
    }

    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn ranged_names(&self) -> Result<Vec<String>, ControlError> {
        self.names_where(CapabilityFlags::is_ranged)
    }

    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn settable_names(&self) -> Result<Vec<String>, ControlError> {
        self.names_where(CapabilityFlags::is_settable)
    }

    /// Flags of one control, or `None` when the device does not advertise it.
    ///
    /// # Errors
    ///
    /// Propagates classification errors.
    pub fn flags(&self, name: &str) -> Result<Option<CapabilityFlags>, ControlError> {
        Ok(self.resolve_capabilities()?.get(name).copied())
    }

    fn names_where(
        &self,
        predicate: impl Fn(&CapabilityFlags) -> bool,
    ) -> Result<Vec<String>, ControlError> {
        Ok(self
            .resolve_capabilities()?
            .iter()
            .filter(|(_name, flags)| predicate(*flags))
            .map(|(name, _flags)| name.clone())
            .collect())
    }
}

fn build_table(
    registry: &ControlRegistry,
    supported: &[String],
) -> Result<CapabilityTable, ControlError> {
    let mut unknown = Vec::new();
    let mut resolved = Vec::with_capacity(supported.len());
    for name in supported {
        match registry.get(name) {
            Some(descriptor) => resolved.push(descriptor),
            None => unknown.push(name.clone()),
        }
    }
    if !unknown.is_empty() {
        return Err(ControlError::UnknownControls { names: unknown });
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for descriptor in &resolved {
        if !seen.insert(descriptor.name()) && !duplicates.contains(&descriptor.name().to_string())
        {
            duplicates.push(descriptor.name().to_string());
        }
    }
    if !duplicates.is_empty() {
        return Err(ControlError::DuplicateControls { names: duplicates });
    }

    resolved
        .into_iter()
        .map(|descriptor| {
            let flags = CapabilityFlags::from_descriptor(descriptor).map_err(|source| {
                ControlError::Mapping {
                    name: descriptor.name().to_string(),
                    source,
                }
            })?;
            Ok((descriptor.name().to_string(), flags))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::hw::{ControlField, ControlUnit};

    const VALUE: &[ControlField] = &[ControlField::unsigned("value", 2)];
    const TEST_CONTROLS: &[ControlDescriptor] = &[
        ControlDescriptor::new(
            "brightness",
            ControlUnit::ProcessingUnit,
            0x02,
            0,
            &[
                RequestCode::SetCur,
                RequestCode::GetCur,
                RequestCode::GetMin,
                RequestCode::GetMax,
            ],
            &[],
            VALUE,
        ),
        ControlDescriptor::new(
            "absolute_focus",
            ControlUnit::CameraTerminal,
            0x06,
            5,
            &[RequestCode::GetCur, RequestCode::GetMin, RequestCode::GetMax],
            &[RequestCode::SetCur],
            VALUE,
        ),
        ControlDescriptor::new(
            "lock_status",
            ControlUnit::ProcessingUnit,
            0x12,
            17,
            &[RequestCode::GetCur, RequestCode::GetInfo],
            &[],
            VALUE,
        ),
        ControlDescriptor::new(
            "trigger",
            ControlUnit::ProcessingUnit,
            0x20,
            20,
            &[RequestCode::SetCur, RequestCode::GetMin],
            &[],
            VALUE,
        ),
        ControlDescriptor::new(
            "empty",
            ControlUnit::ProcessingUnit,
            0x21,
            21,
            &[RequestCode::GetCur],
            &[],
            &[],
        ),
        ControlDescriptor::new(
            "conflicting",
            ControlUnit::ProcessingUnit,
            0x22,
            22,
            &[RequestCode::SetCur, RequestCode::GetCur],
            &[RequestCode::SetCur],
            VALUE,
        ),
    ];
    static TEST_REGISTRY: ControlRegistry = ControlRegistry::new(TEST_CONTROLS);

    fn classifier(names: &[&str]) -> ControlClassifier {
        ControlClassifier::new(
            &TEST_REGISTRY,
            names.iter().map(|name| (*name).to_string()).collect(),
        )
    }

    #[rstest]
    #[case("brightness", true, true, true)]
    #[case("absolute_focus", true, true, true)]
    #[case("lock_status", true, false, false)]
    #[case("trigger", false, false, true)]
    fn flags_follow_request_membership(
        #[case] name: &str,
        #[case] gettable: bool,
        #[case] ranged: bool,
        #[case] settable: bool,
    ) -> anyhow::Result<()> {
        let flags = classifier(&[name])
            .flags(name)?
            .expect("advertised control should be classified");

        assert_eq!(
            (gettable, ranged, settable),
            (flags.is_gettable(), flags.is_ranged(), flags.is_settable())
        );
        Ok(())
    }

    #[test]
    fn table_is_sorted_by_name() -> anyhow::Result<()> {
        let classifier = classifier(&["trigger", "brightness", "lock_status", "absolute_focus"]);

        assert_eq!(
            vec!["absolute_focus", "brightness", "lock_status", "trigger"],
            classifier.all_names()?
        );
        assert_eq!(
            vec!["absolute_focus", "brightness", "lock_status"],
            classifier.gettable_names()?
        );
        assert_eq!(vec!["absolute_focus", "brightness"], classifier.ranged_names()?);
        assert_eq!(
            vec!["absolute_focus", "brightness", "trigger"],
            classifier.settable_names()?
        );
        Ok(())
    }

    #[test]
    fn table_is_built_once_and_reused() -> anyhow::Result<()> {
        let classifier = classifier(&["brightness", "lock_status"]);

        let first = classifier.resolve_capabilities()?;
        let second = classifier.resolve_capabilities()?;

        assert!(std::ptr::eq(first, second));
        Ok(())
    }

    #[test]
    fn unknown_controls_are_reported_together() {
        let classifier = classifier(&["zoom", "brightness", "tilt"]);

        assert_matches!(
            classifier.resolve_capabilities(),
            Err(ControlError::UnknownControls { names }) if names == vec!["zoom", "tilt"]
        );
    }

    #[test]
    fn duplicate_controls_are_rejected() {
        let classifier = classifier(&["brightness", "lock_status", "brightness"]);

        assert_matches!(
            classifier.resolve_capabilities(),
            Err(ControlError::DuplicateControls { names }) if names == vec!["brightness"]
        );
    }

    #[rstest]
    #[case("empty", DescriptorError::NoFields)]
    #[case("conflicting", DescriptorError::ConflictingSetRequest)]
    fn mapping_failures_name_the_control(#[case] name: &str, #[case] expected: DescriptorError) {
        let classifier = classifier(&["brightness", name]);

        assert_matches!(
            classifier.resolve_capabilities(),
            Err(ControlError::Mapping { name: failed, source }) if failed == name && source == expected
        );
    }

    #[test]
    fn standard_registry_classifies_every_descriptor() -> anyhow::Result<()> {
        let names: Vec<String> = ControlRegistry::standard()
            .iter()
            .map(|descriptor| descriptor.name().to_string())
            .collect();
        let classifier = ControlClassifier::new(ControlRegistry::standard(), names.clone());

        assert_eq!(names.len(), classifier.resolve_capabilities()?.len());
        Ok(())
    }
}
