use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::hw::{ControlFields, FieldRange};

/// Value of one control: a bare number for single-field controls, otherwise
/// one number per wire field in field order.
#[derive(Debug, Clone, Eq, PartialEq, From, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Single(i64),
    Multiple(Vec<i64>),
}

impl ControlValue {
    /// Builds a value from numbers in field order.
    ///
    /// ```
    /// use uvcc::ControlValue;
    ///
    /// assert_eq!(ControlValue::Single(3), ControlValue::from_values(vec![3]));
    /// assert_eq!(ControlValue::Multiple(vec![3, 4]), ControlValue::from_values(vec![3, 4]));
    /// ```
    #[must_use]
    pub fn from_values(values: Vec<i64>) -> Self {
        if let [single] = values[..] {
            Self::Single(single)
        } else {
            Self::Multiple(values)
        }
    }

    /// Returns the values in field order.
    ///
    /// ```
    /// use uvcc::ControlValue;
    ///
    /// assert_eq!(vec![7], ControlValue::Single(7).to_values());
    /// assert_eq!(vec![1, 2], ControlValue::Multiple(vec![1, 2]).to_values());
    /// ```
    #[must_use]
    pub fn to_values(&self) -> Vec<i64> {
        match self {
            Self::Single(value) => vec![*value],
            Self::Multiple(values) => values.clone(),
        }
    }
}

impl From<&ControlFields> for ControlValue {
    fn from(fields: &ControlFields) -> Self {
        match fields.fields() {
            [(_name, value)] => Self::Single(*value),
            fields => Self::Multiple(fields.iter().map(|(_name, value)| *value).collect()),
        }
    }
}

impl From<ControlFields> for ControlValue {
    fn from(fields: ControlFields) -> Self {
        Self::from(&fields)
    }
}

/// Minimum and maximum of one control.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ControlRange {
    min: ControlValue,
    max: ControlValue,
}

impl ControlRange {
    #[must_use]
    pub fn new(min: ControlValue, max: ControlValue) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn min(&self) -> &ControlValue {
        &self.min
    }

    #[must_use]
    pub fn max(&self) -> &ControlValue {
        &self.max
    }
}

impl From<FieldRange> for ControlRange {
    fn from(range: FieldRange) -> Self {
        Self::new(range.min().into(), range.max().into())
    }
}
