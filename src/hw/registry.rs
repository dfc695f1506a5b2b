//! Static UVC control registry.
//!
//! Each descriptor names one standard camera-terminal or processing-unit
//! control, the requests the UVC class specification lists for it, and the
//! little-endian field layout of its payload.

use strum_macros::{Display, IntoStaticStr};

use crate::error::TransportError;

/// UVC class-specific request codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display, IntoStaticStr)]
#[repr(u8)]
pub enum RequestCode {
    #[strum(serialize = "SET_CUR")]
    SetCur = 0x01,
    #[strum(serialize = "GET_CUR")]
    GetCur = 0x81,
    #[strum(serialize = "GET_MIN")]
    GetMin = 0x82,
    #[strum(serialize = "GET_MAX")]
    GetMax = 0x83,
    #[strum(serialize = "GET_RES")]
    GetRes = 0x84,
    #[strum(serialize = "GET_LEN")]
    GetLen = 0x85,
    #[strum(serialize = "GET_INFO")]
    GetInfo = 0x86,
    #[strum(serialize = "GET_DEF")]
    GetDef = 0x87,
}

impl RequestCode {
    /// Returns the `bRequest` byte sent on the wire.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Video Control entity owning a control.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
pub enum ControlUnit {
    #[strum(serialize = "camera terminal")]
    CameraTerminal,
    #[strum(serialize = "processing unit")]
    ProcessingUnit,
}

/// One little-endian field of a control payload.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ControlField {
    name: &'static str,
    size: usize,
    signed: bool,
}

impl ControlField {
    /// Creates an unsigned field.
    #[must_use]
    pub const fn unsigned(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            signed: false,
        }
    }

    /// Creates a two's-complement signed field.
    #[must_use]
    pub const fn signed(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            signed: true,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field width in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    /// Decodes this field from the front of `bytes`.
    pub(crate) fn decode(&self, bytes: &[u8]) -> Option<i64> {
        let raw = bytes.get(..self.size)?;
        let mut unsigned: u64 = 0;
        for (shift, byte) in raw.iter().enumerate() {
            unsigned |= u64::from(*byte) << (8 * shift);
        }
        if self.signed && self.size < 8 {
            let bits = 8 * self.size as u32;
            let sign_bit = 1u64 << (bits - 1);
            if unsigned & sign_bit != 0 {
                return Some((unsigned | (u64::MAX << bits)) as i64);
            }
        }
        Some(unsigned as i64)
    }

    /// Encodes `value` into `self.size` little-endian bytes.
    ///
    /// Callers check the value against the field bounds first.
    fn encode(&self, value: i64, out: &mut Vec<u8>) {
        let bytes = value.to_le_bytes();
        out.extend_from_slice(&bytes[..self.size.min(bytes.len())]);
    }

    fn contains(&self, value: i64) -> bool {
        (self.min_value()..=self.max_value()).contains(&value)
    }

    /// Smallest value representable by this field.
    pub(crate) fn min_value(&self) -> i64 {
        if self.signed {
            -(1i64 << (8 * self.size - 1))
        } else {
            0
        }
    }

    /// Largest value representable by this field.
    pub(crate) fn max_value(&self) -> i64 {
        if self.signed {
            (1i64 << (8 * self.size - 1)) - 1
        } else if self.size >= 8 {
            i64::MAX
        } else {
            (1i64 << (8 * self.size)) - 1
        }
    }
}

/// Protocol metadata for one named control.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ControlDescriptor {
    name: &'static str,
    unit: ControlUnit,
    selector: u8,
    control_bit: u8,
    requests: &'static [RequestCode],
    optional_requests: &'static [RequestCode],
    fields: &'static [ControlField],
}

impl ControlDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(
        name: &'static str,
        unit: ControlUnit,
        selector: u8,
        control_bit: u8,
        requests: &'static [RequestCode],
        optional_requests: &'static [RequestCode],
        fields: &'static [ControlField],
    ) -> Self {
        Self {
            name,
            unit,
            selector,
            control_bit,
            requests,
            optional_requests,
            fields,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn unit(&self) -> ControlUnit {
        self.unit
    }

    /// Control selector (`wValue` high byte).
    #[must_use]
    pub fn selector(&self) -> u8 {
        self.selector
    }

    /// Bit index inside the owning unit's `bmControls` bitmap.
    #[must_use]
    pub fn control_bit(&self) -> u8 {
        self.control_bit
    }

    /// Mandatory requests.
    #[must_use]
    pub fn requests(&self) -> &'static [RequestCode] {
        self.requests
    }

    /// Requests a device may additionally implement.
    #[must_use]
    pub fn optional_requests(&self) -> &'static [RequestCode] {
        self.optional_requests
    }

    #[must_use]
    pub fn fields(&self) -> &'static [ControlField] {
        self.fields
    }

    /// Total payload length in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.fields.iter().map(ControlField::size).sum()
    }

    /// Decodes a payload into ordered `(field, value)` pairs.
    pub(crate) fn decode(&self, payload: &[u8]) -> Option<Vec<(&'static str, i64)>> {
        let mut offset = 0usize;
        let mut decoded = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let value = field.decode(payload.get(offset..)?)?;
            decoded.push((field.name(), value));
            offset += field.size();
        }
        Some(decoded)
    }

    /// Checks that `values` has one entry per field and that each fits its
    /// field width.
    pub(crate) fn validate(&self, values: &[i64]) -> Result<(), TransportError> {
        if values.len() != self.fields.len() {
            return Err(TransportError::ValueCount {
                name: self.name.to_string(),
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        match self
            .fields
            .iter()
            .zip(values)
            .find(|(field, value)| !field.contains(**value))
        {
            Some((field, value)) => Err(TransportError::ValueOutOfRange {
                name: self.name.to_string(),
                field: field.name(),
                value: *value,
                min: field.min_value(),
                max: field.max_value(),
            }),
            None => Ok(()),
        }
    }

    /// Encodes one value per field, in field order.
    pub(crate) fn encode(&self, values: &[i64]) -> Result<Vec<u8>, TransportError> {
        self.validate(values)?;
        let mut payload = Vec::with_capacity(self.payload_len());
        for (field, value) in self.fields.iter().zip(values) {
            field.encode(*value, &mut payload);
        }
        Ok(payload)
    }
}

/// Lookup table of control descriptors keyed by name.
#[derive(Debug, Clone, Copy)]
pub struct ControlRegistry {
    descriptors: &'static [ControlDescriptor],
}

impl ControlRegistry {
    /// Wraps an explicit descriptor table.
    #[must_use]
    pub const fn new(descriptors: &'static [ControlDescriptor]) -> Self {
        Self { descriptors }
    }

    /// Returns the registry of standard UVC 1.1 controls.
    #[must_use]
    pub fn standard() -> &'static Self {
        static STANDARD: ControlRegistry = ControlRegistry::new(STANDARD_CONTROLS);
        &STANDARD
    }

    /// Looks up a descriptor by control name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'static ControlDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.name == name)
    }

    /// Looks up the descriptor behind a unit's `bmControls` bit.
    #[must_use]
    pub fn by_control_bit(&self, unit: ControlUnit, bit: u8) -> Option<&'static ControlDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.unit == unit && descriptor.control_bit == bit)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static ControlDescriptor> {
        self.descriptors.iter()
    }
}

use ControlUnit::{CameraTerminal, ProcessingUnit};
use RequestCode::{GetCur, GetDef, GetInfo, GetMax, GetMin, GetRes, SetCur};

const FULL: &[RequestCode] = &[SetCur, GetCur, GetMin, GetMax, GetRes, GetInfo, GetDef];
const FULL_READ_ONLY: &[RequestCode] = &[GetCur, GetMin, GetMax, GetRes, GetInfo, GetDef];
const AUTO: &[RequestCode] = &[SetCur, GetCur, GetInfo, GetDef];
const AUTO_EXPOSURE_MODE: &[RequestCode] = &[SetCur, GetCur, GetRes, GetInfo, GetDef];
const SWITCH: &[RequestCode] = &[SetCur, GetCur, GetInfo];
const STATUS: &[RequestCode] = &[GetCur, GetInfo];
const SET_OPTIONAL: &[RequestCode] = &[SetCur];
const NONE: &[RequestCode] = &[];

const U8: &[ControlField] = &[ControlField::unsigned("value", 1)];
const U16: &[ControlField] = &[ControlField::unsigned("value", 2)];
const I16: &[ControlField] = &[ControlField::signed("value", 2)];
const U32: &[ControlField] = &[ControlField::unsigned("value", 4)];
const I8: &[ControlField] = &[ControlField::signed("value", 1)];

const STANDARD_CONTROLS: &[ControlDescriptor] = &[
    ControlDescriptor::new("scanning_mode", CameraTerminal, 0x01, 0, SWITCH, NONE, U8),
    ControlDescriptor::new("auto_exposure_mode", CameraTerminal, 0x02, 1, AUTO_EXPOSURE_MODE, NONE, U8),
    ControlDescriptor::new("auto_exposure_priority", CameraTerminal, 0x03, 2, SWITCH, NONE, U8),
    ControlDescriptor::new("absolute_exposure_time", CameraTerminal, 0x04, 3, FULL_READ_ONLY, SET_OPTIONAL, U32),
    ControlDescriptor::new("relative_exposure_time", CameraTerminal, 0x05, 4, FULL, NONE, I8),
    ControlDescriptor::new("absolute_focus", CameraTerminal, 0x06, 5, FULL_READ_ONLY, SET_OPTIONAL, U16),
    ControlDescriptor::new(
        "relative_focus",
        CameraTerminal,
        0x07,
        6,
        FULL,
        NONE,
        &[ControlField::signed("focus_relative", 1), ControlField::unsigned("speed", 1)],
    ),
    ControlDescriptor::new("absolute_iris", CameraTerminal, 0x09, 7, FULL_READ_ONLY, SET_OPTIONAL, U16),
    ControlDescriptor::new("relative_iris", CameraTerminal, 0x0A, 8, FULL, NONE, U8),
    ControlDescriptor::new("absolute_zoom", CameraTerminal, 0x0B, 9, FULL_READ_ONLY, SET_OPTIONAL, U16),
    ControlDescriptor::new(
        "relative_zoom",
        CameraTerminal,
        0x0C,
        10,
        FULL,
        NONE,
        &[
            ControlField::signed("zoom", 1),
            ControlField::unsigned("digital_zoom", 1),
            ControlField::unsigned("speed", 1),
        ],
    ),
    ControlDescriptor::new(
        "absolute_pan_tilt",
        CameraTerminal,
        0x0D,
        11,
        FULL_READ_ONLY,
        SET_OPTIONAL,
        &[ControlField::signed("pan", 4), ControlField::signed("tilt", 4)],
    ),
    ControlDescriptor::new(
        "relative_pan_tilt",
        CameraTerminal,
        0x0E,
        12,
        FULL,
        NONE,
        &[
            ControlField::signed("pan_relative", 1),
            ControlField::unsigned("pan_speed", 1),
            ControlField::signed("tilt_relative", 1),
            ControlField::unsigned("tilt_speed", 1),
        ],
    ),
    ControlDescriptor::new("absolute_roll", CameraTerminal, 0x0F, 13, FULL_READ_ONLY, SET_OPTIONAL, I16),
    ControlDescriptor::new(
        "relative_roll",
        CameraTerminal,
        0x10,
        14,
        FULL,
        NONE,
        &[ControlField::signed("roll_relative", 1), ControlField::unsigned("speed", 1)],
    ),
    ControlDescriptor::new("auto_focus", CameraTerminal, 0x08, 17, AUTO, NONE, U8),
    ControlDescriptor::new("privacy", CameraTerminal, 0x11, 18, STATUS, SET_OPTIONAL, U8),
    ControlDescriptor::new("brightness", ProcessingUnit, 0x02, 0, FULL, NONE, I16),
    ControlDescriptor::new("contrast", ProcessingUnit, 0x03, 1, FULL, NONE, U16),
    ControlDescriptor::new("hue", ProcessingUnit, 0x06, 2, FULL, NONE, I16),
    ControlDescriptor::new("saturation", ProcessingUnit, 0x07, 3, FULL, NONE, U16),
    ControlDescriptor::new("sharpness", ProcessingUnit, 0x08, 4, FULL, NONE, U16),
    ControlDescriptor::new("gamma", ProcessingUnit, 0x09, 5, FULL, NONE, U16),
    ControlDescriptor::new("white_balance_temperature", ProcessingUnit, 0x0A, 6, FULL, NONE, U16),
    ControlDescriptor::new(
        "white_balance_component",
        ProcessingUnit,
        0x0C,
        7,
        FULL,
        NONE,
        &[ControlField::unsigned("blue", 2), ControlField::unsigned("red", 2)],
    ),
    ControlDescriptor::new("backlight_compensation", ProcessingUnit, 0x01, 8, FULL, NONE, U16),
    ControlDescriptor::new("gain", ProcessingUnit, 0x04, 9, FULL, NONE, U16),
    ControlDescriptor::new("power_line_frequency", ProcessingUnit, 0x05, 10, SWITCH, NONE, U8),
    ControlDescriptor::new("auto_hue", ProcessingUnit, 0x10, 11, AUTO, NONE, U8),
    ControlDescriptor::new("auto_white_balance_temperature", ProcessingUnit, 0x0B, 12, AUTO, NONE, U8),
    ControlDescriptor::new("auto_white_balance_component", ProcessingUnit, 0x0D, 13, AUTO, NONE, U8),
    ControlDescriptor::new("digital_multiplier", ProcessingUnit, 0x0E, 14, FULL, NONE, U16),
    ControlDescriptor::new("digital_multiplier_limit", ProcessingUnit, 0x0F, 15, FULL, NONE, U16),
    ControlDescriptor::new("analog_video_standard", ProcessingUnit, 0x11, 16, STATUS, NONE, U8),
    ControlDescriptor::new("analog_lock_status", ProcessingUnit, 0x12, 17, STATUS, NONE, U8),
    ControlDescriptor::new("auto_contrast", ProcessingUnit, 0x13, 18, AUTO, NONE, U8),
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn standard_registry_names_are_unique() {
        let names: HashSet<&str> = ControlRegistry::standard()
            .iter()
            .map(ControlDescriptor::name)
            .collect();
        assert_eq!(STANDARD_CONTROLS.len(), names.len());
    }

    #[test]
    fn standard_registry_control_bits_are_unique_per_unit() {
        let bits: HashSet<(ControlUnit, u8)> = ControlRegistry::standard()
            .iter()
            .map(|descriptor| (descriptor.unit(), descriptor.control_bit()))
            .collect();
        assert_eq!(STANDARD_CONTROLS.len(), bits.len());
    }

    #[rstest]
    #[case(RequestCode::SetCur, 0x01)]
    #[case(RequestCode::GetCur, 0x81)]
    #[case(RequestCode::GetMin, 0x82)]
    #[case(RequestCode::GetMax, 0x83)]
    #[case(RequestCode::GetDef, 0x87)]
    fn request_codes_match_uvc_class_values(#[case] request: RequestCode, #[case] code: u8) {
        assert_eq!(code, request.code());
    }

    #[test]
    fn lookup_by_control_bit_finds_processing_unit_brightness() {
        let descriptor = ControlRegistry::standard()
            .by_control_bit(ControlUnit::ProcessingUnit, 0)
            .expect("processing unit bit 0 should be brightness");
        assert_eq!("brightness", descriptor.name());
    }

    #[rstest]
    #[case(ControlField::signed("value", 2), &[0xFF, 0xFF], -1)]
    #[case(ControlField::signed("value", 2), &[0x40, 0x00], 64)]
    #[case(ControlField::unsigned("value", 2), &[0xFF, 0xFF], 65_535)]
    #[case(ControlField::signed("value", 4), &[0x00, 0x00, 0xFF, 0xFF], -65_536)]
    fn fields_decode_little_endian(
        #[case] field: ControlField,
        #[case] bytes: &[u8],
        #[case] expected: i64,
    ) {
        assert_eq!(Some(expected), field.decode(bytes));
    }

    #[test]
    fn descriptor_encodes_fields_in_declared_order() {
        let descriptor = ControlRegistry::standard()
            .get("white_balance_component")
            .expect("white balance component should exist");

        let payload = descriptor
            .encode(&[0x0102, 0x0304])
            .expect("two values should encode");

        assert_eq!(vec![0x02, 0x01, 0x04, 0x03], payload);
        assert_eq!(
            Some(vec![("blue", 0x0102), ("red", 0x0304)]),
            descriptor.decode(&payload)
        );
    }

    #[test]
    fn descriptor_rejects_wrong_value_count() {
        let descriptor = ControlRegistry::standard()
            .get("absolute_pan_tilt")
            .expect("pan/tilt should exist");
        assert_matches!(
            descriptor.encode(&[1]),
            Err(TransportError::ValueCount {
                expected: 2,
                actual: 1,
                ..
            })
        );
    }

    #[rstest]
    #[case("brightness", &[70_000], "value", 70_000, -32_768, 32_767)]
    #[case("brightness", &[-32_769], "value", -32_769, -32_768, 32_767)]
    #[case("contrast", &[-1], "value", -1, 0, 65_535)]
    #[case("white_balance_component", &[10, 65_536], "red", 65_536, 0, 65_535)]
    fn descriptor_rejects_values_outside_field_width(
        #[case] control: &str,
        #[case] values: &[i64],
        #[case] expected_field: &str,
        #[case] expected_value: i64,
        #[case] expected_min: i64,
        #[case] expected_max: i64,
    ) {
        let descriptor = ControlRegistry::standard()
            .get(control)
            .expect("control should exist");

        assert_matches!(
            descriptor.encode(values),
            Err(TransportError::ValueOutOfRange { name, field, value, min, max })
                if name == control
                    && field == expected_field
                    && value == expected_value
                    && min == expected_min
                    && max == expected_max
        );
    }

    #[rstest]
    #[case("brightness", &[-32_768], vec![0x00, 0x80])]
    #[case("brightness", &[32_767], vec![0xFF, 0x7F])]
    #[case("contrast", &[65_535], vec![0xFF, 0xFF])]
    fn descriptor_encodes_field_bounds(
        #[case] control: &str,
        #[case] values: &[i64],
        #[case] expected: Vec<u8>,
    ) {
        let descriptor = ControlRegistry::standard()
            .get(control)
            .expect("control should exist");
        let payload = descriptor.encode(values).expect("bounds should encode");
        assert_eq!(expected, payload);
    }

    #[test]
    fn field_bounds_follow_width_and_sign() {
        assert_eq!(-32_768, ControlField::signed("value", 2).min_value());
        assert_eq!(32_767, ControlField::signed("value", 2).max_value());
        assert_eq!(0, ControlField::unsigned("value", 1).min_value());
        assert_eq!(255, ControlField::unsigned("value", 1).max_value());
    }
}
