use std::fmt;

use serde::Serialize;

/// Vendor/product/address triple used to pick one attached device.
///
/// `None` leaves a field unconstrained.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize)]
pub struct DeviceSelector {
    vendor: Option<u16>,
    product: Option<u16>,
    address: Option<u8>,
}

impl DeviceSelector {
    /// Creates a selector from optional fields.
    ///
    /// ```
    /// let selector = uvcc::DeviceSelector::new(Some(0x046d), None, None);
    /// assert_eq!(Some(0x046d), selector.vendor());
    /// ```
    #[must_use]
    pub fn new(vendor: Option<u16>, product: Option<u16>, address: Option<u8>) -> Self {
        Self {
            vendor,
            product,
            address,
        }
    }

    /// Creates a selector where zero means unconstrained.
    ///
    /// ```
    /// let selector = uvcc::DeviceSelector::from_raw(0, 0x082d, 0);
    /// assert_eq!(None, selector.vendor());
    /// assert_eq!(Some(0x082d), selector.product());
    /// ```
    #[must_use]
    pub fn from_raw(vendor: u16, product: u16, address: u8) -> Self {
        Self::new(non_zero(vendor), non_zero(product), non_zero(address))
    }

    #[must_use]
    pub fn vendor(&self) -> Option<u16> {
        self.vendor
    }

    #[must_use]
    pub fn product(&self) -> Option<u16> {
        self.product
    }

    #[must_use]
    pub fn address(&self) -> Option<u8> {
        self.address
    }

    /// Returns whether every specified field equals the identity's field.
    #[must_use]
    pub fn matches(&self, identity: &DeviceIdentity) -> bool {
        self.mismatched_fields(identity).is_empty()
    }

    /// Returns the names of specified fields that differ from `identity`.
    #[must_use]
    pub fn mismatched_fields(&self, identity: &DeviceIdentity) -> Vec<&'static str> {
        let mut mismatched = Vec::new();
        if self.vendor.is_some_and(|vendor| vendor != identity.vendor) {
            mismatched.push("vendor");
        }
        if self.product.is_some_and(|product| product != identity.product) {
            mismatched.push("product");
        }
        if self.address.is_some_and(|address| address != identity.address) {
            mismatched.push("address");
        }
        mismatched
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vendor={} product={} address={}",
            format_id(self.vendor),
            format_id(self.product),
            self.address
                .map_or_else(|| "any".to_string(), |address| address.to_string()),
        )
    }
}

/// Identity of an opened or discovered device.
#[derive(Debug, Clone, Copy, Eq, PartialEq, derive_more::Display)]
#[display("vendor={vendor:#06x} product={product:#06x} address={address}")]
pub struct DeviceIdentity {
    vendor: u16,
    product: u16,
    address: u8,
}

impl DeviceIdentity {
    #[must_use]
    pub fn new(vendor: u16, product: u16, address: u8) -> Self {
        Self {
            vendor,
            product,
            address,
        }
    }

    #[must_use]
    pub fn vendor(&self) -> u16 {
        self.vendor
    }

    #[must_use]
    pub fn product(&self) -> u16 {
        self.product
    }

    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }
}

/// Raw record returned by transport discovery.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DiscoveredDevice {
    name: String,
    identity: DeviceIdentity,
}

impl DiscoveredDevice {
    #[must_use]
    pub fn new(name: impl Into<String>, identity: DeviceIdentity) -> Self {
        Self {
            name: name.into(),
            identity,
        }
    }

    /// Returns the product (or manufacturer) string reported by the device.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}

/// Ordered `(field, value)` pairs read from one control.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ControlFields {
    fields: Vec<(&'static str, i64)>,
}

impl ControlFields {
    #[must_use]
    pub fn new(fields: Vec<(&'static str, i64)>) -> Self {
        Self { fields }
    }

    /// Returns field pairs in wire order.
    #[must_use]
    pub fn fields(&self) -> &[(&'static str, i64)] {
        &self.fields
    }

    /// Returns the values in wire order, dropping field names.
    #[must_use]
    pub fn values(&self) -> Vec<i64> {
        self.fields.iter().map(|(_name, value)| *value).collect()
    }
}

impl From<Vec<(&'static str, i64)>> for ControlFields {
    fn from(fields: Vec<(&'static str, i64)>) -> Self {
        Self::new(fields)
    }
}

/// Minimum and maximum readings for one control.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FieldRange {
    min: ControlFields,
    max: ControlFields,
}

impl FieldRange {
    #[must_use]
    pub fn new(min: ControlFields, max: ControlFields) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn min(&self) -> &ControlFields {
        &self.min
    }

    #[must_use]
    pub fn max(&self) -> &ControlFields {
        &self.max
    }
}

fn non_zero<T: Default + PartialEq>(value: T) -> Option<T> {
    if value == T::default() {
        None
    } else {
        Some(value)
    }
}

fn format_id(value: Option<u16>) -> String {
    value.map_or_else(|| "any".to_string(), |id| format!("{id:#06x}"))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn selector_display_names_unconstrained_fields() {
        let selector = DeviceSelector::new(Some(0x046d), None, Some(7));
        assert_eq!(
            "vendor=0x046d product=any address=7",
            selector.to_string()
        );
    }

    #[rstest]
    #[case(DeviceSelector::default(), Vec::<&str>::new())]
    #[case(DeviceSelector::new(Some(0x046d), Some(0x082d), Some(3)), Vec::<&str>::new())]
    #[case(DeviceSelector::new(Some(0x1234), None, None), vec!["vendor"])]
    #[case(DeviceSelector::new(None, Some(0x0001), Some(9)), vec!["product", "address"])]
    fn selector_reports_mismatched_fields(
        #[case] selector: DeviceSelector,
        #[case] expected: Vec<&str>,
    ) {
        let identity = DeviceIdentity::new(0x046d, 0x082d, 3);
        assert_eq!(expected, selector.mismatched_fields(&identity));
    }

    #[test]
    fn identity_display_uses_hex_ids() {
        assert_eq!(
            "vendor=0x046d product=0x082d address=3",
            DeviceIdentity::new(0x046d, 0x082d, 3).to_string()
        );
    }
}
