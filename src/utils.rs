use std::num::ParseIntError;

/// Integer types parseable from a string in an explicit radix.
pub(crate) trait FromRadix: Sized {
    fn from_str_radix(value: &str, radix: u32) -> Result<Self, ParseIntError>;
}

macro_rules! impl_from_radix {
    ($($ty:ty),*) => {
        $(
            impl FromRadix for $ty {
                fn from_str_radix(value: &str, radix: u32) -> Result<Self, ParseIntError> {
                    <$ty>::from_str_radix(value, radix)
                }
            }
        )*
    };
}

impl_from_radix!(u8, u16, i64);

/// Parses a hexadecimal (`0x46d`) or decimal (`1133`) integer.
pub(crate) fn parse_int<T: FromRadix>(value: &str) -> Result<T, ParseIntError> {
    let trimmed = value.trim();
    let (sign, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", trimmed),
    };

    match unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Some(hex_digits) => T::from_str_radix(&format!("{sign}{hex_digits}"), 16),
        None => T::from_str_radix(trimmed, 10),
    }
}
