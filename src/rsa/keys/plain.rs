use num_bigint::BigUint;
use num_traits::Num;
use crate::rsa::keys::{Key, KeyError, KeyType, Metadata};

pub fn to_decimal(key: &Key) -> String {
    format!("{}\n{}", key.exponent, key.modulus)
}

pub fn to_hex(key: &Key) -> String {
    format!("{:#x}\n{:#x}", key.exponent, key.modulus)
}

pub fn from_decimal(data: &str) -> Result<Key, KeyError> {
    parse_pair(data, |s| BigUint::from_str_radix(s, 10).ok())
}

pub fn from_hex(data: &str) -> Result<Key, KeyError> {
    parse_pair(data, |s| {
        let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
        BigUint::from_str_radix(digits, 16).ok()
    })
}

/// Only exponent and modulus survive, the rest comes back as the "Unknown" sentinel.
fn parse_pair(data: &str, parse: impl Fn(&str) -> Option<BigUint>) -> Result<Key, KeyError> {
    let mut lines = data.lines().map(str::trim);
    let mut next = |what: &str| -> Result<BigUint, KeyError> {
        let line = lines.next().ok_or_else(|| KeyError::DecodeMalformed(format!("missing {} line", what)))?;
        if line.is_empty() || line.contains('_') {
            return Err(KeyError::DecodeMalformed(format!("cannot parse {} `{}`", what, line)));
        }
        parse(line).ok_or_else(|| KeyError::DecodeMalformed(format!("cannot parse {} `{}`", what, line)))
    };
    let exponent = next("exponent")?;
    let modulus = next("modulus")?;
    Ok(Key::new(KeyType::Unspecified, exponent, modulus, Metadata::default()))
}
