pub mod key_writer;
pub mod key_reader;
pub mod key_data;
pub mod key_pair;
pub mod armor;
pub mod structured;
pub mod plain;

pub use key_pair::*;
pub use key_reader::*;
pub use key_writer::*;
pub use key_data::*;

use clap::ValueEnum;
use thiserror::Error;

/// Base64 line width of the private key body.
const BASE64_SPLIT: usize = 76;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyFormat {
    Json,
    #[value(alias = "yml")]
    Yaml,
    /// exponent and modulus in base 10, metadata is lost
    #[value(alias = "raw")]
    Decimal,
    #[value(alias = "ascii")]
    Armored,
    /// exponent and modulus in base 16, metadata is lost
    Hex,
}

impl KeyFormat {
    /// Whether decoding gives back the metadata that was encoded.
    pub fn is_lossless(&self) -> bool {
        !matches!(self, KeyFormat::Decimal | KeyFormat::Hex)
    }
}

/// Rust streams carry no mode of their own, key sinks and sources declare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Text,
    Binary,
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("Malformed key data: {0}")]
    DecodeMalformed(String),
    #[error("Private and public key moduli differ")]
    ModulusMismatch,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

pub(crate) fn encode_str(key: &Key, format: KeyFormat) -> Result<String, KeyError> {
    match format {
        KeyFormat::Json => structured::to_json(key),
        KeyFormat::Yaml => structured::to_yaml(key),
        KeyFormat::Decimal => Ok(plain::to_decimal(key)),
        KeyFormat::Hex => Ok(plain::to_hex(key)),
        KeyFormat::Armored => Ok(armor::encode(key)),
    }
}

pub(crate) fn decode_str(format: KeyFormat, data: &str) -> Result<Key, KeyError> {
    match format {
        KeyFormat::Json => structured::from_json(data),
        KeyFormat::Yaml => structured::from_yaml(data),
        KeyFormat::Decimal => plain::from_decimal(data),
        KeyFormat::Hex => plain::from_hex(data),
        KeyFormat::Armored => armor::decode(data),
    }
}
