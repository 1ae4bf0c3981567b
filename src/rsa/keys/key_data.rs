use std::fmt::{Display, Formatter};
use std::str::FromStr;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal used by legacy key files for a field nobody filled in.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "PrivateKey")]
    Private,
    #[serde(rename = "PublicKey")]
    Public,
    #[serde(rename = "Unknown")]
    Unspecified,
}

/// Totient function chosen when the key pair was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Euler,
    Carmichael,
}

impl Algorithm {
    pub fn tag(&self) -> &'static str {
        match self {
            Algorithm::Euler => "Euler",
            Algorithm::Carmichael => "Carmichael",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Algorithm::Euler => "Euler totient function φ(n)",
            Algorithm::Carmichael => "Carmichael function λ(n)",
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        for alg in [Algorithm::Euler, Algorithm::Carmichael] {
            if s == alg.description() { return Ok(alg); }
        }
        match s.to_ascii_lowercase().as_str() {
            "euler" | "phi" => Ok(Algorithm::Euler),
            "carmichael" | "lambda" => Ok(Algorithm::Carmichael),
            _ => Err(s.to_string()),
        }
    }
}

impl Serialize for Algorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.description())
    }
}

impl<'de> Deserialize<'de> for Algorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|s| serde::de::Error::custom(format!("unknown algorithm `{}`", s)))
    }
}

/// A metadata field that is either known or carries the legacy "Unknown" marker.
///
/// A field that is truly absent is modelled one level up as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    Known(T),
    Unknown,
}

impl<T> Attr<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Attr::Known(v) => Some(v),
            Attr::Unknown => None,
        }
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Known(v) => v.serialize(serializer),
            Attr::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

#[derive(Deserialize)]
enum Sentinel {
    Unknown,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AttrRepr<T> {
    Sentinel(Sentinel),
    Known(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match AttrRepr::<T>::deserialize(deserializer)? {
            AttrRepr::Sentinel(Sentinel::Unknown) => Attr::Unknown,
            AttrRepr::Known(v) => Attr::Known(v),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<Attr<String>>,
    #[serde(default)]
    pub algorithm: Option<Attr<Algorithm>>,
    #[serde(default)]
    pub length: Option<Attr<u64>>,
}

/// The "unset" metadata of legacy key files: every field is "Unknown".
impl Default for Metadata {
    fn default() -> Self {
        Self {
            name: Some(Attr::Unknown),
            algorithm: Some(Attr::Unknown),
            length: Some(Attr::Unknown),
        }
    }
}

impl Metadata {
    pub fn new(name: Option<String>, algorithm: Algorithm, length: u64) -> Self {
        Self {
            name: name.map(Metadata::name_attr),
            algorithm: Some(Attr::Known(algorithm)),
            length: Some(Attr::Known(length)),
        }
    }

    /// "Unknown" as a name is the sentinel, not a name.
    pub fn name_attr(name: String) -> Attr<String> {
        if name == UNKNOWN { Attr::Unknown } else { Attr::Known(name) }
    }

    /// The name when it is set and not the "Unknown" sentinel.
    pub fn known_name(&self) -> Option<&str> {
        self.name.as_ref().and_then(Attr::known).map(String::as_str)
    }

    pub fn known_algorithm(&self) -> Option<Algorithm> {
        self.algorithm.as_ref().and_then(Attr::known).copied()
    }

    pub fn known_length(&self) -> Option<u64> {
        self.length.as_ref().and_then(Attr::known).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    #[serde(rename = "type")]
    pub kind: KeyType,
    #[serde(rename = "key exponent", with = "decimal")]
    pub exponent: BigUint,
    #[serde(rename = "mod n", with = "decimal")]
    pub modulus: BigUint,
    pub metadata: Metadata,
}

impl Default for Key {
    fn default() -> Self {
        Self {
            kind: KeyType::Unspecified,
            exponent: BigUint::zero(),
            modulus: BigUint::zero(),
            metadata: Metadata::default(),
        }
    }
}

impl Key {
    pub fn new(kind: KeyType, exponent: BigUint, modulus: BigUint, metadata: Metadata) -> Self {
        Self { kind, exponent, modulus, metadata }
    }

    /// `exponent < modulus`
    pub fn is_well_formed(&self) -> bool {
        self.exponent < self.modulus
    }

    /// floor(log2(modulus)), `None` for a zero modulus.
    pub fn modulus_log2(&self) -> Option<u64> {
        self.modulus.bits().checked_sub(1)
    }

    pub fn info(&self) -> String {
        let kind = match self.kind {
            KeyType::Private => "private",
            KeyType::Public => "public",
            KeyType::Unspecified => "unspecified",
        };
        format!(
            "{} key, name: {}, algorithm: {}, length: {}, modulus bits: {}",
            kind,
            self.metadata.known_name().unwrap_or(UNKNOWN),
            self.metadata.known_algorithm().map(|a| a.tag()).unwrap_or(UNKNOWN),
            self.metadata.known_length().map(|l| l.to_string()).unwrap_or_else(|| UNKNOWN.to_string()),
            self.modulus.bits(),
        )
    }
}

/// Big integers travel as decimal strings in the structured formats.
///
/// Reading also takes plain integer scalars, as long as the format parsed
/// them exactly. Numbers that fell back to floating point are refused.
mod decimal {
    use std::fmt::Formatter;
    use std::str::FromStr;
    use num_bigint::BigUint;
    use serde::de::{Error, Unexpected, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(n: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&n.to_str_radix(10))
    }

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = BigUint;

        fn expecting(&self, f: &mut Formatter) -> std::fmt::Result {
            write!(f, "a non-negative integer or a decimal string")
        }

        fn visit_str<E: Error>(self, v: &str) -> Result<BigUint, E> {
            BigUint::from_str(v.trim()).map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_u64<E: Error>(self, v: u64) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_u128<E: Error>(self, v: u128) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_i64<E: Error>(self, v: i64) -> Result<BigUint, E> {
            u64::try_from(v).map(BigUint::from).map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
        }

        fn visit_i128<E: Error>(self, v: i128) -> Result<BigUint, E> {
            u128::try_from(v).map(BigUint::from)
                .map_err(|_| E::custom(format!("negative integer {} where a non-negative one was expected", v)))
        }

        fn visit_f64<E: Error>(self, v: f64) -> Result<BigUint, E> {
            Err(E::custom(format!(
                "number {} is not an exact integer, write large values as decimal strings", v
            )))
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}
