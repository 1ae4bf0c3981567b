use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use num_bigint::BigUint;
use crate::rsa::keys::*;

/// Private and public halves of one key, created together and never changed apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    private: Key,
    public: Key,
}

/// `path` -> `path.pub`
pub fn public_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(".pub");
    PathBuf::from(s)
}

impl KeyPair {
    pub fn new(public_exponent: BigUint, private_exponent: BigUint, modulus: BigUint, metadata: Metadata) -> Self {
        Self {
            private: Key::new(KeyType::Private, private_exponent, modulus.clone(), metadata.clone()),
            public: Key::new(KeyType::Public, public_exponent, modulus, metadata),
        }
    }

    /// Pairs two decoded keys, they must share a modulus.
    pub fn from_keys(private: Key, public: Key) -> Result<Self, KeyError> {
        if private.modulus != public.modulus {
            return Err(KeyError::ModulusMismatch);
        }
        Ok(Self { private, public })
    }

    pub fn private(&self) -> &Key {
        &self.private
    }

    pub fn public(&self) -> &Key {
        &self.public
    }

    pub fn modulus(&self) -> &BigUint {
        &self.public.modulus
    }

    pub fn metadata(&self) -> &Metadata {
        &self.private.metadata
    }

    pub fn into_keys(self) -> (Key, Key) {
        (self.private, self.public)
    }

    /// Private key first, then public key, both in `format`.
    pub fn write_to<P: Write, Q: Write>(&self, format: KeyFormat, private: &mut KeyWriter<P>, public: &mut KeyWriter<Q>) -> Result<(), KeyError> {
        private.write_key(&self.private, format)?;
        public.write_key(&self.public, format)
    }

    pub fn read_from<P: Read, Q: Read>(format: KeyFormat, private: &mut KeyReader<P>, public: &mut KeyReader<Q>) -> Result<Self, KeyError> {
        let private = private.read_key(format)?;
        let public = public.read_key(format)?;
        Self::from_keys(private, public)
    }

    /// Writes `path` (private) and `path.pub` (public).
    pub fn save(&self, path: impl AsRef<Path>, format: KeyFormat) -> Result<(), KeyError> {
        let path = path.as_ref();
        let mut private = KeyWriter::create(path)?;
        let mut public = KeyWriter::create(public_path(path))?;
        self.write_to(format, &mut private, &mut public)
    }

    pub fn load(path: impl AsRef<Path>, format: KeyFormat) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let mut private = KeyReader::open(path)?;
        let mut public = KeyReader::open(public_path(path))?;
        Self::read_from(format, &mut private, &mut public)
    }
}
