use std::fs::File;
use std::io::Read;
use crate::rsa::keys::{decode_str, Key, KeyError, KeyFormat, StreamMode};

/// Key source, the text-mode counterpart of [`KeyWriter`](crate::rsa::keys::KeyWriter).
pub struct KeyReader<R: Read> {
    reader: R,
    pub mode: StreamMode,
}

impl<R: Read> From<R> for KeyReader<R> {
    fn from(r: R) -> Self {
        Self::new(r)
    }
}

impl<R: Read> KeyReader<R> {
    pub fn new(reader: R) -> Self {
        KeyReader { reader, mode: StreamMode::Text }
    }

    pub fn binary(reader: R) -> Self {
        KeyReader { reader, mode: StreamMode::Binary }
    }

    /// Whole content of the source as text. Content that is not UTF-8 is
    /// binary data, which no key format accepts.
    fn read_text(&mut self, format: KeyFormat) -> Result<String, KeyError> {
        if self.mode == StreamMode::Binary {
            return Err(KeyError::PreconditionViolation(format!("{:?} keys need a text-mode source", format)));
        }
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|_| KeyError::PreconditionViolation("key source holds binary data".to_string()))
    }

    pub fn read_key(&mut self, format: KeyFormat) -> Result<Key, KeyError> {
        let text = self.read_text(format)?;
        let key = decode_str(format, &text)?;
        log::debug!("read {:?} key from {:?}, modulus {} bits", key.kind, format, key.modulus.bits());
        Ok(key)
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl KeyReader<File> {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, KeyError> {
        Ok(Self::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io::Cursor;
    use num_bigint::BigUint;
    use crate::rsa::keys::*;

    #[test]
    fn text_source() -> Result<(), Box<dyn Error>> {
        let mut reader = KeyReader::new(Cursor::new("0x7\n0xbb\n"));
        let key = reader.read_key(KeyFormat::Hex)?;
        assert_eq!(key.exponent, BigUint::from(7u32));
        assert_eq!(key.modulus, BigUint::from(187u32));
        Ok(())
    }

    #[test]
    fn binary_source_is_rejected() {
        for format in [KeyFormat::Json, KeyFormat::Yaml, KeyFormat::Decimal, KeyFormat::Armored, KeyFormat::Hex] {
            let mut reader = KeyReader::binary(Cursor::new("7\n187"));
            assert!(matches!(reader.read_key(format), Err(KeyError::PreconditionViolation(_))), "{:?}", format);
        }
    }

    #[test]
    fn binary_content_is_rejected() {
        let mut reader = KeyReader::new(Cursor::new(vec![0xffu8, 0xfe, 0x00, 0x81]));
        assert!(matches!(reader.read_key(KeyFormat::Armored), Err(KeyError::PreconditionViolation(_))));
    }
}
