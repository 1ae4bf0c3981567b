use std::fs::File;
use std::io::Write;
use crate::rsa::keys::{encode_str, Key, KeyError, KeyFormat, StreamMode};

/// Key sink. Every format is written as text, so the sink has to be opened in text mode.
pub struct KeyWriter<W: Write> {
    writer: W,
    pub mode: StreamMode,
}

impl<W: Write> From<W> for KeyWriter<W> {
    fn from(w: W) -> Self {
        Self::new(w)
    }
}

impl<W: Write> KeyWriter<W> {
    pub fn new(writer: W) -> Self {
        KeyWriter { writer, mode: StreamMode::Text }
    }

    pub fn binary(writer: W) -> Self {
        KeyWriter { writer, mode: StreamMode::Binary }
    }

    pub fn write_key(&mut self, key: &Key, format: KeyFormat) -> Result<(), KeyError> {
        if self.mode == StreamMode::Binary {
            return Err(KeyError::PreconditionViolation(format!("{:?} keys need a text-mode sink", format)));
        }
        let text = encode_str(key, format)?;
        log::debug!("writing {:?} key as {:?}, {} chars", key.kind, format, text.len());
        self.writer.write_all(text.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl KeyWriter<File> {
    pub fn create(path: impl AsRef<std::path::Path>) -> Result<Self, KeyError> {
        Ok(Self::new(File::create(path)?))
    }
}
