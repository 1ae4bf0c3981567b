//! Chunked `m^e mod n` over byte streams.
//!
//! The plain transform cuts the input into `chunk_size` byte groups and writes
//! every result with its minimal big-endian encoding. A result with leading
//! zero bytes comes out shorter than its neighbours, so chunk boundaries shift
//! when the output is fed back in. [`seal`]/[`open`] avoid that with a length
//! header and fixed-width chunks.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use num_bigint::BigUint;
use num_traits::One;
use thiserror::Error;
use crate::rsa::keys::Key;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Modulus of {0} bits leaves no room for a whole byte per chunk")]
    ChunkTooSmall(u64),
    #[error("Malformed input: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// How the output chunks are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Minimal big-endian chunks, concatenated.
    #[default]
    Minimal,
    /// `u64le(length)` header and chunks padded to the modulus width.
    LengthPrefixed,
}

impl Framing {
    /// Encrypt direction: plain transform or [`seal`].
    pub fn forward(&self, key: &Key, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        match self {
            Framing::Minimal => apply_bytes(key, input),
            Framing::LengthPrefixed => seal(key, input),
        }
    }

    /// Decrypt direction: plain transform or [`open`].
    pub fn backward(&self, key: &Key, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        match self {
            Framing::Minimal => apply_bytes(key, input),
            Framing::LengthPrefixed => open(key, input),
        }
    }
}

/// Bytes per input chunk: the known key length, else floor(log2(modulus)), over 8.
///
/// A modulus below 2 is refused whatever length the metadata claims.
pub fn chunk_size(key: &Key) -> Result<usize, TransformError> {
    if key.modulus <= BigUint::one() {
        return Err(TransformError::ChunkTooSmall(key.modulus.bits()));
    }
    let bits = match key.metadata.known_length() {
        Some(length) => length,
        None => key.modulus_log2().ok_or(TransformError::ChunkTooSmall(0))?,
    };
    match (bits / 8) as usize {
        0 => Err(TransformError::ChunkTooSmall(bits)),
        n => Ok(n),
    }
}

fn crypt(key: &Key, chunk: &[u8]) -> BigUint {
    BigUint::from_bytes_be(chunk).modpow(&key.exponent, &key.modulus)
}

fn apply_chunk(key: &Key, chunk: &[u8]) -> Vec<u8> {
    crypt(key, chunk).to_bytes_be()
}

pub fn apply_bytes(key: &Key, input: &[u8]) -> Result<Vec<u8>, TransformError> {
    let size = chunk_size(key)?;
    let mut out = Vec::with_capacity(input.len() + size);
    for chunk in input.chunks(size) {
        out.extend(apply_chunk(key, chunk));
    }
    Ok(out)
}

pub fn apply_str(key: &Key, input: &str) -> Result<Vec<u8>, TransformError> {
    apply_bytes(key, input.as_bytes())
}

pub fn read_source(reader: &mut dyn Read, bytes: usize) -> std::io::Result<Vec<u8>> {
    let mut res = Vec::with_capacity(bytes);
    Read::take(&mut *reader, bytes as u64).read_to_end(&mut res)?;
    Ok(res)
}

/// Pulls `chunk_size` bytes at a time until the reader runs dry.
pub fn apply_reader(key: &Key, reader: &mut dyn Read) -> Result<Vec<u8>, TransformError> {
    let size = chunk_size(key)?;
    log::debug!("transform with chunk size {}", size);
    let mut out = Vec::new();
    loop {
        let source = read_source(reader, size)?;
        if source.is_empty() { break; }
        out.extend(apply_chunk(key, &source));
    }
    Ok(out)
}

pub fn apply_file(key: &Key, path: impl AsRef<Path>) -> Result<Vec<u8>, TransformError> {
    let mut file = File::open(path)?;
    apply_reader(key, &mut file)
}

/// Left-pads `n` to exactly `len` bytes, `None` if it does not fit.
fn to_fixed_be(n: &BigUint, len: usize) -> Option<Vec<u8>> {
    let bytes = if n.bits() == 0 { vec![] } else { n.to_bytes_be() };
    if bytes.len() > len { return None; }
    let mut res = vec![0u8; len - bytes.len()];
    res.extend(bytes);
    Some(res)
}

/// (plain chunk bytes, framed chunk bytes) for the length-prefixed layout.
fn framed_sizes(key: &Key) -> Result<(usize, usize), TransformError> {
    let bits = key.modulus.bits();
    let plain = (bits.saturating_sub(1) / 8) as usize;
    if plain == 0 {
        return Err(TransformError::ChunkTooSmall(bits));
    }
    Ok((plain, ((bits + 7) / 8) as usize))
}

/// Length-prefixed transform, undone by [`open`] with the other half of the pair.
///
/// Plain chunks are sized from the modulus alone so every chunk value stays below it.
pub fn seal(key: &Key, input: &[u8]) -> Result<Vec<u8>, TransformError> {
    let (plain, width) = framed_sizes(key)?;
    let mut out = Vec::with_capacity(8 + (input.len() / plain + 1) * width);
    out.extend((input.len() as u64).to_le_bytes());
    for chunk in input.chunks(plain) {
        let c = crypt(key, chunk);
        // c < n, so it always fits the modulus width
        out.extend(to_fixed_be(&c, width).unwrap_or_default());
    }
    Ok(out)
}

pub fn open(key: &Key, input: &[u8]) -> Result<Vec<u8>, TransformError> {
    let (plain, width) = framed_sizes(key)?;
    if input.len() < 8 {
        return Err(TransformError::Malformed("missing length header".to_string()));
    }
    let (header, body) = input.split_at(8);
    let mut len = [0u8; 8];
    len.copy_from_slice(header);
    let total = u64::from_le_bytes(len);
    let chunks = total / plain as u64 + u64::from(total % plain as u64 != 0);
    let expect_len = chunks.checked_mul(width as u64);
    if expect_len != Some(body.len() as u64) {
        return Err(TransformError::Malformed(format!(
            "{} bytes of data need {} chunks of {} bytes, got {} bytes", total, chunks, width, body.len()
        )));
    }
    // bounded by the body length checked above
    let total = total as usize;
    let mut out = Vec::with_capacity(total);
    for (i, chunk) in body.chunks(width).enumerate() {
        let expect = plain.min(total - i * plain);
        let m = crypt(key, chunk);
        let bytes = to_fixed_be(&m, expect)
            .ok_or_else(|| TransformError::Malformed(format!("chunk {} does not fit {} bytes", i, expect)))?;
        out.extend(bytes);
    }
    Ok(out)
}
