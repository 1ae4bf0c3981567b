use num_bigint::{BigInt, BigUint, Sign};
use thiserror::Error;
use crate::rsa::euclid::{lcm, mod_inverse};
use crate::rsa::keys::{Algorithm, KeyPair, Metadata};
use crate::rsa::prime_gen::{PrimeError, PrimeSource};

/// Upper bound on public exponent candidates tried before giving up.
pub const MAX_COPRIME_ATTEMPTS: usize = 4096;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Invalid algorithm for RSA: `{0}`")]
    InvalidAlgorithm(String),
    #[error("Totient {0} leaves no public exponent to pick")]
    DegenerateTotient(BigUint),
    #[error("No exponent coprime to the totient after {0} attempts")]
    CoprimeRetryExhausted(usize),
    #[error(transparent)]
    Prime(#[from] PrimeError),
}

/// Splits `bits` between the two primes.
///
/// Above 64 bits the first prime is shortened by the length of `jitter`, so
/// prime sizes differ between calls that use different names.
pub fn divide_bits(bits: u64, jitter: &str) -> (u64, u64) {
    if bits > 64 {
        let p = (bits / 2).saturating_sub(jitter.chars().count() as u64).max(2);
        (p, bits - p)
    } else if bits <= 1 {
        (1, 1)
    } else {
        (bits / 2, bits - bits / 2)
    }
}

/// Euler's φ(n) or Carmichael's λ(n) for `n = p * q`.
pub fn totient(p: &BigUint, q: &BigUint, algorithm: Algorithm) -> BigUint {
    let p1 = BigInt::from_biguint(Sign::Plus, p - 1u32);
    let q1 = BigInt::from_biguint(Sign::Plus, q - 1u32);
    let t = match algorithm {
        Algorithm::Euler => &p1 * &q1,
        Algorithm::Carmichael => lcm(&p1, &q1),
    };
    t.magnitude().clone()
}

pub struct KeyGenerator<S: PrimeSource> {
    source: S,
}

impl<S: PrimeSource> KeyGenerator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&mut self) -> &mut S {
        &mut self.source
    }

    /// Random name used only to jitter prime sizes.
    fn random_string(&mut self) -> String {
        let len = 1 + (self.source.secure_random_bytes(1)[0] % 4) as usize;
        String::from_utf8_lossy(&self.source.secure_random_bytes(len)).into_owned()
    }

    /// Uniform sample in `[low, high)` drawn from the source's random bytes.
    fn random_range(&mut self, low: &BigUint, high: &BigUint) -> BigUint {
        let span = high - low;
        let bits = span.bits();
        let bytes = ((bits + 7) / 8) as usize;
        let extra = bytes as u64 * 8 - bits;
        loop {
            let mut buf = self.source.secure_random_bytes(bytes);
            if let Some(top) = buf.first_mut() {
                *top &= 0xffu8 >> extra;
            }
            let x = BigUint::from_bytes_be(&buf);
            if x < span {
                return low + x;
            }
        }
    }

    /// Parses `algorithm` first, so a bad selector never costs a prime.
    pub fn generate_by_name(&mut self, bits: u64, name: Option<&str>, algorithm: &str) -> Result<KeyPair, GenerateError> {
        let algorithm = algorithm.parse::<Algorithm>().map_err(GenerateError::InvalidAlgorithm)?;
        self.generate(bits, name, algorithm)
    }

    pub fn generate(&mut self, bits: u64, name: Option<&str>, algorithm: Algorithm) -> Result<KeyPair, GenerateError> {
        let jitter = match name {
            Some(name) => name.to_string(),
            None => self.random_string(),
        };
        let (p_bits, q_bits) = divide_bits(bits, &jitter);
        log::debug!("{} bits split into {} + {}", bits, p_bits, q_bits);
        let p = self.source.probable_prime(p_bits)?;
        let q = self.source.probable_prime(q_bits)?;
        let n = &p * &q;
        let f = totient(&p, &q, algorithm);
        let three = BigUint::from(3u32);
        if f <= three {
            return Err(GenerateError::DegenerateTotient(f));
        }
        let f_int = BigInt::from_biguint(Sign::Plus, f.clone());
        let mut attempts = 0;
        let (e, d) = loop {
            if attempts == MAX_COPRIME_ATTEMPTS {
                return Err(GenerateError::CoprimeRetryExhausted(attempts));
            }
            attempts += 1;
            let e = self.random_range(&three, &f);
            if let Some(d) = mod_inverse(&BigInt::from_biguint(Sign::Plus, e.clone()), &f_int) {
                break (e, d.magnitude().clone());
            }
        };
        log::debug!("public exponent found after {} attempts", attempts);
        let metadata = Metadata::new(name.map(String::from), algorithm, bits);
        Ok(KeyPair::new(e, d, n, metadata))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use num_bigint::{BigUint, ToBigUint};
    use num_traits::{One, Zero};
    use rand::rngs::StdRng;
    use rand::{RngCore, SeedableRng};
    use crate::rsa::keys::*;
    use crate::rsa::prime_gen::{MillerRabin, PrimeError, PrimeSource};
    use crate::rsa::transform;
    use super::*;

    /// Hands out fixed primes and seeded random bytes, counting prime requests.
    struct FixedPrimes {
        primes: Vec<BigUint>,
        requested: Vec<u64>,
        rng: StdRng,
    }

    impl FixedPrimes {
        fn new(primes: &[BigUint]) -> Self {
            Self { primes: primes.iter().rev().cloned().collect(), requested: vec![], rng: StdRng::seed_from_u64(0x5eed) }
        }
    }

    impl PrimeSource for FixedPrimes {
        fn probable_prime(&mut self, bits: u64) -> Result<BigUint, PrimeError> {
            self.requested.push(bits);
            self.primes.pop().ok_or(PrimeError::TooFewBits(bits))
        }

        fn secure_random_bytes(&mut self, n: usize) -> Vec<u8> {
            let mut buf = vec![0u8; n];
            self.rng.fill_bytes(&mut buf);
            buf
        }
    }

    fn big_primes() -> [BigUint; 2] {
        [(BigUint::one() << 127u32) - 1u32, (BigUint::one() << 128u32) - 159u32]
    }

    fn fast_source() -> MillerRabin {
        MillerRabin::new(10, 10_000, 2, true)
    }

    #[test]
    fn bit_split() {
        assert_eq!(divide_bits(512, "test"), (252, 260));
        assert_eq!(divide_bits(1024, "ab"), (510, 514));
        assert_eq!(divide_bits(64, "test"), (32, 32));
        assert_eq!(divide_bits(33, "test"), (16, 17));
        assert_eq!(divide_bits(2, ""), (1, 1));
        assert_eq!(divide_bits(1, "x"), (1, 1));
        assert_eq!(divide_bits(0, "x"), (1, 1));
        // a name longer than half the bits cannot push a prime below 2 bits
        assert_eq!(divide_bits(66, &"n".repeat(40)), (2, 64));
        let (p, q) = divide_bits(4096, "ñame");
        assert_eq!(p + q, 4096);
        assert_eq!(p, 2044);
    }

    #[test]
    fn totients() {
        let (p, q) = (61.to_biguint().unwrap(), 53.to_biguint().unwrap());
        assert_eq!(totient(&p, &q, Algorithm::Euler), 3120.to_biguint().unwrap());
        assert_eq!(totient(&p, &q, Algorithm::Carmichael), 780.to_biguint().unwrap());
    }

    #[test]
    fn key_algebra_holds() -> Result<(), Box<dyn Error>> {
        for algorithm in [Algorithm::Carmichael, Algorithm::Euler] {
            for seed in 0..8 {
                let [p, q] = big_primes();
                let mut generator = KeyGenerator::new(FixedPrimes::new(&[p.clone(), q.clone()]));
                generator.source().rng = StdRng::seed_from_u64(seed);
                let pair = generator.generate(255, Some("key"), algorithm)?;
                let f = totient(&p, &q, algorithm);
                let (e, d) = (&pair.public().exponent, &pair.private().exponent);
                assert!((e * d % &f).is_one(), "e * d mod {} != 1 for {:?}", f, algorithm);
                assert!(e >= &3u32.to_biguint().unwrap() && e < &f);
                assert!(d < &f);
                assert_eq!(pair.modulus(), &(&p * &q));
                assert_eq!(pair.metadata().known_algorithm(), Some(algorithm));
            }
        }
        Ok(())
    }

    #[test]
    fn generated_keys_algebra() -> Result<(), Box<dyn Error>> {
        for algorithm in [Algorithm::Carmichael, Algorithm::Euler] {
            let mut generator = KeyGenerator::new(fast_source());
            let pair = generator.generate(128, None, algorithm)?;
            let m = BigUint::from(0xdead_beefu32);
            let c = m.modpow(&pair.public().exponent, pair.modulus());
            assert_eq!(c.modpow(&pair.private().exponent, pair.modulus()), m);
            assert_eq!(pair.modulus().bits(), 128);
            assert_eq!(pair.metadata().name, None);
            assert_eq!(pair.metadata().known_length(), Some(128));
        }
        Ok(())
    }

    #[test]
    fn invalid_algorithm_samples_nothing() {
        let mut generator = KeyGenerator::new(FixedPrimes::new(&big_primes()));
        let res = generator.generate_by_name(255, Some("key"), "fermat");
        assert!(matches!(res, Err(GenerateError::InvalidAlgorithm(ref s)) if s == "fermat"));
        assert!(generator.source().requested.is_empty());
        assert!(generator.generate_by_name(255, Some("key"), "lambda").is_ok());
        assert_eq!(generator.source().requested, vec![124, 131]);
    }

    #[test]
    fn one_bit_is_degenerate() {
        // no prime has a single bit
        let mut generator = KeyGenerator::new(fast_source());
        let res = generator.generate(1, None, Algorithm::Carmichael);
        assert!(matches!(res, Err(GenerateError::Prime(PrimeError::TooFewBits(1)))));
        // with primes forced on it, the totient leaves nothing to choose from
        let two = 2.to_biguint().unwrap();
        let three = 3.to_biguint().unwrap();
        let mut generator = KeyGenerator::new(FixedPrimes::new(&[two, three]));
        let res = generator.generate(1, None, Algorithm::Euler);
        assert!(matches!(res, Err(GenerateError::DegenerateTotient(ref f)) if f == &2.to_biguint().unwrap()));
        assert_eq!(generator.source().requested, vec![1, 1]);
    }

    #[test]
    fn tiny_totient() {
        // 3 * 3: φ = 4 leaves only e = 3, λ = 2 leaves none
        let three = 3.to_biguint().unwrap();
        let mut generator = KeyGenerator::new(FixedPrimes::new(&[three.clone(), three.clone()]));
        let pair = generator.generate(4, Some("x"), Algorithm::Euler).unwrap();
        assert_eq!(pair.public().exponent, three);
        assert_eq!(pair.private().exponent, three);
        let mut generator = KeyGenerator::new(FixedPrimes::new(&[three.clone(), three]));
        assert!(matches!(generator.generate(4, Some("x"), Algorithm::Carmichael), Err(GenerateError::DegenerateTotient(_))));
    }

    #[test]
    fn random_range_bounds() {
        let mut generator = KeyGenerator::new(FixedPrimes::new(&[]));
        let (low, high) = (3.to_biguint().unwrap(), 260.to_biguint().unwrap());
        for _ in 0..500 {
            let x = generator.random_range(&low, &high);
            assert!(x >= low && x < high);
        }
        let one = generator.random_range(&low, &4.to_biguint().unwrap());
        assert_eq!(one, low);
        assert!(!one.is_zero());
    }

    #[test]
    fn scenario_512_carmichael_armored() -> Result<(), Box<dyn Error>> {
        let mut generator = KeyGenerator::new(fast_source());
        let pair = generator.generate(512, Some("test"), Algorithm::Carmichael)?;
        assert_eq!(pair.metadata().known_name(), Some("test"));
        assert_eq!(pair.modulus().bits(), 512);

        let (mut private, mut public) = (KeyWriter::new(Vec::new()), KeyWriter::new(Vec::new()));
        pair.write_to(KeyFormat::Armored, &mut private, &mut public)?;
        let public_text = String::from_utf8(public.into_inner())?;
        assert!(public_text.starts_with("rsa ") && public_text.ends_with(" test"));

        let back = KeyPair::read_from(
            KeyFormat::Armored,
            &mut KeyReader::new(std::io::Cursor::new(private.into_inner())),
            &mut KeyReader::new(public_text.as_bytes()),
        )?;
        assert_eq!(back.private().exponent, pair.private().exponent);
        assert_eq!(back.public().exponent, pair.public().exponent);
        assert_eq!(back.modulus(), pair.modulus());
        let log2 = pair.modulus().bits() - 1;
        assert_eq!(back.private().metadata.known_length(), Some(log2));
        assert_eq!(back.public().metadata.known_length(), Some(log2));
        assert_eq!(back.private().metadata.known_name(), Some("test"));
        assert_eq!(back.public().metadata.known_name(), Some("test"));
        Ok(())
    }

    /// Round trip over generated pairs. Messages are ascii, so every chunk
    /// value stays below a modulus with its top bit set. Cases where a
    /// transformed chunk has leading zero bytes are skipped: the minimal
    /// re-encoding drops those bytes and the chunk boundaries shift.
    #[test]
    fn transform_round_trip_generated() -> Result<(), Box<dyn Error>> {
        let messages = [
            "Hello RSA!",
            "The quick brown fox jumps over the lazy dog, again and again, until the chunk boundary is crossed twice over.",
            "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789abcdefghijklmnopqrstuvwxyz!!",
        ];
        let mut checked = 0;
        for algorithm in [Algorithm::Carmichael, Algorithm::Euler] {
            let mut generator = KeyGenerator::new(fast_source());
            let pair = generator.generate(256, Some("rt"), algorithm)?;
            let chunk = transform::chunk_size(pair.public())?;
            assert_eq!(chunk, 32);
            for msg in messages {
                let c = transform::apply_str(pair.public(), msg)?;
                let full = (msg.len() + chunk - 1) / chunk * chunk;
                if c.len() != full {
                    continue;
                }
                assert_eq!(transform::apply_bytes(pair.private(), &c)?, msg.as_bytes());
                checked += 1;
            }
        }
        assert!(checked > 0);
        Ok(())
    }
}
