use std::error::Error;
use std::fs::File;
use std::io;
use std::io::{Read, Write};
use indicatif::{ProgressBar, ProgressStyle};
use num_bigint::BigUint;

pub mod config;
pub mod euclid;
pub mod generator;
pub mod keys;
pub mod prime_gen;
pub mod transform;

pub use config::*;
pub use generator::*;
pub use keys::*;
pub use prime_gen::*;
pub use transform::{Framing, TransformError};

impl Config {
    pub fn prime_source(&self) -> MillerRabin {
        MillerRabin::new(self.rounds, self.time_max, self.threads, !self.no_retry)
    }

    pub fn framing(&self) -> Framing {
        if self.framed { Framing::LengthPrefixed } else { Framing::Minimal }
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if self.silent { return None; }
        let pb = ProgressBar::new(len);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .ok()?
            .progress_chars("#>-"));
        Some(pb)
    }

    /// Input stream, file reads are tracked by a progress bar.
    pub fn reader(&self) -> io::Result<Box<dyn Read>> {
        Ok(match self.input.as_str() {
            "stdin" => Box::new(io::stdin()),
            f => {
                let file = File::open(f)?;
                let len = file.metadata()?.len();
                match self.progress_bar(len) {
                    Some(pb) => Box::new(pb.wrap_read(file)),
                    None => Box::new(file),
                }
            }
        })
    }

    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        Ok(match self.output.as_str() {
            "stdout" => Box::new(io::stdout()),
            f => Box::new(File::create(f)?),
        })
    }

    fn generate(&self) -> Result<(), Box<dyn Error>> {
        let mut generator = KeyGenerator::new(self.prime_source());
        let pair = generator.generate_by_name(self.bits, self.comment.as_deref(), &self.algorithm)?;
        log::info!("{}", pair.private().info());
        pair.save(&self.key, self.format)?;
        log::info!("Generated key files: {}, {}", self.key, public_path(self.key.as_ref()).display());
        Ok(())
    }

    fn process(&self, mode: RunMode) -> Result<(), Box<dyn Error>> {
        let path = match mode {
            RunMode::Decode => self.key.clone().into(),
            _ => public_path(self.key.as_ref()),
        };
        let key = KeyReader::open(&path)?.read_key(self.format)?;
        log::info!("Using {}", key.info());
        let mut reader = self.reader()?;
        let framing = self.framing();
        let res = match (framing, mode) {
            (Framing::Minimal, _) => transform::apply_reader(&key, &mut reader)?,
            (_, RunMode::Decode) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                framing.backward(&key, &data)?
            }
            _ => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data)?;
                framing.forward(&key, &data)?
            }
        };
        let mut writer = self.writer()?;
        writer.write_all(&res)?;
        writer.flush()?;
        log::info!("Done, {} bytes written", res.len());
        Ok(())
    }

    /// Loads both halves and pushes random chunks through public then private exponent.
    fn test_pair(&self) -> Result<(), Box<dyn Error>> {
        let pair = KeyPair::load(&self.key, self.format)?;
        log::info!("{}", pair.private().info());
        log::info!("{}", pair.public().info());
        let (public, private) = (pair.public(), pair.private());
        let mut source = self.prime_source();
        let width = ((pair.modulus().bits() + 7) / 8) as usize;
        for _ in 0..64 {
            let m = BigUint::from_bytes_be(&source.secure_random_bytes(width)) % pair.modulus();
            let c = m.modpow(&public.exponent, &public.modulus);
            if c.modpow(&private.exponent, &private.modulus) != m {
                return Err(format!("key pair does not round trip {}", m).into());
            }
        }
        let data = source.secure_random_bytes(width * 16 + 3);
        let sealed = transform::seal(public, &data)?;
        if transform::open(private, &sealed)? != data {
            return Err("sealed data does not round trip".into());
        }
        log::info!("Test pass");
        Ok(())
    }

    pub fn run(&self) -> Result<(), Box<dyn Error>> {
        match self.mode {
            RunMode::Generate => self.generate(),
            RunMode::Test => self.test_pair(),
            mode => self.process(mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fs;
    use clap::Parser;
    use crate::rsa::*;

    fn config(args: &[&str]) -> Config {
        let mut all = vec!["rsa-keytool", "-s", "-t", "2"];
        all.extend_from_slice(args);
        Config::try_parse_from(all).unwrap()
    }

    #[test]
    fn function_test() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let key = dir.path().join("test");
        let key = key.to_str().unwrap();
        let plain = dir.path().join("plain.txt");
        let sealed = dir.path().join("sealed.bin");
        let opened = dir.path().join("opened.txt");
        let text = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod tempor \x00\x00 incididunt";
        fs::write(&plain, text)?;

        config(&["-m", "generate", "-k", key, "-b", "256", "-c", "lab", "-f", "json"]).run()?;
        assert!(fs::read_to_string(public_path(key.as_ref()))?.contains("\"lab\""));
        config(&["-m", "test", "-k", key, "-f", "json"]).run()?;
        config(&["-m", "encode", "-k", key, "-f", "json", "--framed",
            "-i", plain.to_str().unwrap(), "-o", sealed.to_str().unwrap()]).run()?;
        config(&["-m", "decode", "-k", key, "-f", "json", "--framed",
            "-i", sealed.to_str().unwrap(), "-o", opened.to_str().unwrap()]).run()?;
        assert_eq!(fs::read(&opened)?, text);
        Ok(())
    }

    #[test]
    fn bad_algorithm_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("bad");
        let res = config(&["-m", "generate", "-k", key.to_str().unwrap(), "-a", "fermat"]).run();
        assert!(res.is_err());
        assert!(!key.exists());
    }
}
