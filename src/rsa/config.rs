use clap::{Parser, ValueEnum};
use lazy_static::lazy_static;
use crate::rsa::keys::KeyFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Generate,
    Encode,
    Decode,
    Test,
}

#[derive(Debug, Clone, Parser)]
#[clap(name = "rsa-keytool", about = "RSA generate / encode / decode tool")]
pub struct Config {
    #[clap(short, long, value_enum, default_value_t = CONFIG_DEF.mode, help = "Run mode")]
    pub mode: RunMode,
    #[clap(short, long, default_value = CONFIG_DEF.key.as_str(), help = "Key path, generate/detect `path' and `path.pub'")]
    pub key: String,
    #[clap(short, long, help = "Key name stored with the key files")]
    pub comment: Option<String>,
    #[clap(short, long, value_enum, default_value_t = CONFIG_DEF.format, help = "Key file format")]
    pub format: KeyFormat,
    #[clap(short, long, default_value_t = CONFIG_DEF.bits, help = "Modulus bits")]
    pub bits: u64,
    #[clap(short, long, default_value = CONFIG_DEF.algorithm.as_str(), help = "Totient function: carmichael or euler")]
    pub algorithm: String,
    #[clap(short, long, default_value = CONFIG_DEF.input.as_str(), help = "Input filename")]
    pub input: String,
    #[clap(short, long, default_value = CONFIG_DEF.output.as_str(), help = "Output filename")]
    pub output: String,
    #[clap(long, help = "Length-prefixed fixed-width chunks instead of minimal ones")]
    pub framed: bool,
    #[clap(short, long, default_value_t = CONFIG_DEF.rounds, help = "Miller Rabin calculate rounds")]
    pub rounds: u32,
    #[clap(long, default_value_t = CONFIG_DEF.time_max, help = "Max time in mill seconds that trying to generate a prime")]
    pub time_max: i64,
    #[clap(short, long, help = "Disable log output")]
    pub silent: bool,
    #[clap(long, help = "Fail instead of retrying when a prime search times out")]
    pub no_retry: bool,
    #[clap(short, long, default_value_t = CONFIG_DEF.threads, help = "Search primes in <THREADS> threads")]
    pub threads: usize,
}

lazy_static! {
    pub static ref CONFIG_DEF: Config = Config {
        mode: RunMode::Generate,
        key: String::from("key"),
        comment: None,
        format: KeyFormat::Armored,
        bits: 1024,
        algorithm: String::from("carmichael"),
        input: String::from("stdin"),
        output: String::from("stdout"),
        framed: false,
        rounds: 10,
        time_max: 1000,
        silent: false,
        no_retry: false,
        threads: num_cpus::get(),
    };
}
