use std::error::Error;
use clap::Parser;
use log::LevelFilter;
use rsa_keytool::{Config, RunMode};

fn main() -> Result<(), Box<dyn Error>> {
    let mut config = Config::parse();
    if config.output == "stdout" && matches!(config.mode, RunMode::Encode | RunMode::Decode) {
        config.silent = true;
    }
    env_logger::builder()
        .filter_level(if config.silent { LevelFilter::Off } else { LevelFilter::Info })
        .parse_default_env()
        .init();
    log::debug!("Run args: {:?}", config);
    config.run()?;
    Ok(())
}
