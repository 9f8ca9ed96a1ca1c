use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use dbi_core::session::{DbiSession, SessionConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "dbibackend",
    author,
    version,
    about = "Install local titles into Nintendo Switch via USB",
    long_about = None
)]
struct Args {
    /// Path to directory with NSP/NSZ/XCI files
    #[arg(short = 'd', long)]
    rom_dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    /// Optional TOML session config; command line flags take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Args {
    fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load_from_file(path)?,
            None => SessionConfig::default(),
        };
        if let Some(dir) = &self.rom_dir {
            config.root_dir = dir.clone();
        }
        if self.debug {
            config.debug_logging = true;
        }
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();

    let config = match args.session_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if config.debug_logging {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(root = %config.root_dir.display(), "Starting DBI backend (nusb backend)...");

    match DbiSession::new(config).run() {
        Ok(end) => info!(reason = %end, "Session finished"),
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rom_dir_and_debug_flags() {
        let args = Args::try_parse_from(["dbibackend", "-d", "/games", "--debug"]).unwrap();
        let config = args.session_config().unwrap();
        assert_eq!(config.root_dir, PathBuf::from("/games"));
        assert!(config.debug_logging);
    }

    #[test]
    fn test_rom_dir_is_required() {
        let args = Args::try_parse_from(["dbibackend"]).unwrap();
        let config = args.session_config().unwrap();
        assert!(config.validate().is_err());
    }
}
