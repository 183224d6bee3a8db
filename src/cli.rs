use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "ytsum",
    about = "Streaming YouTube summary backend for the companion browser extension",
    version
)]
pub struct Cli {
    /// Config file (defaults to ~/.config/ytsum/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listening port (overrides config file and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}
