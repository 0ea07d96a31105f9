//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

/// Access gateway for guacd-backed remote desktop tunnels
#[derive(Parser, Debug)]
#[command(name = "guacgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the settings file (YAML); defaults to $CONFIG_PATH or config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (overrides the settings file)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides the settings file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Log level (error, warn, info, debug, trace); defaults to $LOG_LEVEL or the settings file
    #[arg(long)]
    pub log_level: Option<String>,
}
