//! guacgate - access gateway for guacd-backed remote desktop tunnels
//!
//! Authenticates every request, enforces per-connection-profile allow-lists,
//! tracks live tunnel sessions and manages the persisted profile catalog.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};

use guacgate::{
    cli::Cli,
    config::{self, Settings},
    server::Gateway,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let path = cli.config.unwrap_or_else(config::config_path);

    // Settings decide the log level, so load before installing the
    // subscriber and report the outcome afterwards.
    let (mut settings, load_error) = match Settings::load(&path) {
        Ok(settings) => (settings, None),
        Err(e) => (Settings::default(), Some(e)),
    };

    let level = cli.log_level.unwrap_or_else(|| settings.log_level());
    if let Err(e) = setup_tracing(&level) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match load_error {
        Some(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load settings, continuing with defaults");
        }
        None => info!(path = %path.display(), "Settings loaded"),
    }

    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    let gateway = Gateway::new(settings, path);
    if let Err(e) = gateway.run().await {
        error!(error = %e, "Gateway failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
