//! services/client/src/bin/carelink.rs

use clap::Parser;
use client_lib::{
    app::AppState,
    cli::{self, Cli},
    config::Config,
    error::ClientError,
};
use std::io::Write;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let args = Cli::parse();

    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    debug!(api = %config.api_base_url, "Configuration loaded");

    // --- 2. Build the Shared AppState ---
    let state = AppState::from_config(config)?;

    // --- 3. Restore Any Persisted Session ---
    // Nothing may be routed until this settles.
    let auth_state = state.session.init().await;
    info!(?auth_state, "Session initialized");

    // --- 4. Run the Command ---
    let result = cli::run(&state, args.command).await;
    state.session.teardown();

    match result {
        Ok(output) => {
            writeln!(std::io::stdout().lock(), "{}", output)?;
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
