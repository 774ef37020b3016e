//! `taskpiper` API server -- Users and Tasks over an embedded document
//! store, with pending-task reference consistency.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 0.0.0.0:3000
//! cargo run --bin taskpiper-server
//!
//! # Run on custom address with demo data
//! cargo run --bin taskpiper-server -- --bind 127.0.0.1:8080 --seed
//!
//! # Or via environment variable
//! TASKPIPER_ADDR=127.0.0.1:8080 cargo run --bin taskpiper-server
//! ```

use std::sync::Arc;

use clap::Parser;
use taskpiper_server::config::{CliArgs, ServerConfig};
use taskpiper_server::http::{self, AppState};
use taskpiper_server::seed;
use taskpiper_store::Store;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, "starting taskpiper server");

    let store = Store::new();
    if cli.seed {
        if let Err(e) = seed::seed_store(&store).await {
            tracing::error!(error = %e, "seeding failed");
            std::process::exit(1);
        }
    }
    let state = Arc::new(AppState::new(&store).await);

    match http::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "api server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "api server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start api server");
            std::process::exit(1);
        }
    }
}
