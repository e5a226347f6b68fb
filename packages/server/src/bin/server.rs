//! Realtime account update relay.
//!
//! Pushes account changes from the store to the client registered for each user.
//!
//! Run with:
//! ```not_rust
//! MONGODB_URI=mongodb://localhost:27017 cargo run --bin balance-relay-server
//! ```
//!
//! Settings can also come from a `.env` file in the working directory.

use std::path::PathBuf;

use balance_relay_server::{
    RelayConfig, ServerArgs,
    config::{ENV_FILE_VAR, load_env_file},
};
use balance_relay_shared::logger::setup_logger;
use clap::Parser;

#[tokio::main]
async fn main() {
    // Load .env (or the file named by RELAY_ENV_FILE) before reading the environment
    let env_file = std::env::var_os(ENV_FILE_VAR).map(PathBuf::from);
    let env_loaded = load_env_file(env_file.as_deref());

    let args = ServerArgs::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    match env_loaded {
        Ok(Some(path)) => tracing::info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to load env file: {}", e),
    }

    // Run the server
    if let Err(e) = balance_relay_server::run_server(RelayConfig::from(args)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
