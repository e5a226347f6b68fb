//! Command-line client that prints account updates for one user.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin balance-relay-client -- --user-id 65f1c0ffee0123456789abcd
//! ```

use balance_relay_shared::logger::setup_logger;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, env = "RELAY_URL", default_value = "ws://127.0.0.1:5000/ws")]
    url: String,

    /// User id to register
    #[arg(short, long)]
    user_id: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");
    let args = Args::parse();

    if let Err(e) = balance_relay_client::run_client(&args.url, &args.user_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
