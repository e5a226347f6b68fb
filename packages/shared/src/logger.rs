//! Tracing subscriber setup shared by the server and client binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence when set. Otherwise the binary's own target
/// logs at `default_level`, and `tower_http` logs at debug.
///
/// # Arguments
///
/// * `bin_name` - Binary name (e.g. `env!("CARGO_BIN_NAME")`)
/// * `default_level` - Level used for the binary's target when `RUST_LOG` is unset
pub fn setup_logger(bin_name: &str, default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(bin_name, default_level)));

    // try_init: integration tests may initialize more than once
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Library target whose logs every binary in the workspace wants to see.
const RELAY_TARGET: &str = "balance_relay_server";

fn default_directives(bin_name: &str, default_level: &str) -> String {
    let target = bin_name.replace('-', "_");
    if target == RELAY_TARGET {
        format!("{target}={default_level},tower_http=debug")
    } else {
        format!("{target}={default_level},{RELAY_TARGET}={default_level},tower_http=debug")
    }
}
