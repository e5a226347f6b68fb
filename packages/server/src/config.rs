//! Command-line and environment configuration.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use clap::Parser;

use crate::{infrastructure::change_source::MongoConfig, ui::ReconnectPolicy};

/// Realtime account update relay
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// MongoDB connection string of the account store
    #[arg(long, env = "MONGODB_URI")]
    pub mongodb_uri: String,

    /// Database holding the account collection
    #[arg(long, env = "DB_NAME", default_value = "test")]
    pub db_name: String,

    /// Account collection to watch
    #[arg(long, env = "ACCOUNT_COLLECTION", default_value = "users")]
    pub collection: String,

    /// Consecutive failed reconnect attempts tolerated before exiting
    #[arg(long, env = "MAX_RECONNECT_ATTEMPTS", default_value_t = 10)]
    pub max_reconnect_attempts: u32,

    /// Delay before the first reconnect attempt (milliseconds)
    #[arg(long, env = "INITIAL_BACKOFF_MS", default_value_t = 500)]
    pub initial_backoff_ms: u64,

    /// Upper bound on the delay between reconnect attempts (milliseconds)
    #[arg(long, env = "MAX_BACKOFF_MS", default_value_t = 30_000)]
    pub max_backoff_ms: u64,

    /// Default log level when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "debug")]
    pub log_level: String,
}

/// Environment variable naming an explicit env file to load instead of `.env`
pub const ENV_FILE_VAR: &str = "RELAY_ENV_FILE";

/// Load environment variables from an env file before arguments are parsed.
///
/// With no `path`, a `.env` in the current directory or one of its parents
/// is used if present. Variables already set in the process environment
/// take precedence over the file.
///
/// # Errors
///
/// Returns an error if an explicit `path` is missing or any file is malformed
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, dotenvy::Error> {
    match path {
        Some(path) => dotenvy::from_path(path).map(|()| Some(path.to_path_buf())),
        None => match dotenvy::dotenv() {
            Ok(found) => Ok(Some(found)),
            Err(e) if e.not_found() => Ok(None),
            Err(e) => Err(e),
        },
    }
}

/// Resolved relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub mongo: MongoConfig,
    pub reconnect: ReconnectPolicy,
}

impl From<ServerArgs> for RelayConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            mongo: MongoConfig {
                uri: args.mongodb_uri,
                db_name: args.db_name,
                collection: args.collection,
            },
            reconnect: ReconnectPolicy {
                max_attempts: args.max_reconnect_attempts,
                initial_backoff: Duration::from_millis(args.initial_backoff_ms),
                max_backoff: Duration::from_millis(args.max_backoff_ms),
                ..ReconnectPolicy::default()
            },
        }
    }
}
