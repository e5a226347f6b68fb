//! Realtime account update relay library.
//!
//! Watches the account store's change stream and pushes each updated account
//! document to the WebSocket connection currently registered for its owner.

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::{RelayConfig, ServerArgs};
pub use ui::{RelayServer, run as run_server};
