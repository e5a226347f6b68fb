//! Shared utilities for balance-relay binaries.

pub mod logger;
pub mod time;
