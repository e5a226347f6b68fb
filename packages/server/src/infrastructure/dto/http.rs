//! HTTP API response DTOs for the relay.

use serde::{Deserialize, Serialize};

/// Relay status for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayStatusDto {
    /// Number of users with a registered connection
    pub connections: usize,
    /// Change stream lifecycle state
    pub change_stream: ChangeStreamStatusDto,
    pub started_at: String, // ISO 8601
}

/// Change router lifecycle state as exposed over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum ChangeStreamStatusDto {
    Starting,
    Healthy,
    Reconnecting { attempt: u32 },
    Stopped,
    Failed,
}
