//! WebSocket message DTOs for the relay.

use serde::{Deserialize, Serialize};

use crate::domain::Push;

/// Message type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    RegisterUser,
    UserUpdated,
}

/// Registration sent by a client right after connecting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserMessage {
    pub r#type: MessageType,
    #[serde(alias = "userId")]
    pub user_id: String,
}

/// Updated account document pushed to the owning client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdatedMessage {
    pub r#type: MessageType,
    /// Full account document after the change
    pub user: serde_json::Value,
}

impl From<Push> for UserUpdatedMessage {
    fn from(push: Push) -> Self {
        match push {
            Push::UserUpdated(document) => Self {
                r#type: MessageType::UserUpdated,
                user: document.into_value(),
            },
        }
    }
}
