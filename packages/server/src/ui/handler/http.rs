//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use balance_relay_shared::time::timestamp_to_rfc3339;

use crate::{
    infrastructure::dto::http::{ChangeStreamStatusDto, RelayStatusDto},
    ui::{change_router::RouterState, state::AppState},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Relay status: registered connections and change stream state
pub async fn relay_status(State(state): State<Arc<AppState>>) -> Json<RelayStatusDto> {
    let router_state = *state.router_state.borrow();

    Json(RelayStatusDto {
        connections: state.registry.count().await,
        change_stream: router_state.into(),
        started_at: timestamp_to_rfc3339(state.started_at),
    })
}

impl From<RouterState> for ChangeStreamStatusDto {
    fn from(state: RouterState) -> Self {
        match state {
            RouterState::Starting => Self::Starting,
            RouterState::Healthy => Self::Healthy,
            RouterState::Reconnecting { attempt } => Self::Reconnecting { attempt },
            RouterState::Stopped => Self::Stopped,
            RouterState::Failed => Self::Failed,
        }
    }
}
