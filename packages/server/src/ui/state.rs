//! Server state shared by the HTTP and WebSocket handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{domain::ConnectionRegistry, ui::change_router::RouterState};

/// Shared application state
pub struct AppState {
    /// Registry（接続管理の抽象化。Change Router と共有）
    pub registry: Arc<dyn ConnectionRegistry>,
    /// Change Router のライフサイクル状態
    pub router_state: watch::Receiver<RouterState>,
    /// Unix timestamp when the relay started (UTC, milliseconds)
    pub started_at: i64,
}
