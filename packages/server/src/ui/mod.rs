//! UI layer: WebSocket/HTTP handlers and the change router task.

pub mod change_router;
mod handler;
mod runner;
mod signal;
pub mod state;

pub use change_router::{ChangeRouter, ChangeRouterHandle, ReconnectPolicy, RouterState};
pub use runner::{RelayServer, build_router, run};
