//! WebSocket connection handlers.
//!
//! Each connection runs two tasks: a reader that handles `register-user`
//! messages, and a writer that drains the connection's outbound queue in
//! FIFO order. When either ends, the other is aborted and the connection's
//! registration is removed.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::task::JoinHandle;

use crate::{
    domain::{ConnectionHandle, ConnectionIdFactory},
    infrastructure::dto::websocket::{MessageType, RegisterUserMessage, UserUpdatedMessage},
    ui::state::AppState,
    usecase::{DisconnectConnectionUseCase, RegisterUserUseCase},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = ConnectionIdFactory::generate();
    let (handle, mut rx) = ConnectionHandle::channel(connection_id);
    tracing::info!("Client connected: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Spawn a task to receive messages from this client
    let register_usecase = RegisterUserUseCase::new(state.registry.clone());
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&register_usecase, &handle, text.as_str()).await;
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Connection {} requested close", connection_id);
                    break;
                }
                _ => {}
            }
        }
    });

    // Spawn a task to push account updates to this client
    let send_task = tokio::spawn(async move {
        while let Some(push) = rx.recv().await {
            let message = UserUpdatedMessage::from(push);
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("Failed to serialize user-updated: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other and wait for it
    join_first(recv_task, send_task).await;

    let disconnect_usecase = DisconnectConnectionUseCase::new(state.registry.clone());
    match disconnect_usecase.execute(connection_id).await {
        Some(user_id) => tracing::info!(
            "Client disconnected: {} (user '{}' unregistered)",
            connection_id,
            user_id
        ),
        None => tracing::info!("Client disconnected: {}", connection_id),
    }
}

/// Wait for either task to finish, then abort the other and wait until it has
/// stopped.
///
/// Once this returns, neither task can touch the registry again, so the
/// connection's unregister cannot be followed by a late register.
async fn join_first(mut reader: JoinHandle<()>, mut writer: JoinHandle<()>) {
    let reader_finished = tokio::select! {
        _ = &mut reader => true,
        _ = &mut writer => false,
    };

    let remaining = if reader_finished { writer } else { reader };
    remaining.abort();
    let _ = remaining.await;
}

async fn handle_text(usecase: &RegisterUserUseCase, handle: &ConnectionHandle, text: &str) {
    let msg = match serde_json::from_str::<RegisterUserMessage>(text) {
        Ok(msg) if msg.r#type == MessageType::RegisterUser => msg,
        Ok(msg) => {
            tracing::warn!(
                "Ignoring unexpected {:?} message on connection {}",
                msg.r#type,
                handle.id()
            );
            return;
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed message on connection {}: {}", handle.id(), e);
            return;
        }
    };

    match usecase.execute(msg.user_id, handle.clone()).await {
        Ok(outcome) => {
            tracing::info!(
                "User {} registered with connection {}",
                outcome.user_id,
                handle.id()
            );
            if let Some(displaced) = outcome.displaced {
                tracing::debug!(
                    "Connection {} no longer receives updates for '{}'",
                    displaced,
                    outcome.user_id
                );
            }
        }
        Err(e) => {
            tracing::warn!("Ignoring register-user on connection {}: {}", handle.id(), e);
        }
    }
}
