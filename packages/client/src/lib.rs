//! CLI client for the balance relay.
//!
//! Connects to the relay, registers a user id, and prints every account
//! update pushed for that user.

use balance_relay_server::infrastructure::dto::websocket::{
    MessageType, RegisterUserMessage, UserUpdatedMessage,
};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Connect to `url`, register as `user_id`, and print updates until the
/// relay closes the connection or Ctrl+C is pressed.
pub async fn run_client(url: &str, user_id: &str) -> Result<(), ClientError> {
    let (ws, _response) = connect_async(url).await?;
    tracing::info!("Connected to {}", url);

    let (mut sender, mut receiver) = ws.split();

    let register = RegisterUserMessage {
        r#type: MessageType::RegisterUser,
        user_id: user_id.to_string(),
    };
    sender
        .send(Message::Text(serde_json::to_string(&register)?.into()))
        .await?;
    tracing::info!("Registered as '{}', waiting for account updates", user_id);

    loop {
        let msg = tokio::select! {
            msg = receiver.next() => msg,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, closing connection");
                sender.send(Message::Close(None)).await?;
                break;
            }
        };

        match msg {
            Some(Ok(Message::Text(text))) => print_update(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                tracing::info!("Relay closed the connection");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }

    Ok(())
}

fn print_update(text: &str) {
    if let Some(user) = parse_update(text) {
        let received_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let pretty = serde_json::to_string_pretty(&user).unwrap_or_else(|_| user.to_string());
        println!("[{received_at}] user-updated\n{pretty}");
    }
}

/// Account document carried by a `user-updated` frame.
///
/// Any other frame is logged and yields `None`.
fn parse_update(text: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<UserUpdatedMessage>(text) {
        Ok(update) if update.r#type == MessageType::UserUpdated => Some(update.user),
        Ok(update) => {
            tracing::warn!("Ignoring {:?} message from relay", update.r#type);
            None
        }
        Err(e) => {
            tracing::warn!("Unexpected message from relay: {} ({})", text, e);
            None
        }
    }
}
