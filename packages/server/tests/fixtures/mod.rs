//! Shared test fixtures: an in-process relay fed by an in-memory change source.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use balance_relay_server::{
    RelayServer,
    domain::{
        AccountChange, AccountDocument, ConnectionId, ConnectionRegistry, UserId,
    },
    error::ServerError,
    infrastructure::change_source::InMemoryAccountChangeSource,
    ui::{ReconnectPolicy, RouterState},
};
use futures_util::{SinkExt, StreamExt};
use tokio::{net::TcpStream, sync::oneshot, task::JoinHandle};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client must stay silent for "no message delivered" assertions
pub const SILENCE: Duration = Duration::from_millis(300);

pub struct TestServer {
    addr: SocketAddr,
    source: Arc<InMemoryAccountChangeSource>,
    registry: Arc<dyn ConnectionRegistry>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Start a relay on an ephemeral port and wait until its change router
    /// has subscribed.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let source = Arc::new(InMemoryAccountChangeSource::new());
        let policy = ReconnectPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            multiplier: 2.0,
        };
        let server = RelayServer::new(listener, source.clone(), policy);
        let addr = server.local_addr().expect("Failed to read local address");
        let registry = server.registry();
        let mut router_state = server.router_state();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.await;
        }));

        tokio::time::timeout(
            WAIT_TIMEOUT,
            router_state.wait_for(|state| *state == RouterState::Healthy),
        )
        .await
        .expect("Change router did not become healthy")
        .expect("Change router state channel closed");

        Self {
            addr,
            source,
            registry,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn source(&self) -> &InMemoryAccountChangeSource {
        &self.source
    }

    /// Emit a change for `user_id` from the store. Returns the number of
    /// subscriptions that received it.
    pub async fn publish(&self, user_id: &str, document: serde_json::Value) -> usize {
        let change = AccountChange::new(user(user_id), AccountDocument::new(document));
        self.source.publish(change).await
    }

    /// Wait until `user_id` is registered to a connection other than `previous`.
    pub async fn wait_for_registration(
        &self,
        user_id: &str,
        previous: Option<ConnectionId>,
    ) -> ConnectionId {
        let user_id = user(user_id);
        tokio::time::timeout(WAIT_TIMEOUT, async {
            loop {
                if let Some(handle) = self.registry.lookup(&user_id).await
                    && Some(handle.id()) != previous
                {
                    return handle.id();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for registration")
    }

    /// Wait until `user_id` has no registered connection.
    pub async fn wait_for_unregistration(&self, user_id: &str) {
        let user_id = user(user_id);
        tokio::time::timeout(WAIT_TIMEOUT, async {
            while self.registry.lookup(&user_id).await.is_some() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for unregistration");
    }

    /// Wait until the in-memory store has `expected` open subscriptions.
    pub async fn wait_for_subscribers(&self, expected: usize) {
        tokio::time::timeout(WAIT_TIMEOUT, async {
            while self.source.subscriber_count().await != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Timed out waiting for change stream subscription");
    }

    pub async fn connect(&self) -> WsClient {
        let (ws, _response) = connect_async(self.ws_url())
            .await
            .expect("Failed to connect WebSocket");
        ws
    }

    pub async fn stop(mut self) -> Result<(), ServerError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task.await.expect("Relay task panicked")
    }
}

fn user(id: &str) -> UserId {
    UserId::new(id.to_string()).expect("Invalid test user id")
}

pub async fn send_text(ws: &mut WsClient, text: &str) {
    ws.send(Message::Text(text.to_string().into()))
        .await
        .expect("Failed to send WebSocket message");
}

pub async fn register(ws: &mut WsClient, user_id: &str) {
    let msg = serde_json::json!({"type": "register-user", "user_id": user_id});
    send_text(ws, &msg.to_string()).await;
}

/// Next text frame from the relay, parsed as JSON.
pub async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = tokio::time::timeout(WAIT_TIMEOUT, ws.next())
            .await
            .expect("Timed out waiting for message")
            .expect("WebSocket closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("Relay sent invalid JSON");
        }
    }
}

/// Assert the relay sends nothing to `ws` for a while.
pub async fn assert_silent(ws: &mut WsClient) {
    if let Ok(Some(Ok(Message::Text(text)))) = tokio::time::timeout(SILENCE, ws.next()).await {
        panic!("Expected no message, received: {}", text.as_str());
    }
}
