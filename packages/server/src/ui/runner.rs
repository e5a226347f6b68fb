//! Server assembly and lifecycle.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use balance_relay_shared::time::now_timestamp_millis;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::RelayConfig,
    domain::{AccountChangeSource, ConnectionRegistry},
    error::ServerError,
    infrastructure::{
        change_source::MongoAccountChangeSource, repository::InMemoryConnectionRegistry,
    },
    ui::{
        change_router::{ChangeRouter, ChangeRouterHandle, ReconnectPolicy, RouterState},
        handler::{health_check, relay_status, websocket_handler},
        signal::shutdown_signal,
        state::AppState,
    },
};

/// Build the axum router: WebSocket endpoint plus HTTP API.
///
/// Clients are accepted from any origin.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .route("/api/status", get(relay_status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A relay bound to a listener, with its change router already running.
pub struct RelayServer {
    listener: TcpListener,
    registry: Arc<dyn ConnectionRegistry>,
    router: ChangeRouterHandle,
    app: Router,
}

impl RelayServer {
    /// Create the registry, start the change router on `source`, and
    /// prepare the HTTP app on `listener`.
    pub fn new(
        listener: TcpListener,
        source: Arc<dyn AccountChangeSource>,
        policy: ReconnectPolicy,
    ) -> Self {
        let registry: Arc<dyn ConnectionRegistry> = Arc::new(InMemoryConnectionRegistry::new());
        let router = ChangeRouter::spawn(source, registry.clone(), policy);

        let state = Arc::new(AppState {
            registry: registry.clone(),
            router_state: router.subscribe_state(),
            started_at: now_timestamp_millis(),
        });
        let app = build_router(state);

        Self {
            listener,
            registry,
            router,
            app,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<dyn ConnectionRegistry> {
        self.registry.clone()
    }

    pub fn router_state(&self) -> watch::Receiver<RouterState> {
        self.router.subscribe_state()
    }

    /// Serve until `shutdown` resolves or the change router fails.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Router` if the change stream could not be
    /// recovered, or `ServerError::Serve` on an I/O failure of the listener
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Self {
            listener,
            router,
            app,
            ..
        } = self;

        let router_failed = wait_for_failure(router.subscribe_state());
        let stop = async move {
            tokio::select! {
                _ = shutdown => {}
                _ = router_failed => tracing::error!("Change router failed, shutting down"),
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(stop)
            .await
            .map_err(ServerError::Serve)?;

        router.shutdown().await?;
        tracing::info!("Relay stopped");
        Ok(())
    }
}

// The state channel closes when the router task ends, which only happens on
// failure or after shutdown was requested.
async fn wait_for_failure(mut state: watch::Receiver<RouterState>) {
    let _ = state.wait_for(|s| *s == RouterState::Failed).await;
}

/// Run the relay with `config` until a shutdown signal arrives.
pub async fn run(config: RelayConfig) -> Result<(), ServerError> {
    let source = MongoAccountChangeSource::connect(&config.mongo).await?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: e,
        })?;
    tracing::info!("Realtime relay listening on {}", addr);

    RelayServer::new(listener, Arc::new(source), config.reconnect)
        .run_until(shutdown_signal())
        .await
}
