//! Router, shared state and server lifecycle.

use std::sync::Arc;

use axum::middleware;
use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::decompose::Decomposer;
use crate::identity::{self, AccountAdmin, IdentityVerifier};
use crate::llm::{GeminiClient, ModelClient};
use crate::store::{self, SharedTaskStore};

use super::account;
use super::auth;
use super::decompose;
use super::todos;
use super::types::HealthResponse;

/// Shared application state. Immutable after startup.
pub struct AppState {
    pub config: Config,
    /// Decomposition pipeline
    pub decomposer: Decomposer,
    /// Task record store (shared with the pipeline)
    pub store: SharedTaskStore,
    /// Bearer token verifier; `None` makes protected routes fail closed
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
    /// Account administration; `None` disables account deletion
    pub admin: Option<Arc<dyn AccountAdmin>>,
}

impl AppState {
    /// Wire collaborators from configuration.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = store::create_task_store(&config)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open task store: {}", e))?;

        let model: Option<Arc<dyn ModelClient>> = match GeminiClient::from_config(&config.model)? {
            Some(client) => Some(Arc::new(client)),
            None => {
                tracing::warn!("GEMINI_API_KEY not set; decomposition requests will fail");
                None
            }
        };

        let verifier = identity::create_verifier(&config);
        if verifier.is_none() {
            tracing::warn!("No token verifier configured; protected routes will return 500");
        }
        let admin = identity::create_account_admin(&config);

        tracing::info!(
            task_store = %config.task_store,
            persistent = store.is_persistent(),
            model = %config.model.model,
            "Application state ready"
        );

        let decomposer = Decomposer::new(model, Arc::clone(&store), config.limits);
        Ok(Self {
            config,
            decomposer,
            store,
            verifier,
            admin,
        })
    }
}

/// Build the router for the given state.
pub fn app(state: Arc<AppState>) -> Router {
    let public_routes = Router::new().route("/api/health", get(health));

    let protected_routes = Router::new()
        .route("/api/ai-todos", post(decompose::decompose))
        .nest("/api/todos", todos::routes())
        .route("/api/account/delete", post(account::delete_account))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState::from_config(config).await?);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for SIGINT or SIGTERM. In-flight requests finish; a decomposition cut
/// off before its store call leaves nothing behind.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        task_store: state.config.task_store.to_string(),
        store_persistent: state.store.is_persistent(),
        model_configured: state.decomposer.has_model(),
        auth_configured: state.verifier.is_some(),
        account_admin_configured: state.admin.is_some(),
    })
}
