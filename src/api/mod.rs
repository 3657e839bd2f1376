//! HTTP API server for the tutor conversation service

mod auth;
pub mod chat;
pub mod health;
pub mod rate_limit;
pub mod sessions;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use secrecy::SecretString;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::conversation::ConversationManager;
use crate::db::DbPool;
use crate::error::ErrorKind;
use crate::{Error, Result};

pub use auth::CALLER_HEADER;

/// Information about the completion model in use
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_id: String,
    pub provider: String,
}

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub conversations: ConversationManager,
    pub api_key: Option<SecretString>,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
    pub model_info: Option<ModelInfo>,
}

/// Error returned from handlers, rendered as `{"error": "..."}`
///
/// Upstream failures are logged in full and surfaced as a generic 500.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
        }

        let (status, message) = match self.0.kind() {
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ErrorKind::InvalidInput => {
                let message = match self.0 {
                    Error::InvalidInput(msg) => msg,
                    other => other.to_string(),
                };
                (StatusCode::BAD_REQUEST, message)
            }
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ErrorKind::UpstreamFailure => {
                tracing::error!(error = %self.0, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Configuration for building an API server
pub struct ApiServerBuilder {
    db: DbPool,
    conversations: ConversationManager,
    port: u16,
    api_key: Option<SecretString>,
    rate_limit_per_minute: Option<u32>,
    model_info: Option<ModelInfo>,
}

impl ApiServerBuilder {
    /// Create a new API server builder
    #[must_use]
    pub const fn new(db: DbPool, conversations: ConversationManager, port: u16) -> Self {
        Self {
            db,
            conversations,
            port,
            api_key: None,
            rate_limit_per_minute: None,
            model_info: None,
        }
    }

    /// Require this shared secret as a Bearer token
    #[must_use]
    pub fn api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    /// Limit the API to this many requests per minute
    #[must_use]
    pub const fn rate_limit(mut self, per_minute: Option<u32>) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Set the model info reported by `/status`
    #[must_use]
    pub fn model_info(mut self, info: ModelInfo) -> Self {
        self.model_info = Some(info);
        self
    }

    /// Build the API server
    #[must_use]
    pub fn build(self) -> ApiServer {
        let rate_limiter = self.rate_limit_per_minute.map(rate_limit::create_limiter);

        let state = Arc::new(ApiState {
            db: self.db,
            conversations: self.conversations,
            api_key: self.api_key,
            rate_limiter,
            model_info: self.model_info,
        });

        ApiServer {
            state,
            port: self.port,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Build the full application router
    #[must_use]
    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        if self.state.api_key.is_none() {
            tracing::warn!("FLUENTO_API_KEY not set - API accepts unauthenticated callers");
        }

        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown signal received");
                }
            })
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

/// Assemble the router for a given state
pub fn router(state: Arc<ApiState>) -> Router {
    let api = Router::new()
        .merge(chat::router())
        .merge(sessions::router())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state.clone());

    let router = Router::new()
        .nest("/api", api)
        .merge(health::router())
        .merge(health::ready_router(state.clone()));

    // Rate limiting (only when configured)
    let router = router.layer(axum::middleware::from_fn_with_state(
        state,
        rate_limit::rate_limit_middleware,
    ));

    // CORS layer for cross-origin requests from the front-end
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router.layer(cors).layer(TraceLayer::new_for_http())
}
