//! HTTP host for the resolution service.
//!
//! Routes:
//! - `POST /api/placeholders/resolve`
//! - `POST /api/dependencies/resolve`
//! - `GET /health`
//!
//! Accepted requests always answer `200 OK`, with per-path failures carried in
//! the body. Only request-level rejections map to error statuses.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use realmpath_engine::{RequestError, ResolutionService};
use realmpath_types::{
    DependencyResolutionRequest, DependencyResolutionResponse, PlaceholderResolutionRequest, PlaceholderResolutionResponse, RequestErrorBody,
};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ResolutionService>,
}

impl AppState {
    pub fn new(service: ResolutionService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Debug)]
pub enum ApiError {
    Request(RequestError),
    MalformedBody(JsonRejection),
}

impl From<RequestError> for ApiError {
    fn from(error: RequestError) -> Self {
        Self::Request(error)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Request(RequestError::RuleNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Request(RequestError::RuleLookup { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Request(_) => StatusCode::BAD_REQUEST,
            Self::MalformedBody(rejection) => rejection.status(),
        }
    }

    fn body(&self) -> RequestErrorBody {
        match self {
            Self::Request(error) => RequestErrorBody {
                error_code: error.code().to_string(),
                message: error.to_string(),
            },
            Self::MalformedBody(rejection) => RequestErrorBody {
                error_code: "MalformedRequest".to_string(),
                message: rejection.body_text(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!(error_code = %body.error_code, message = %body.message, "request failed");
        } else {
            warn!(error_code = %body.error_code, message = %body.message, "request rejected");
        }
        (status, Json(body)).into_response()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/placeholders/resolve", post(resolve_placeholders_handler))
        .route("/api/dependencies/resolve", post(resolve_dependencies_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// POST `/api/placeholders/resolve`
pub async fn resolve_placeholders_handler(
    State(state): State<AppState>,
    payload: Result<Json<PlaceholderResolutionRequest>, JsonRejection>,
) -> Result<Json<PlaceholderResolutionResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::MalformedBody)?;
    let response = state.service.resolve_placeholders(request).await?;
    Ok(Json(response))
}

/// POST `/api/dependencies/resolve`
pub async fn resolve_dependencies_handler(
    State(state): State<AppState>,
    payload: Result<Json<DependencyResolutionRequest>, JsonRejection>,
) -> Result<Json<DependencyResolutionResponse>, ApiError> {
    let Json(request) = payload.map_err(ApiError::MalformedBody)?;
    let response = state.service.resolve_dependencies(request).await?;
    Ok(Json(response))
}

/// GET `/health`
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let budget = state.service.budget();
    Json(json!({
        "status": "ok",
        "budget": budget,
    }))
}

/// Host configuration for a resolution HTTP server instance.
pub struct ResolutionHttpServer {
    bind_address: SocketAddr,
    state: AppState,
}

impl ResolutionHttpServer {
    pub fn new(bind_address: SocketAddr, service: ResolutionService) -> Self {
        Self {
            bind_address,
            state: AppState::new(service),
        }
    }

    /// Start the server and return a handle for shutdown.
    pub async fn start(self) -> Result<RunningHttpServer> {
        let cancellation_token = CancellationToken::new();
        let listener = tokio::net::TcpListener::bind(self.bind_address).await?;
        let bound_address = listener.local_addr()?;
        let app = router(self.state);

        let server_handle = tokio::spawn({
            let shutdown = cancellation_token.child_token();
            async move {
                if let Err(error) = axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        shutdown.cancelled().await;
                    })
                    .await
                {
                    error!(error = ?error, "resolution HTTP server stopped with an error");
                }
            }
        });

        info!(address = %bound_address, "resolution HTTP server listening");
        Ok(RunningHttpServer {
            bound_address,
            cancellation_token,
            server_handle,
        })
    }
}

/// Runtime handle for a running resolution HTTP server.
#[derive(Debug)]
pub struct RunningHttpServer {
    bound_address: SocketAddr,
    cancellation_token: CancellationToken,
    server_handle: JoinHandle<()>,
}

impl RunningHttpServer {
    pub fn bound_address(&self) -> SocketAddr {
        self.bound_address
    }

    /// Stop the server and wait for in-flight requests to drain.
    pub async fn stop(self) -> Result<()> {
        self.cancellation_token.cancel();
        self.server_handle
            .await
            .map_err(|error| anyhow!("resolution HTTP server task failed: {error}"))?;
        info!(address = %self.bound_address, "resolution HTTP server stopped");
        Ok(())
    }
}

/// Parses a configured bind address.
pub fn resolve_bind_address(bind_address: &str) -> Result<SocketAddr> {
    bind_address
        .parse()
        .map_err(|error| anyhow!("invalid bind address '{bind_address}': {error}"))
}
