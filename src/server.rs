//! HTTP API.
//!
//! - `GET /api/sources?type=movie|tv&title=..&season=..&episode=..`
//! - `GET /` service info

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::candidate::SourcesResponse;
use crate::config::Config;
use crate::error::ResolveError;
use crate::request::SourceQuery;
use crate::resolver::Resolver;

/// Body sent for every internal fault; details only go to the log.
const INTERNAL_MESSAGE: &str = "Failed to get sources";

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

impl AppState {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }
}

/// Wrapper so [`ResolveError`] can be returned from handlers.
pub struct AppError(ResolveError);

impl From<ResolveError> for AppError {
    fn from(e: ResolveError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "source lookup failed");
            INTERNAL_MESSAGE
        } else {
            tracing::debug!(status = %status, error = %self.0, "rejected request");
            self.0.message()
        };

        let body = json!({
            "error": message,
            "code": self.0.code(),
        });
        (status, Json(body)).into_response()
    }
}

/// Build the router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/", get(info))
        .route("/api/sources", get(get_sources))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": format!("streamfind {}", crate::VERSION),
        "policy": state.resolver.policy(),
        "providers": state.resolver.provider_names(),
    }))
}

async fn get_sources(
    State(state): State<AppState>,
    query: Result<Query<SourceQuery>, QueryRejection>,
) -> Result<Json<SourcesResponse>, AppError> {
    let Query(query) = query.map_err(|e| ResolveError::InvalidRequest(e.body_text()))?;
    let request = query.into_request()?;

    // Provider panics are contained by the resolver; this only catches
    // faults in the orchestration itself.
    let resolver = Arc::clone(&state.resolver);
    let sources = tokio::spawn(async move { resolver.resolve(&request).await })
        .await
        .map_err(|e| ResolveError::Internal(format!("resolver task failed: {e}")))?;

    Ok(Json(sources.into()))
}

/// Run the HTTP server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the resolver can't be built or the address can't be
/// bound.
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::new(config.build_resolver()?);
    let resolver = Arc::clone(&state.resolver);
    let app = build_router(state);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(
        %addr,
        policy = %resolver.policy(),
        providers = ?resolver.provider_names(),
        "streamfind listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    resolver.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_request_is_400_with_message() {
        let response = AppError::from(ResolveError::InvalidRequest("Missing type or title".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_is_500() {
        let response = AppError::from(ResolveError::Internal("boom".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
