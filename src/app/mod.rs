//! HTTP API for permit lookups.
//!
//! `GET /search_permits` runs the jurisdiction cascade for one address or
//! parcel; `GET /health` reports liveness and the number of registered
//! adapters.

use crate::core::PermitSearchService;
use crate::domain::{SearchParams, SearchResponse};
use crate::utils::error::{ErrorCategory, PermitError};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Build the axum Router with all endpoints.
pub fn router(service: Arc<PermitSearchService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search_permits", get(search_permits))
        .layer(cors)
        .with_state(service)
}

/// Serve on an already-bound listener until the future is dropped.
pub async fn serve(listener: tokio::net::TcpListener, service: Arc<PermitSearchService>) -> anyhow::Result<()> {
    let app = router(service);
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn start(addr: SocketAddr, service: Arc<PermitSearchService>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Permit search API listening on http://{}", listener.local_addr()?);
    serve(listener, service).await
}

impl IntoResponse for PermitError {
    fn into_response(self) -> Response {
        let (status, code) = match self.category() {
            ErrorCategory::Input => (StatusCode::BAD_REQUEST, "E_INVALID_QUERY"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "E_INTERNAL"),
        };
        let body = json!({
            "error": { "code": code, "message": self.user_friendly_message() }
        });
        (status, Json(body)).into_response()
    }
}

async fn health(State(service): State<Arc<PermitSearchService>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "adapters": service.adapter_count(),
    }))
}

async fn search_permits(
    State(service): State<Arc<PermitSearchService>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, PermitError> {
    // 查詢字串解析失敗也要回 JSON 錯誤格式
    let Query(params) = params.map_err(|rejection| {
        tracing::warn!("Rejected search: {}", rejection.body_text());
        PermitError::invalid_query(rejection.body_text())
    })?;

    tracing::info!(
        "🔍 search_permits address={:?} parcel={:?}",
        params.address,
        params.parcel
    );

    match service.search(params).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            tracing::warn!("Rejected search: {}", e);
            Err(e)
        }
    }
}
