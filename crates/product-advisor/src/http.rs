use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::{info, warn};

use advisor_common::api::{SearchRequest, SearchResponse};

use crate::error::AppError;
use crate::orchestrator::SearchOrchestrator;

pub fn router(orchestrator: SearchOrchestrator) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/search", post(search).fallback(method_not_allowed))
        .with_state(orchestrator)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn search(
    State(orchestrator): State<SearchOrchestrator>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    // An unreadable body carries no query, so it is reported like an empty one.
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection, "rejected search body");
            SearchRequest::default()
        }
    };
    info!(query = %request.query, language = ?request.language, "search request");
    orchestrator.search(&request).await.map(Json)
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
