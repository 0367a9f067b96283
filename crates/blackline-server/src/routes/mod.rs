//! HTTP route handlers.

pub mod documents;
pub mod pii;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use blackline_core::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub(crate) type ApiResponse = (StatusCode, Json<serde_json::Value>);

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(status::routes())
        .merge(pii::routes())
        .merge(documents::routes())
}

/// Map a pipeline error to a status code and `{ "error": reason }` body.
pub(crate) fn error_response(err: &Error) -> ApiResponse {
    let status = match err {
        Error::DetectionFailure(_) => StatusCode::BAD_GATEWAY,
        Error::MalformedInput(_) | Error::Config(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() })))
}
