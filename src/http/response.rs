//! Gateway-generated responses.
//!
//! Gate rejections live in `gate::rejection`; this module covers everything
//! else the gateway answers itself.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use crate::auth::token::unix_now;
use crate::gate::rejection::INTERNAL_ERROR_MESSAGE;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub timestamp: u64,
    pub uptime: f64,
}

/// `GET /health`, never gated.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK",
        timestamp: unix_now(),
        uptime: state.started.elapsed().as_secs_f64(),
    })
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "message": message }))).into_response()
}

pub fn bad_request() -> Response {
    failure(StatusCode::BAD_REQUEST, "Invalid request path")
}

pub fn not_found() -> Response {
    failure(StatusCode::NOT_FOUND, "Route not found")
}

pub fn bad_gateway() -> Response {
    failure(StatusCode::BAD_GATEWAY, "Upstream request failed")
}

pub fn internal_error() -> Response {
    failure(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
}
