use axum::{Json, Router, http::StatusCode, response::IntoResponse, routing::get};

use giftmarket_auth::{RouteDescriptor, Verb};

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![(Verb::Get, "/health", RouteDescriptor::new("system.health").public())]
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}
