use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};

use giftmarket_auth::{RouteDescriptor, Verb};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};
use crate::middleware::bearer_token;

pub fn router() -> Router {
    Router::new().route("/sessions", post(login).delete(logout))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![
        (Verb::Post, "/sessions", RouteDescriptor::new("sessions.create").public()),
        (Verb::Delete, "/sessions", RouteDescriptor::new("sessions.delete")),
    ]
}

/// POST /sessions - exchange credentials for a bearer token
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    let principals = services.principals.clone();
    match services::blocking(move || principals.login(&body.email, &body.password)).await {
        Ok(session) => (StatusCode::CREATED, Json(dto::session_to_json(&session))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// DELETE /sessions - end the session whose token authorized this request
pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    headers: HeaderMap,
) -> axum::response::Response {
    if let Some(token) = bearer_token(&headers) {
        services.principals.logout(token);
    }
    StatusCode::NO_CONTENT.into_response()
}
