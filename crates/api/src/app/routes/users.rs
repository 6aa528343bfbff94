use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use giftmarket_auth::{RequestContext, RouteDescriptor, Verb};

use crate::app::services::{self, AppServices};
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/users", post(register))
        .route("/me", get(me))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![
        (Verb::Post, "/users", RouteDescriptor::new("users.register").public()),
        (Verb::Get, "/me", RouteDescriptor::new("users.me")),
    ]
}

/// POST /users - self-registration as an individual user
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    let principals = services.principals.clone();
    let registered = services::blocking(move || {
        principals.register(&body.email, &body.display_name, &body.password)
    })
    .await;

    match registered {
        Ok(principal) => (StatusCode::CREATED, Json(principal)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /me - the caller as the pipeline resolved it
pub async fn me(Extension(ctx): Extension<RequestContext>) -> axum::response::Response {
    match ctx.authenticated() {
        Ok(principal) => Json(dto::whoami_to_json(&ctx, principal)).into_response(),
        Err(e) => errors::pipeline_error_to_response(e),
    }
}
