//! Platform moderation: business review, offer takedowns, account suspension.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use giftmarket_auth::{RequestContext, RoleTag, RouteDescriptor, Verb};
use giftmarket_core::{BusinessId, DomainError, OfferId, UserId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context;

pub fn router() -> Router {
    Router::new()
        .route("/admin/businesses", get(list_businesses))
        .route("/admin/businesses/:id/approve", post(approve_business))
        .route("/admin/businesses/:id/suspend", post(suspend_business))
        .route("/admin/offers/:id", delete(remove_offer))
        .route("/admin/users/:id/suspend", post(suspend_user))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    let staff = |op: &'static str| RouteDescriptor::new(op).roles([RoleTag::PlatformEmployee]);
    vec![
        (Verb::Get, "/admin/businesses", staff("admin.businesses.list")),
        (Verb::Post, "/admin/businesses/:id/approve", staff("admin.businesses.approve")),
        (Verb::Post, "/admin/businesses/:id/suspend", staff("admin.businesses.suspend")),
        (Verb::Delete, "/admin/offers/:id", staff("admin.offers.remove")),
        (Verb::Post, "/admin/users/:id/suspend", staff("admin.users.suspend")),
    ]
}

/// GET /admin/businesses - every business, pending and suspended included
pub async fn list_businesses(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    Json(dto::items(services.market.list_all_businesses())).into_response()
}

pub async fn approve_business(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BusinessId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.market.approve_business(id) {
        Ok(business) => Json(business).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

pub async fn suspend_business(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BusinessId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.market.suspend_business(id) {
        Ok(business) => Json(business).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// DELETE /admin/offers/:id - takedown, regardless of which business owns it
pub async fn remove_offer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OfferId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.market.remove_offer(id) {
        Ok(offer) => Json(offer).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /admin/users/:id/suspend - existing sessions stop authenticating
pub async fn suspend_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: UserId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    if actor.user_id == id {
        return errors::domain_error_to_response(DomainError::validation("cannot suspend your own account"));
    }
    match services.principals.suspend(id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
