use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use giftmarket_auth::{RequestContext, RoleTag, RouteDescriptor, Verb};
use giftmarket_core::{BusinessId, OfferId};
use giftmarket_marketplace::NewOffer;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context;

pub fn router() -> Router {
    Router::new()
        .route("/offers", get(list_offers).post(create_offer))
        .route("/offers/:id", get(get_offer).delete(withdraw_offer))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![
        (Verb::Get, "/offers", RouteDescriptor::new("offers.list").public()),
        (Verb::Get, "/offers/:id", RouteDescriptor::new("offers.get").public()),
        (
            Verb::Post,
            "/offers",
            RouteDescriptor::new("offers.create")
                .roles([RoleTag::BusinessAdmin, RoleTag::BusinessEmployee]),
        ),
        (
            Verb::Delete,
            "/offers/:id",
            RouteDescriptor::new("offers.withdraw").roles([RoleTag::BusinessAdmin]),
        ),
    ]
}

/// GET /offers?business_id= - offers currently on sale
pub async fn list_offers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::ListOffersQuery>,
) -> axum::response::Response {
    let business_id = match query.business_id.as_deref().map(errors::parse_id::<BusinessId>) {
        Some(Ok(id)) => Some(id),
        Some(Err(res)) => return res,
        None => None,
    };
    Json(dto::items(services.market.list_offers(business_id, Utc::now()))).into_response()
}

pub async fn get_offer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OfferId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match services.market.get_offer(id) {
        Ok(offer) => Json(offer).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /offers - publish for the caller's business
pub async fn create_offer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewOffer>,
) -> axum::response::Response {
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services.market.create_offer(&actor, body) {
        Ok(offer) => (StatusCode::CREATED, Json(offer)).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// DELETE /offers/:id - withdraw one of the caller's business's offers
pub async fn withdraw_offer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OfferId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let (actor, _) = match context::business_admin(&ctx) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.market.withdraw_offer(&actor, id) {
        Ok(offer) => Json(offer).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}
