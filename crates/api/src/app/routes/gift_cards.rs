use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use giftmarket_auth::{RequestContext, RoleTag, RouteDescriptor, Verb};
use giftmarket_core::{GiftCardId, OfferId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context;

const BUYERS: [RoleTag; 2] = [RoleTag::User, RoleTag::Client];
const STAFF: [RoleTag; 2] = [RoleTag::BusinessAdmin, RoleTag::BusinessEmployee];

pub fn router() -> Router {
    Router::new()
        .route("/offers/:id/purchase", post(purchase))
        .route("/gift-cards", get(list_mine))
        .route("/gift-cards/claim", post(claim))
        .route("/gift-cards/:id", get(get_card))
        .route("/gift-cards/:id/gift", post(gift))
        .route("/gift-cards/:id/redeem", post(redeem))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![
        (
            Verb::Post,
            "/offers/:id/purchase",
            RouteDescriptor::new("gift_cards.purchase").roles(BUYERS),
        ),
        (Verb::Get, "/gift-cards", RouteDescriptor::new("gift_cards.list_mine").roles(BUYERS)),
        (Verb::Get, "/gift-cards/:id", RouteDescriptor::new("gift_cards.get")),
        (Verb::Post, "/gift-cards/:id/gift", RouteDescriptor::new("gift_cards.gift").roles(BUYERS)),
        (Verb::Post, "/gift-cards/claim", RouteDescriptor::new("gift_cards.claim").roles(BUYERS)),
        (
            Verb::Post,
            "/gift-cards/:id/redeem",
            RouteDescriptor::new("gift_cards.redeem").roles(STAFF),
        ),
    ]
}

/// POST /offers/:id/purchase
pub async fn purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(offer_id): Path<String>,
) -> axum::response::Response {
    let offer_id: OfferId = match errors::parse_id(&offer_id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services.market.purchase(&actor, offer_id, Utc::now()) {
        Ok(card) => (StatusCode::CREATED, Json(card)).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

pub async fn list_mine(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    Json(dto::items(services.market.cards_owned_by(actor.user_id))).into_response()
}

pub async fn get_card(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: GiftCardId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services.market.get_card(&actor, id) {
        Ok(card) => Json(card).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /gift-cards/:id/gift - hand the card to someone else via a claim code
pub async fn gift(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::GiftRequest>,
) -> axum::response::Response {
    let id: GiftCardId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services
        .market
        .gift(&actor, id, body.recipient, body.message, Utc::now())
    {
        Ok(card) => Json(card).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /gift-cards/claim
pub async fn claim(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::ClaimRequest>,
) -> axum::response::Response {
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services.market.claim(&actor, &body.code) {
        Ok(card) => Json(card).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /gift-cards/:id/redeem - staff of the issuing business take value off a card
pub async fn redeem(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::RedeemRequest>,
) -> axum::response::Response {
    let id: GiftCardId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };
    match services.market.redeem(&actor, id, body.amount_cents, Utc::now()) {
        Ok(card) => Json(card).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}
