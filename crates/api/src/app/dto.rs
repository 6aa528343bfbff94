use serde::Deserialize;
use serde_json::{Value, json};

use giftmarket_auth::{Principal, RequestContext, Session};
use giftmarket_marketplace::Recipient;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddEmployeeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOffersQuery {
    pub business_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GiftRequest {
    pub recipient: Recipient,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    pub amount_cents: u64,
}

// -------------------------
// Response mapping
// -------------------------

pub fn session_to_json(s: &Session) -> Value {
    json!({
        "token": s.token.as_str(),
        "expires_at": s.expires_at,
        "user": s.principal,
    })
}

pub fn whoami_to_json(ctx: &RequestContext, principal: &Principal) -> Value {
    json!({
        "user": principal,
        "business_id": ctx.business_id(),
        "session_expires_in_ms": ctx.session_remaining_ms(),
    })
}

pub fn items<T: serde::Serialize>(items: Vec<T>) -> Value {
    json!({ "items": items })
}

