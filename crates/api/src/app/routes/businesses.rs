use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use giftmarket_auth::{RequestContext, RoleAssignment, RoleTag, RouteDescriptor, Verb};
use giftmarket_core::{BusinessId, DomainError};
use giftmarket_marketplace::NewBusiness;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context;

pub fn router() -> Router {
    Router::new()
        .route("/businesses", get(list_businesses).post(create_business))
        .route("/businesses/:id", get(get_business))
        .route("/businesses/:id/employees", post(add_employee))
}

pub fn access() -> Vec<(Verb, &'static str, RouteDescriptor)> {
    vec![
        (Verb::Get, "/businesses", RouteDescriptor::new("businesses.list").public()),
        (Verb::Get, "/businesses/:id", RouteDescriptor::new("businesses.get").public()),
        (
            Verb::Post,
            "/businesses",
            RouteDescriptor::new("businesses.create").roles([RoleTag::User]),
        ),
        (
            Verb::Post,
            "/businesses/:id/employees",
            RouteDescriptor::new("businesses.add_employee").roles([RoleTag::BusinessAdmin]),
        ),
    ]
}

pub async fn list_businesses(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    Json(dto::items(services.market.list_businesses())).into_response()
}

/// GET /businesses/:id - approved businesses, plus the caller's own while pending
pub async fn get_business(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: BusinessId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let viewer = match context::optional_actor(&ctx) {
        Ok(v) => v,
        Err(res) => return res,
    };

    match services.market.get_business(id, viewer.as_ref()) {
        Ok(business) => Json(business).into_response(),
        Err(e) => errors::marketplace_error_to_response(e),
    }
}

/// POST /businesses - register a business; the creator becomes its admin
pub async fn create_business(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewBusiness>,
) -> axum::response::Response {
    let actor = match context::actor(&ctx) {
        Ok(a) => a,
        Err(res) => return res,
    };

    let business = match services.market.create_business(actor.user_id, body, Utc::now()) {
        Ok(b) => b,
        Err(e) => return errors::marketplace_error_to_response(e),
    };
    if let Err(e) = services.principals.grant(
        actor.user_id,
        RoleAssignment::scoped(RoleTag::BusinessAdmin, business.id),
    ) {
        return errors::store_error_to_response(e);
    }

    (StatusCode::CREATED, Json(business)).into_response()
}

/// POST /businesses/:id/employees - make an existing user staff of this business
pub async fn add_employee(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::AddEmployeeRequest>,
) -> axum::response::Response {
    let id: BusinessId = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let (actor, scope) = match context::business_admin(&ctx) {
        Ok(v) => v,
        Err(res) => return res,
    };
    if scope != id {
        return errors::domain_error_to_response(DomainError::forbidden(
            "cannot manage staff of another business",
        ));
    }
    if let Err(e) = services.market.get_business(id, Some(&actor)) {
        return errors::marketplace_error_to_response(e);
    }

    let Some(employee) = services.principals.find_by_email(&body.email) else {
        return errors::domain_error_to_response(DomainError::not_found("user"));
    };
    match services
        .principals
        .grant(employee.id(), RoleAssignment::scoped(RoleTag::BusinessEmployee, id))
    {
        Ok(updated) => Json(updated).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
