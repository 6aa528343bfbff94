//! Handler-side view of the authorized caller.

use axum::response::Response;

use giftmarket_auth::{RequestContext, RoleTag};
use giftmarket_core::{BusinessId, DomainError};
use giftmarket_marketplace::Actor;

use crate::app::errors;

/// Build the marketplace actor for an authenticated request.
pub fn actor(ctx: &RequestContext) -> Result<Actor, Response> {
    let principal = ctx
        .authenticated()
        .map_err(errors::pipeline_error_to_response)?;
    let business_id = ctx
        .business_id()
        .map(str::parse::<BusinessId>)
        .transpose()
        .map_err(errors::domain_error_to_response)?;

    Ok(Actor {
        user_id: principal.id(),
        display_name: principal.display_name().to_string(),
        business_id,
        platform_staff: principal.has_any_role(&[RoleTag::PlatformEmployee]),
    })
}

/// Actor for public routes: `None` for anonymous callers.
pub fn optional_actor(ctx: &RequestContext) -> Result<Option<Actor>, Response> {
    if ctx.principal().is_none() {
        return Ok(None);
    }
    actor(ctx).map(Some)
}

/// Actor whose business scope is one they administer (not merely staff).
pub fn business_admin(ctx: &RequestContext) -> Result<(Actor, BusinessId), Response> {
    let actor = actor(ctx)?;
    let scope = actor
        .business_scope()
        .map_err(errors::domain_error_to_response)?;
    let is_admin = ctx
        .principal()
        .is_some_and(|p| p.has_role_in(RoleTag::BusinessAdmin, scope));
    if !is_admin {
        return Err(errors::domain_error_to_response(DomainError::forbidden(
            "business admin role required for this business",
        )));
    }
    Ok((actor, scope))
}
