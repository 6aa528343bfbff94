//! Per-request authorization pipeline.
//!
//! Steps run in strict order and the first failure ends the request:
//!
//! 1. tag the request with the route's operation name
//! 2. authenticate the bearer token, or admit anonymous callers on public routes
//! 3. record remaining session lifetime and drop the raw token
//! 4. role check (OR over the route's roles)
//! 5. business scope derivation (first scoped assignment wins)
//!
//! Steps 4 and 5 are plain functions in [`POST_AUTH_CHECKS`]. Only step 2
//! suspends. Nothing here mutates the principal store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::Instrument;

use crate::session::remaining;
use crate::{AuthFailure, Principal, RoleTag, RouteDescriptor, RouteTable, Session, TokenAuthenticator, Verb};

/// Terminal outcome of a rejected request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A token was presented and the authenticator rejected it.
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthFailure),

    /// No token on a route that is not public.
    #[error("anonymous access not allowed")]
    Unauthorized,

    /// Authenticated, but none of the principal's roles is allowed here.
    #[error("forbidden: requires one of [{}]", join_roles(.required))]
    Forbidden { required: Vec<RoleTag> },
}

fn join_roles(roles: &[RoleTag]) -> String {
    roles.iter().map(RoleTag::as_str).collect::<Vec<_>>().join(", ")
}

/// Everything a handler learns about the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    operation: &'static str,
    principal: Option<Principal>,
    business_id: Option<String>,
    session_remaining: Option<Duration>,
}

impl RequestContext {
    /// Step 1: a context tagged with the target operation and nothing else.
    pub fn tagged(operation: &'static str) -> Self {
        Self {
            operation,
            principal: None,
            business_id: None,
            session_remaining: None,
        }
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The principal, for handlers behind non-public routes.
    pub fn authenticated(&self) -> Result<&Principal, PipelineError> {
        self.principal.as_ref().ok_or(PipelineError::Unauthorized)
    }

    /// Canonical string form of the business the request acts for.
    pub fn business_id(&self) -> Option<&str> {
        self.business_id.as_deref()
    }

    pub fn session_remaining_ms(&self) -> Option<i64> {
        self.session_remaining.map(|d| d.num_milliseconds())
    }
}

/// A check run after authentication, only when a principal is attached.
pub type Check = fn(&RouteDescriptor, &mut RequestContext) -> Result<(), PipelineError>;

/// Post-authentication checks, in execution order.
pub const POST_AUTH_CHECKS: &[(&str, Check)] = &[
    ("roles", check_roles),
    ("business_scope", derive_business_scope),
];

/// Step 2: resolve the caller.
///
/// `Ok(None)` means anonymous access on a public route. A presented token is
/// always checked, even on public routes.
pub async fn authenticate<A>(
    authenticator: &A,
    route: &RouteDescriptor,
    bearer: Option<&str>,
) -> Result<Option<Session>, PipelineError>
where
    A: TokenAuthenticator + ?Sized,
{
    match bearer {
        Some(token) => {
            let session = authenticator.authenticate(token).await.map_err(|e| {
                tracing::debug!(error = %e, "bearer token rejected");
                PipelineError::Authentication(e)
            })?;
            Ok(Some(session))
        }
        None if route.is_public() => Ok(None),
        None => Err(PipelineError::Unauthorized),
    }
}

/// Step 3: attach the principal, record remaining lifetime, drop the token.
pub fn attach_session(ctx: &mut RequestContext, session: Session, now: DateTime<Utc>) {
    let (principal, expires_at) = session.into_principal();
    ctx.session_remaining = Some(remaining(expires_at, now));
    ctx.principal = Some(principal);
}

/// Step 4: OR-of-set role membership. Empty role lists admit any principal.
pub fn check_roles(route: &RouteDescriptor, ctx: &mut RequestContext) -> Result<(), PipelineError> {
    let required = route.required_roles();
    if required.is_empty() {
        return Ok(());
    }
    match &ctx.principal {
        Some(p) if p.has_any_role(required) => Ok(()),
        _ => Err(PipelineError::Forbidden {
            required: required.to_vec(),
        }),
    }
}

/// Step 5: the first assignment carrying a business id sets the scope.
pub fn derive_business_scope(
    _route: &RouteDescriptor,
    ctx: &mut RequestContext,
) -> Result<(), PipelineError> {
    ctx.business_id = ctx
        .principal
        .as_ref()
        .and_then(|p| p.roles().iter().find_map(|a| a.business_id))
        .map(|id| id.to_string());
    Ok(())
}

/// Run every step for one request against an already-resolved route.
pub async fn run<A>(
    authenticator: &A,
    route: &RouteDescriptor,
    bearer: Option<&str>,
    now: DateTime<Utc>,
) -> Result<RequestContext, PipelineError>
where
    A: TokenAuthenticator + ?Sized,
{
    let mut ctx = RequestContext::tagged(route.operation());

    let Some(session) = authenticate(authenticator, route, bearer).await? else {
        return Ok(ctx);
    };
    attach_session(&mut ctx, session, now);

    for (name, check) in POST_AUTH_CHECKS {
        if let Err(e) = check(route, &mut ctx) {
            tracing::debug!(check = name, error = %e, "request rejected");
            return Err(e);
        }
    }

    Ok(ctx)
}

/// Route table + authenticator, shared by every request.
#[derive(Clone)]
pub struct AuthorizationPipeline {
    authenticator: Arc<dyn TokenAuthenticator>,
    routes: Arc<RouteTable>,
}

impl AuthorizationPipeline {
    pub fn new(authenticator: Arc<dyn TokenAuthenticator>, routes: Arc<RouteTable>) -> Self {
        Self {
            authenticator,
            routes,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Resolve the route's descriptor and run the pipeline for it.
    pub async fn authorize(
        &self,
        verb: Verb,
        path_template: &str,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<RequestContext, PipelineError> {
        let route = self.routes.resolve(verb, path_template);
        let span = tracing::info_span!("authorize", operation = route.operation());
        run(self.authenticator.as_ref(), route, bearer, now)
            .instrument(span)
            .await
    }
}

impl core::fmt::Debug for AuthorizationPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthorizationPipeline")
            .field("routes", &self.routes.len())
            .finish_non_exhaustive()
    }
}
