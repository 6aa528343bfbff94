//! Authorization middleware: runs the pipeline for every matched route and
//! hands the resulting `RequestContext` to the handler as an extension.

use axum::{
    extract::{MatchedPath, State},
    http::{HeaderMap, HeaderValue, Method, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use giftmarket_auth::{AuthorizationPipeline, Verb};

use crate::app::errors;

/// Milliseconds until the caller's session expires.
pub const SESSION_EXPIRES_IN_HEADER: &str = "x-session-expires-in";

#[derive(Clone, Debug)]
pub struct AuthState {
    pub pipeline: AuthorizationPipeline,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    // axum answers HEAD through GET routes, so HEAD gets the GET rules.
    let method = if req.method() == Method::HEAD {
        "GET"
    } else {
        req.method().as_str()
    };
    let Ok(verb) = method.parse::<Verb>() else {
        return errors::json_error(
            axum::http::StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed",
        );
    };
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let outcome = state
        .pipeline
        .authorize(verb, &path, bearer_token(req.headers()), Utc::now())
        .await;

    let ctx = match outcome {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::info!(%verb, path = %path, error = %e, "request denied");
            return errors::pipeline_error_to_response(e);
        }
    };

    let remaining_ms = ctx.session_remaining_ms();
    tracing::debug!(
        operation = ctx.operation(),
        authenticated = ctx.principal().is_some(),
        "request authorized"
    );
    req.extensions_mut().insert(ctx);

    let mut res = next.run(req).await;
    if let Some(ms) = remaining_ms {
        res.headers_mut()
            .insert(SESSION_EXPIRES_IN_HEADER, HeaderValue::from(ms));
    }
    res
}

/// The bearer token from `Authorization`, if one is well-formed.
///
/// Anything else (missing header, other scheme, empty token) counts as no
/// token at all.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let (scheme, token) = header.to_str().ok()?.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
