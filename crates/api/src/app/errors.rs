use axum::http::{HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;

use giftmarket_auth::{PipelineError, PrincipalStoreError};
use giftmarket_core::DomainError;
use giftmarket_marketplace::MarketplaceError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Missing token and rejected token are both 401, with distinct codes.
pub fn pipeline_error_to_response(err: PipelineError) -> axum::response::Response {
    let mut res = match &err {
        PipelineError::Authentication(_) => {
            json_error(StatusCode::UNAUTHORIZED, "authentication_failed", err.to_string())
        }
        PipelineError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", err.to_string()),
        PipelineError::Forbidden { .. } => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
    };
    if res.status() == StatusCode::UNAUTHORIZED {
        res.headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
        DomainError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", message),
    }
}

pub fn marketplace_error_to_response(err: MarketplaceError) -> axum::response::Response {
    match err {
        MarketplaceError::Domain(e) => domain_error_to_response(e),
        MarketplaceError::Notify(e) => {
            json_error(StatusCode::BAD_GATEWAY, "notification_failed", e.to_string())
        }
    }
}

pub fn store_error_to_response(err: PrincipalStoreError) -> axum::response::Response {
    match err {
        PrincipalStoreError::Domain(e) => domain_error_to_response(e),
        PrincipalStoreError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", "invalid email or password")
        }
        PrincipalStoreError::Suspended => {
            json_error(StatusCode::FORBIDDEN, "account_suspended", "account is suspended")
        }
        PrincipalStoreError::Backend(msg) => {
            tracing::error!(error = %msg, "principal store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

/// Parse a path segment into a typed id, or a 400 response.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftmarket_auth::{AuthFailure, RoleTag};

    #[test]
    fn missing_and_rejected_tokens_share_status_but_not_code() {
        let a = pipeline_error_to_response(PipelineError::Unauthorized);
        let b = pipeline_error_to_response(PipelineError::Authentication(AuthFailure::Expired));
        assert_eq!(a.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(b.status(), StatusCode::UNAUTHORIZED);
        assert!(a.headers().contains_key(header::WWW_AUTHENTICATE));

        let c = pipeline_error_to_response(PipelineError::Forbidden {
            required: vec![RoleTag::PlatformEmployee],
        });
        assert_eq!(c.status(), StatusCode::FORBIDDEN);
        assert!(!c.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::invariant("x"), StatusCode::UNPROCESSABLE_ENTITY),
            (DomainError::not_found("offer"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::forbidden("x"), StatusCode::FORBIDDEN),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }
}
