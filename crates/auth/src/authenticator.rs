use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::Session;

/// Why a presented bearer token was rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("token is malformed")]
    Malformed,

    #[error("token is not recognised")]
    UnknownToken,

    #[error("session has expired")]
    Expired,

    #[error("account is suspended")]
    Suspended,
}

/// Validates an opaque bearer token against the principal store.
///
/// Called exactly once per request that presents a token. Implementations own
/// any timeout or cancellation policy; callers never retry.
#[async_trait]
pub trait TokenAuthenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<Session, AuthFailure>;
}

#[async_trait]
impl<A> TokenAuthenticator for Arc<A>
where
    A: TokenAuthenticator + ?Sized,
{
    async fn authenticate(&self, token: &str) -> Result<Session, AuthFailure> {
        (**self).authenticate(token).await
    }
}
