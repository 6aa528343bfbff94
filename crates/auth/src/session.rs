use chrono::{DateTime, Duration, Utc};

use crate::{AuthFailure, Principal};

/// Opaque bearer credential.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Generate a fresh random token (32 random bytes, lowercase hex).
    pub fn generate() -> Result<Self, getrandom::Error> {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes)?;
        Ok(Self(bytes.iter().map(|b| format!("{b:02x}")).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `raw` has the shape of a token issued by `generate`.
    pub fn is_well_formed(raw: &str) -> bool {
        raw.len() == 64 && raw.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    }
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Result of a successful authentication: who, with which token, until when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal: Principal,
    pub token: SessionToken,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Split off the principal, dropping the raw token and expiration.
    pub fn into_principal(self) -> (Principal, DateTime<Utc>) {
        let Session {
            principal,
            token: _,
            expires_at,
        } = self;
        (principal, expires_at)
    }
}

/// Deterministically check a session's expiration against `now`.
pub fn validate_expiry(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AuthFailure> {
    if now >= expires_at {
        return Err(AuthFailure::Expired);
    }
    Ok(())
}

/// Remaining session lifetime, clamped at zero.
pub fn remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).max(Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_well_formed_and_distinct() {
        let a = SessionToken::generate().unwrap();
        let b = SessionToken::generate().unwrap();
        assert!(SessionToken::is_well_formed(a.as_str()));
        assert_ne!(a, b);
    }

    #[test]
    fn debug_does_not_leak_the_token() {
        let token = SessionToken::new("secret-value");
        assert!(!format!("{token:?}").contains("secret-value"));
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let t = Utc::now();
        assert_eq!(validate_expiry(t, t), Err(AuthFailure::Expired));
        assert_eq!(validate_expiry(t + Duration::milliseconds(1), t), Ok(()));
    }

    #[test]
    fn remaining_never_goes_negative() {
        let t = Utc::now();
        assert_eq!(remaining(t, t + Duration::seconds(5)), Duration::zero());
        assert_eq!(
            remaining(t + Duration::milliseconds(5000), t + Duration::milliseconds(1000))
                .num_milliseconds(),
            4000
        );
    }
}
