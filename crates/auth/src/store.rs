//! In-memory principal store: accounts, password hashes, role grants and
//! sessions.
//!
//! Stands in for the external identity service. Everything the authorization
//! pipeline needs from it goes through `TokenAuthenticator`.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use password_hash::{PasswordHash, SaltString};
use thiserror::Error;

use giftmarket_core::{DomainError, UserId};

use crate::session::validate_expiry;
use crate::{AuthFailure, Principal, RoleAssignment, RoleTag, Session, SessionToken, TokenAuthenticator};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrincipalStoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is suspended")]
    Suspended,

    #[error("credential backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone)]
struct Account {
    principal: Principal,
    password_hash: String,
    suspended: bool,
}

#[derive(Debug, Clone)]
struct SessionRecord {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    accounts: HashMap<UserId, Account>,
    by_email: HashMap<String, UserId>,
    sessions: HashMap<SessionToken, SessionRecord>,
}

/// In-memory principal store for dev/tests.
#[derive(Debug)]
pub struct InMemoryPrincipalStore {
    inner: RwLock<Inner>,
    session_ttl: Duration,
}

impl InMemoryPrincipalStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an individual user holding a single `user` role.
    pub fn register(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
    ) -> Result<Principal, PrincipalStoreError> {
        self.register_with_roles(
            email,
            display_name,
            password,
            vec![RoleAssignment::global(RoleTag::User)],
        )
    }

    /// Register an account with explicit role assignments (bootstrap, tests).
    pub fn register_with_roles(
        &self,
        email: &str,
        display_name: &str,
        password: &str,
        roles: Vec<RoleAssignment>,
    ) -> Result<Principal, PrincipalStoreError> {
        let email = normalize_email(email)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::validation("display name must not be empty").into());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }

        let principal = Principal::new(UserId::new(), display_name, email.clone(), roles)?;
        // Hash outside the lock: argon2 is deliberately slow.
        let password_hash = hash_password(password)?;

        let mut inner = self.write();
        if inner.by_email.contains_key(&email) {
            return Err(DomainError::conflict(format!("email '{email}' is already registered")).into());
        }
        inner.by_email.insert(email, principal.id());
        inner.accounts.insert(
            principal.id(),
            Account {
                principal: principal.clone(),
                password_hash,
                suspended: false,
            },
        );

        tracing::info!(user_id = %principal.id(), "account registered");
        Ok(principal)
    }

    /// Verify credentials and open a new session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> Result<Session, PrincipalStoreError> {
        self.login_at(email, password, Utc::now())
    }

    pub fn login_at(
        &self,
        email: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, PrincipalStoreError> {
        let email = normalize_email(email).map_err(|_| PrincipalStoreError::InvalidCredentials)?;
        let account = {
            let inner = self.read();
            inner
                .by_email
                .get(&email)
                .and_then(|id| inner.accounts.get(id))
                .cloned()
                .ok_or(PrincipalStoreError::InvalidCredentials)?
        };

        if !verify_password(&account.password_hash, password) {
            tracing::debug!(user_id = %account.principal.id(), "login rejected");
            return Err(PrincipalStoreError::InvalidCredentials);
        }
        if account.suspended {
            return Err(PrincipalStoreError::Suspended);
        }

        let token = SessionToken::generate().map_err(|e| PrincipalStoreError::Backend(e.to_string()))?;
        let expires_at = now + self.session_ttl;
        self.write().sessions.insert(
            token.clone(),
            SessionRecord {
                user_id: account.principal.id(),
                expires_at,
            },
        );

        tracing::info!(user_id = %account.principal.id(), %expires_at, "session opened");
        Ok(Session {
            principal: account.principal,
            token,
            expires_at,
        })
    }

    /// Close a session. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        if self.write().sessions.remove(&SessionToken::new(token)).is_some() {
            tracing::info!("session closed");
        }
    }

    pub fn principal(&self, user_id: UserId) -> Option<Principal> {
        self.read().accounts.get(&user_id).map(|a| a.principal.clone())
    }

    pub fn find_by_email(&self, email: &str) -> Option<Principal> {
        let email = normalize_email(email).ok()?;
        let inner = self.read();
        let id = inner.by_email.get(&email)?;
        inner.accounts.get(id).map(|a| a.principal.clone())
    }

    /// Grant an additional role assignment. Identical grants are no-ops.
    pub fn grant(
        &self,
        user_id: UserId,
        assignment: RoleAssignment,
    ) -> Result<Principal, PrincipalStoreError> {
        let mut inner = self.write();
        let account = inner
            .accounts
            .get_mut(&user_id)
            .ok_or(DomainError::not_found("user"))?;
        if account.principal.grant(assignment) {
            tracing::info!(%user_id, role = %assignment.role, business_id = ?assignment.business_id, "role granted");
        }
        Ok(account.principal.clone())
    }

    /// Disable an account. Existing sessions then fail authentication.
    pub fn suspend(&self, user_id: UserId) -> Result<(), PrincipalStoreError> {
        let mut inner = self.write();
        let account = inner
            .accounts
            .get_mut(&user_id)
            .ok_or(DomainError::not_found("user"))?;
        account.suspended = true;
        tracing::warn!(%user_id, "account suspended");
        Ok(())
    }

    /// Drop sessions that expired at or before `now`. Returns how many were removed.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut inner = self.write();
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.expires_at > now);
        before - inner.sessions.len()
    }

    /// Authenticate against an explicit clock.
    pub fn authenticate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Session, AuthFailure> {
        if !SessionToken::is_well_formed(token) {
            return Err(AuthFailure::Malformed);
        }
        let token = SessionToken::new(token);

        let inner = self.read();
        let record = inner.sessions.get(&token).ok_or(AuthFailure::UnknownToken)?;
        validate_expiry(record.expires_at, now)?;

        let account = inner
            .accounts
            .get(&record.user_id)
            .ok_or(AuthFailure::UnknownToken)?;
        if account.suspended {
            return Err(AuthFailure::Suspended);
        }

        Ok(Session {
            principal: account.principal.clone(),
            token,
            expires_at: record.expires_at,
        })
    }
}

#[async_trait]
impl TokenAuthenticator for InMemoryPrincipalStore {
    async fn authenticate(&self, token: &str) -> Result<Session, AuthFailure> {
        self.authenticate_at(token, Utc::now())
    }
}

fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(DomainError::validation("email address is malformed")),
    }
}

fn hash_password(password: &str) -> Result<String, PrincipalStoreError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| PrincipalStoreError::Backend(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PrincipalStoreError::Backend(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PrincipalStoreError::Backend(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
