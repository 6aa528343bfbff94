use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use giftmarket_auth::{InMemoryPrincipalStore, PrincipalStoreError, RoleAssignment, RoleTag};
use giftmarket_marketplace::{Marketplace, Notifier};

use crate::config::ApiConfig;

/// Everything handlers call into.
#[derive(Debug)]
pub struct AppServices {
    pub principals: Arc<InMemoryPrincipalStore>,
    pub market: Marketplace,
}

pub fn build_services(
    config: &ApiConfig,
    notifier: Arc<dyn Notifier>,
) -> Result<AppServices, PrincipalStoreError> {
    let ttl = chrono::Duration::from_std(config.session_ttl)
        .map_err(|e| PrincipalStoreError::Backend(format!("session ttl out of range: {e}")))?;
    let principals = Arc::new(InMemoryPrincipalStore::new(ttl));

    if let Some(admin) = &config.bootstrap_admin {
        let principal = principals.register_with_roles(
            &admin.email,
            "Platform Admin",
            &admin.password,
            vec![RoleAssignment::global(RoleTag::PlatformEmployee)],
        )?;
        tracing::info!(user_id = %principal.id(), "bootstrap platform admin created");
    }

    Ok(AppServices {
        principals,
        market: Marketplace::new(notifier),
    })
}

/// Periodically drop expired sessions from the principal store.
pub fn spawn_session_purger(services: Arc<AppServices>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = services.principals.purge_expired(Utc::now());
            if purged > 0 {
                tracing::debug!(purged, "expired sessions purged");
            }
        }
    })
}

/// Run a blocking principal-store call (argon2 hashing) off the async workers.
pub async fn blocking<T, F>(f: F) -> Result<T, PrincipalStoreError>
where
    F: FnOnce() -> Result<T, PrincipalStoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PrincipalStoreError::Backend(format!("worker failed: {e}")))?
}
