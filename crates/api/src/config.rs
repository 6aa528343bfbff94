//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_TTL_SECS: u64 = 3600;
const DEFAULT_PURGE_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together")]
    PartialBootstrapAdmin,
}

/// Platform employee account created at startup, so moderation endpoints are
/// reachable on a fresh in-memory store.
#[derive(Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    pub session_purge_interval: Duration,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            session_purge_interval: Duration::from_secs(DEFAULT_PURGE_INTERVAL_SECS),
            bootstrap_admin: None,
        }
    }
}

impl ApiConfig {
    /// Read `BIND_ADDR`, `SESSION_TTL_SECS`, `SESSION_PURGE_INTERVAL_SECS`,
    /// `BOOTSTRAP_ADMIN_EMAIL` and `BOOTSTRAP_ADMIN_PASSWORD`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "BIND_ADDR",
            value: bind_raw.clone(),
            expected: "a socket address like 0.0.0.0:8080",
        })?;

        let session_ttl = secs(&lookup, "SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;
        let session_purge_interval =
            secs(&lookup, "SESSION_PURGE_INTERVAL_SECS", DEFAULT_PURGE_INTERVAL_SECS)?;

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_EMAIL").filter(|v| !v.trim().is_empty()),
            lookup("BOOTSTRAP_ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        ) {
            (Some(email), Some(password)) => Some(BootstrapAdmin { email, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialBootstrapAdmin),
        };

        Ok(Self {
            bind_addr,
            session_ttl,
            session_purge_interval,
            bootstrap_admin,
        })
    }
}

fn secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(Duration::from_secs(n)),
        _ => Err(ConfigError::Invalid {
            name,
            value: raw,
            expected: "a positive number of seconds",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(ApiConfig::from_lookup(lookup(&[])).unwrap(), ApiConfig::default());
    }

    #[test]
    fn values_are_parsed() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SESSION_TTL_SECS", "120"),
            ("BOOTSTRAP_ADMIN_EMAIL", "ops@example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "s3cret-pass"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.session_ttl, Duration::from_secs(120));
        assert_eq!(cfg.bootstrap_admin.unwrap().email, "ops@example.com");
    }

    #[test]
    fn bad_values_are_reported() {
        let err = ApiConfig::from_lookup(lookup(&[("SESSION_TTL_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SESSION_TTL_SECS", .. }));

        let err = ApiConfig::from_lookup(lookup(&[("BIND_ADDR", "nope")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "BIND_ADDR", .. }));
    }

    #[test]
    fn bootstrap_admin_needs_both_halves() {
        let err = ApiConfig::from_lookup(lookup(&[("BOOTSTRAP_ADMIN_EMAIL", "ops@example.com")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::PartialBootstrapAdmin);
    }

    #[test]
    fn debug_redacts_the_bootstrap_password() {
        let admin = BootstrapAdmin {
            email: "ops@example.com".to_string(),
            password: "hunter22".to_string(),
        };
        assert!(!format!("{admin:?}").contains("hunter22"));
    }
}
