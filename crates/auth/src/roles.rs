use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use giftmarket_core::BusinessId;

/// Role tag used for RBAC.
///
/// Closed set: a misspelled role in a route declaration is a compile error, and
/// an unknown tag on the wire fails to deserialize instead of silently matching
/// nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    /// Individual marketplace user (buys, gifts and claims cards).
    User,
    /// Staff member of a business (publishes offers, redeems cards).
    BusinessEmployee,
    /// Administrator of a business (everything an employee can, plus staff).
    BusinessAdmin,
    /// Platform operator (moderates businesses, offers and users).
    PlatformEmployee,
    /// Machine client acting on behalf of a partner integration.
    Client,
}

impl RoleTag {
    pub const ALL: [RoleTag; 5] = [
        RoleTag::User,
        RoleTag::BusinessEmployee,
        RoleTag::BusinessAdmin,
        RoleTag::PlatformEmployee,
        RoleTag::Client,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleTag::User => "user",
            RoleTag::BusinessEmployee => "business_employee",
            RoleTag::BusinessAdmin => "business_admin",
            RoleTag::PlatformEmployee => "platform_employee",
            RoleTag::Client => "client",
        }
    }

    /// Roles that operate a business and can act within its scope.
    pub fn is_business_staff(&self) -> bool {
        matches!(self, RoleTag::BusinessEmployee | RoleTag::BusinessAdmin)
    }
}

impl core::fmt::Display for RoleTag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role tag '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for RoleTag {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RoleTag::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A role tag, optionally scoped to one business.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: RoleTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_id: Option<BusinessId>,
}

impl RoleAssignment {
    /// An assignment not tied to any business.
    pub fn global(role: RoleTag) -> Self {
        Self {
            role,
            business_id: None,
        }
    }

    pub fn scoped(role: RoleTag, business_id: BusinessId) -> Self {
        Self {
            role,
            business_id: Some(business_id),
        }
    }
}
