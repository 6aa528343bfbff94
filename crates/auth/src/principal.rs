use serde::{Deserialize, Serialize};

use giftmarket_core::{BusinessId, DomainError, UserId};

use crate::{RoleAssignment, RoleTag};

/// Identity resolved from a bearer token.
///
/// Built fresh for every request by the authenticator. It carries no session
/// token and no expiration: those stay on `Session` and are dropped before a
/// handler can see the principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrincipalRecord")]
pub struct Principal {
    id: UserId,
    display_name: String,
    email: String,
    roles: Vec<RoleAssignment>,
}

/// Wire shape of a principal; turned into one only through `Principal::new`.
#[derive(Deserialize)]
struct PrincipalRecord {
    id: UserId,
    display_name: String,
    email: String,
    roles: Vec<RoleAssignment>,
}

impl TryFrom<PrincipalRecord> for Principal {
    type Error = DomainError;

    fn try_from(r: PrincipalRecord) -> Result<Self, Self::Error> {
        Principal::new(r.id, r.display_name, r.email, r.roles)
    }
}

impl Principal {
    /// Build a principal.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvariantViolation` if `roles` is empty: an
    /// authenticated principal always holds at least one assignment.
    pub fn new(
        id: UserId,
        display_name: impl Into<String>,
        email: impl Into<String>,
        roles: Vec<RoleAssignment>,
    ) -> Result<Self, DomainError> {
        if roles.is_empty() {
            return Err(DomainError::invariant("principal must hold at least one role"));
        }
        Ok(Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            roles,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Role assignments in stored order.
    pub fn roles(&self) -> &[RoleAssignment] {
        &self.roles
    }

    /// Whether any assignment carries one of `roles` (logical OR).
    pub fn has_any_role(&self, roles: &[RoleTag]) -> bool {
        self.roles.iter().any(|a| roles.contains(&a.role))
    }

    /// Whether the principal holds `role` scoped to `business_id`.
    pub fn has_role_in(&self, role: RoleTag, business_id: BusinessId) -> bool {
        self.roles
            .iter()
            .any(|a| a.role == role && a.business_id == Some(business_id))
    }

    /// Whether the principal operates `business_id` as employee or admin.
    pub fn is_staff_of(&self, business_id: BusinessId) -> bool {
        self.roles
            .iter()
            .any(|a| a.role.is_business_staff() && a.business_id == Some(business_id))
    }

    /// Append an assignment unless an identical one is already held.
    ///
    /// Returns `true` if the assignment was added.
    pub fn grant(&mut self, assignment: RoleAssignment) -> bool {
        if self.roles.contains(&assignment) {
            return false;
        }
        self.roles.push(assignment);
        true
    }
}
