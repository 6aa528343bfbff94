use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use giftmarket_core::{BusinessId, DomainError, DomainResult, Entity, UserId};

/// Moderation lifecycle of a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessStatus {
    /// Awaiting review by a platform employee; not publicly listed.
    Pending,
    Approved,
    /// Taken down by moderation; its offers cannot be bought.
    Suspended,
}

/// Input for registering a business.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewBusiness {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
}

impl NewBusiness {
    fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("business name must not be empty"));
        }
        if self.address.trim().is_empty() {
            return Err(DomainError::validation("business address must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: String,
    pub description: String,
    pub address: String,
    pub owner: UserId,
    pub status: BusinessStatus,
    pub created_at: DateTime<Utc>,
}

impl Business {
    /// Register a business; it starts out pending review.
    pub fn register(owner: UserId, input: NewBusiness, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id: BusinessId::new(),
            name: input.name.trim().to_string(),
            description: input.description.trim().to_string(),
            address: input.address.trim().to_string(),
            owner,
            status: BusinessStatus::Pending,
            created_at: now,
        })
    }

    pub fn is_approved(&self) -> bool {
        self.status == BusinessStatus::Approved
    }

    /// Approve a pending or suspended business. Approving twice is a no-op.
    pub fn approve(&mut self) {
        self.status = BusinessStatus::Approved;
    }

    pub fn suspend(&mut self) -> DomainResult<()> {
        if self.status == BusinessStatus::Suspended {
            return Err(DomainError::invariant("business is already suspended"));
        }
        self.status = BusinessStatus::Suspended;
        Ok(())
    }
}

impl Entity for Business {
    type Id = BusinessId;
    const KIND: &'static str = "business";

    fn id(&self) -> BusinessId {
        self.id
    }
}
