use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use giftmarket_core::{BusinessId, DomainError, DomainResult, Entity, OfferId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    Active,
    /// Pulled by the business itself.
    Withdrawn,
    /// Taken down by platform moderation.
    Removed,
}

/// Input for publishing an offer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOffer {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// What the buyer pays, in cents.
    pub price_cents: u64,
    /// Face value of the resulting gift card, in cents.
    pub value_cents: u64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// A time-bounded discount: pay `price_cents`, receive a card worth `value_cents`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Offer {
    pub id: OfferId,
    pub business_id: BusinessId,
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    pub value_cents: u64,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub status: OfferStatus,
}

impl Offer {
    pub fn publish(business_id: BusinessId, input: NewOffer) -> DomainResult<Self> {
        if input.title.trim().is_empty() {
            return Err(DomainError::validation("offer title must not be empty"));
        }
        if input.price_cents == 0 {
            return Err(DomainError::validation("offer price must be positive"));
        }
        if input.value_cents <= input.price_cents {
            return Err(DomainError::validation(
                "offer value must exceed its price (it is a discount)",
            ));
        }
        if input.ends_at <= input.starts_at {
            return Err(DomainError::validation("offer must end after it starts"));
        }

        Ok(Self {
            id: OfferId::new(),
            business_id,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            price_cents: input.price_cents,
            value_cents: input.value_cents,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            status: OfferStatus::Active,
        })
    }

    /// Active and `starts_at <= now < ends_at`.
    pub fn is_purchasable(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Active && self.starts_at <= now && now < self.ends_at
    }

    /// Still worth listing: active and not yet ended.
    pub fn is_listed(&self, now: DateTime<Utc>) -> bool {
        self.status == OfferStatus::Active && now < self.ends_at
    }

    /// Discount as a whole percentage of face value, rounded down.
    pub fn discount_percent(&self) -> u64 {
        (self.value_cents - self.price_cents) * 100 / self.value_cents
    }

    pub fn withdraw(&mut self) -> DomainResult<()> {
        match self.status {
            OfferStatus::Active => {
                self.status = OfferStatus::Withdrawn;
                Ok(())
            }
            OfferStatus::Withdrawn => Err(DomainError::invariant("offer is already withdrawn")),
            OfferStatus::Removed => Err(DomainError::invariant("offer was removed by moderation")),
        }
    }

    /// Moderation takedown; wins over any other status.
    pub fn remove(&mut self) {
        self.status = OfferStatus::Removed;
    }
}

impl Entity for Offer {
    type Id = OfferId;
    const KIND: &'static str = "offer";

    fn id(&self) -> OfferId {
        self.id
    }
}
