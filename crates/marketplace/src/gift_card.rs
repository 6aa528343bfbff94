use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use giftmarket_core::{BusinessId, DomainError, DomainResult, Entity, GiftCardId, OfferId, UserId};

use crate::Offer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiftCardStatus {
    Active,
    /// Gifted and waiting for the recipient to claim it.
    Pending,
    /// Balance fully spent.
    Redeemed,
}

/// Where a gifted card is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", rename_all = "snake_case")]
pub enum Recipient {
    Email { address: String },
    Sms { phone: String },
    Social { network: String, handle: String },
}

impl Recipient {
    fn validate(&self) -> DomainResult<()> {
        match self {
            Recipient::Email { address } => {
                let ok = address
                    .trim()
                    .split_once('@')
                    .is_some_and(|(l, d)| !l.is_empty() && d.contains('.'));
                if !ok {
                    return Err(DomainError::validation("recipient email is malformed"));
                }
            }
            Recipient::Sms { phone } => {
                let digits = phone.chars().filter(char::is_ascii_digit).count();
                let allowed = phone
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
                if !allowed || !(7..=15).contains(&digits) {
                    return Err(DomainError::validation("recipient phone number is malformed"));
                }
            }
            Recipient::Social { network, handle } => {
                if network.trim().is_empty() || handle.trim_start_matches('@').trim().is_empty() {
                    return Err(DomainError::validation(
                        "social recipient needs a network and a handle",
                    ));
                }
            }
        }
        Ok(())
    }
}

impl core::fmt::Display for Recipient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Recipient::Email { address } => write!(f, "email:{address}"),
            Recipient::Sms { phone } => write!(f, "sms:{phone}"),
            Recipient::Social { network, handle } => write!(f, "{network}:{handle}"),
        }
    }
}

/// Secret code the recipient presents to take ownership of a gifted card.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimCode(String);

impl ClaimCode {
    /// 10 random bytes, uppercase hex.
    pub fn generate() -> DomainResult<Self> {
        let mut bytes = [0u8; 10];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| DomainError::invariant(format!("entropy unavailable: {e}")))?;
        Ok(Self(bytes.iter().map(|b| format!("{b:02X}")).collect()))
    }

    /// Parse user input; case and surrounding whitespace are ignored.
    pub fn parse(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for ClaimCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ClaimCode(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingGift {
    pub recipient: Recipient,
    #[serde(skip)]
    pub claim_code: ClaimCode,
    pub message: Option<String>,
    pub gifted_by: UserId,
    pub gifted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub amount_cents: u64,
    pub redeemed_by: UserId,
    pub redeemed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GiftCard {
    pub id: GiftCardId,
    pub offer_id: OfferId,
    pub business_id: BusinessId,
    pub owner: UserId,
    pub purchaser: UserId,
    pub value_cents: u64,
    pub balance_cents: u64,
    pub status: GiftCardStatus,
    pub pending_gift: Option<PendingGift>,
    pub redemptions: Vec<Redemption>,
    pub purchased_at: DateTime<Utc>,
}

impl GiftCard {
    /// Buy a card from `offer`. The caller checks the offer's business.
    pub fn purchase(offer: &Offer, buyer: UserId, now: DateTime<Utc>) -> DomainResult<Self> {
        if !offer.is_purchasable(now) {
            return Err(DomainError::invariant("offer is not available for purchase"));
        }
        Ok(Self {
            id: GiftCardId::new(),
            offer_id: offer.id,
            business_id: offer.business_id,
            owner: buyer,
            purchaser: buyer,
            value_cents: offer.value_cents,
            balance_cents: offer.value_cents,
            status: GiftCardStatus::Active,
            pending_gift: None,
            redemptions: Vec::new(),
            purchased_at: now,
        })
    }

    fn ensure_owner(&self, user: UserId) -> DomainResult<()> {
        if self.owner != user {
            return Err(DomainError::forbidden("gift card belongs to another user"));
        }
        Ok(())
    }

    /// Hand the card to someone else. Ownership moves only once they claim it.
    pub fn gift(
        &mut self,
        from: UserId,
        recipient: Recipient,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<ClaimCode> {
        self.ensure_owner(from)?;
        match self.status {
            GiftCardStatus::Active => {}
            GiftCardStatus::Pending => return Err(DomainError::invariant("gift card is already gifted")),
            GiftCardStatus::Redeemed => return Err(DomainError::invariant("gift card is fully redeemed")),
        }
        recipient.validate()?;

        let claim_code = ClaimCode::generate()?;
        self.pending_gift = Some(PendingGift {
            recipient,
            claim_code: claim_code.clone(),
            message: message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()),
            gifted_by: from,
            gifted_at: now,
        });
        self.status = GiftCardStatus::Pending;
        Ok(claim_code)
    }

    pub fn matches_claim(&self, code: &ClaimCode) -> bool {
        self.status == GiftCardStatus::Pending
            && self.pending_gift.as_ref().is_some_and(|g| &g.claim_code == code)
    }

    /// Take ownership of a pending gift. Claiming your own gift cancels it.
    pub fn claim(&mut self, claimant: UserId, code: &ClaimCode) -> DomainResult<()> {
        if !self.matches_claim(code) {
            return Err(DomainError::not_found("gift"));
        }
        self.owner = claimant;
        self.pending_gift = None;
        self.status = GiftCardStatus::Active;
        Ok(())
    }

    /// Take back a pending gift that could not be delivered.
    ///
    /// No-op unless `code` is still the pending claim code.
    pub fn withdraw_gift(&mut self, code: &ClaimCode) {
        if self.matches_claim(code) {
            self.pending_gift = None;
            self.status = GiftCardStatus::Active;
        }
    }

    /// Spend `amount_cents` of the balance at the issuing business.
    pub fn redeem(&mut self, amount_cents: u64, by: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != GiftCardStatus::Active {
            return Err(DomainError::invariant(format!(
                "gift card cannot be redeemed while {:?}",
                self.status
            )));
        }
        if amount_cents == 0 {
            return Err(DomainError::validation("redeem amount must be positive"));
        }
        if amount_cents > self.balance_cents {
            return Err(DomainError::invariant(format!(
                "redeem amount {amount_cents} exceeds balance {}",
                self.balance_cents
            )));
        }

        self.balance_cents -= amount_cents;
        self.redemptions.push(Redemption {
            amount_cents,
            redeemed_by: by,
            redeemed_at: now,
        });
        if self.balance_cents == 0 {
            self.status = GiftCardStatus::Redeemed;
        }
        Ok(())
    }
}

impl Entity for GiftCard {
    type Id = GiftCardId;
    const KIND: &'static str = "gift card";

    fn id(&self) -> GiftCardId {
        self.id
    }
}
