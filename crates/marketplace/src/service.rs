//! Marketplace operations over the in-memory stores.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use giftmarket_core::{BusinessId, DomainError, DomainResult, GiftCardId, OfferId, UserId};

use crate::{
    Business, ClaimCode, GiftCard, GiftNotification, InMemoryStore, NewBusiness, NewOffer, Notifier,
    NotifyError, Offer, Recipient,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketplaceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub type MarketplaceResult<T> = Result<T, MarketplaceError>;

/// Who is calling, as far as ownership rules are concerned.
///
/// Role checks already happened upstream; `business_id` is the request's
/// business scope and `platform_staff` marks moderators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub display_name: String,
    pub business_id: Option<BusinessId>,
    pub platform_staff: bool,
}

impl Actor {
    /// The business this request acts for.
    pub fn business_scope(&self) -> DomainResult<BusinessId> {
        self.business_id
            .ok_or_else(|| DomainError::forbidden("request is not scoped to a business"))
    }

    fn ensure_acts_for(&self, business_id: BusinessId) -> DomainResult<()> {
        if self.business_scope()? != business_id {
            return Err(DomainError::forbidden("record belongs to another business"));
        }
        Ok(())
    }
}

pub struct Marketplace {
    businesses: InMemoryStore<Business>,
    offers: InMemoryStore<Offer>,
    cards: InMemoryStore<GiftCard>,
    notifier: Arc<dyn Notifier>,
}

impl Marketplace {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            businesses: InMemoryStore::new(),
            offers: InMemoryStore::new(),
            cards: InMemoryStore::new(),
            notifier,
        }
    }

    // -------------------------
    // Businesses
    // -------------------------

    /// Register a business owned by `owner`. It starts pending review.
    pub fn create_business(
        &self,
        owner: UserId,
        input: NewBusiness,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<Business> {
        let business = Business::register(owner, input, now)?;
        self.businesses.insert(business.clone());
        tracing::info!(business_id = %business.id, %owner, "business registered");
        Ok(business)
    }

    /// Approved businesses only; others are visible to their own staff and
    /// to moderators.
    pub fn get_business(&self, id: BusinessId, viewer: Option<&Actor>) -> MarketplaceResult<Business> {
        let business = self.businesses.get(&id)?;
        let privileged = viewer.is_some_and(|a| {
            a.platform_staff || a.user_id == business.owner || a.business_id == Some(id)
        });
        if business.is_approved() || privileged {
            Ok(business)
        } else {
            Err(DomainError::not_found("business").into())
        }
    }

    pub fn list_businesses(&self) -> Vec<Business> {
        self.businesses.list_where(Business::is_approved)
    }

    /// Every business regardless of status (moderation view).
    pub fn list_all_businesses(&self) -> Vec<Business> {
        self.businesses.list()
    }

    pub fn approve_business(&self, id: BusinessId) -> MarketplaceResult<Business> {
        let (business, ()) = self.businesses.update(&id, |b| {
            b.approve();
            Ok::<(), MarketplaceError>(())
        })?;
        tracing::info!(business_id = %id, "business approved");
        Ok(business)
    }

    pub fn suspend_business(&self, id: BusinessId) -> MarketplaceResult<Business> {
        let (business, ()) = self.businesses.update(&id, |b| b.suspend())?;
        tracing::warn!(business_id = %id, "business suspended");
        Ok(business)
    }

    // -------------------------
    // Offers
    // -------------------------

    /// Publish an offer for the actor's business, which must be approved.
    pub fn create_offer(&self, actor: &Actor, input: NewOffer) -> MarketplaceResult<Offer> {
        let business_id = actor.business_scope()?;
        let business = self.businesses.get(&business_id)?;
        if !business.is_approved() {
            return Err(DomainError::invariant("business is not approved to publish offers").into());
        }

        let offer = Offer::publish(business_id, input)?;
        self.offers.insert(offer.clone());
        tracing::info!(offer_id = %offer.id, %business_id, "offer published");
        Ok(offer)
    }

    /// An active offer of an approved business.
    pub fn get_offer(&self, id: OfferId) -> MarketplaceResult<Offer> {
        let offer = self.offers.get(&id)?;
        if !self.is_visible(&offer) {
            return Err(DomainError::not_found("offer").into());
        }
        Ok(offer)
    }

    /// Listed offers (active, not ended, approved business), optionally for one business.
    pub fn list_offers(&self, business_id: Option<BusinessId>, now: DateTime<Utc>) -> Vec<Offer> {
        self.offers.list_where(|o| {
            o.is_listed(now)
                && business_id.is_none_or(|b| o.business_id == b)
                && self.is_visible(o)
        })
    }

    fn is_visible(&self, offer: &Offer) -> bool {
        offer.status == crate::OfferStatus::Active
            && self
                .businesses
                .get(&offer.business_id)
                .is_ok_and(|b| b.is_approved())
    }

    /// Withdraw one of the actor's business's offers.
    pub fn withdraw_offer(&self, actor: &Actor, id: OfferId) -> MarketplaceResult<Offer> {
        let (offer, ()) = self.offers.update(&id, |o| -> MarketplaceResult<()> {
            actor.ensure_acts_for(o.business_id)?;
            o.withdraw()?;
            Ok(())
        })?;
        tracing::info!(offer_id = %id, "offer withdrawn");
        Ok(offer)
    }

    /// Moderation takedown.
    pub fn remove_offer(&self, id: OfferId) -> MarketplaceResult<Offer> {
        let (offer, ()) = self.offers.update(&id, |o| {
            o.remove();
            Ok::<(), MarketplaceError>(())
        })?;
        tracing::warn!(offer_id = %id, "offer removed by moderation");
        Ok(offer)
    }

    // -------------------------
    // Gift cards
    // -------------------------

    /// Buy a card from an offer. Payment is recorded, not processed.
    pub fn purchase(&self, actor: &Actor, offer_id: OfferId, now: DateTime<Utc>) -> MarketplaceResult<GiftCard> {
        let offer = self.offers.get(&offer_id)?;
        let business = self.businesses.get(&offer.business_id)?;
        if !business.is_approved() {
            return Err(DomainError::invariant("business is not accepting purchases").into());
        }

        let card = GiftCard::purchase(&offer, actor.user_id, now)?;
        self.cards.insert(card.clone());
        tracing::info!(
            card_id = %card.id,
            %offer_id,
            buyer = %actor.user_id,
            price_cents = offer.price_cents,
            "gift card purchased"
        );
        Ok(card)
    }

    pub fn cards_owned_by(&self, owner: UserId) -> Vec<GiftCard> {
        self.cards.list_where(|c| c.owner == owner)
    }

    /// Visible to its owner, staff of the issuing business, and moderators.
    pub fn get_card(&self, actor: &Actor, id: GiftCardId) -> MarketplaceResult<GiftCard> {
        let card = self.cards.get(&id)?;
        let allowed = card.owner == actor.user_id
            || actor.business_id == Some(card.business_id)
            || actor.platform_staff;
        if !allowed {
            return Err(DomainError::forbidden("gift card belongs to another user").into());
        }
        Ok(card)
    }

    /// Gift a card and notify the recipient with the claim code.
    ///
    /// The notifier runs after the store lock is released. If delivery fails
    /// the gift is withdrawn again and the card is back to `Active`.
    pub fn gift(
        &self,
        actor: &Actor,
        id: GiftCardId,
        recipient: Recipient,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<GiftCard> {
        let (card, claim_code) = self.cards.update(&id, |card| -> MarketplaceResult<ClaimCode> {
            Ok(card.gift(actor.user_id, recipient.clone(), message, now)?)
        })?;
        let business_name = self
            .businesses
            .get(&card.business_id)
            .map(|b| b.name)
            .unwrap_or_default();

        let delivered = self.notifier.send_gift(&GiftNotification {
            recipient: recipient.clone(),
            sender_name: actor.display_name.clone(),
            business_name,
            value_cents: card.balance_cents,
            message: card.pending_gift.as_ref().and_then(|g| g.message.clone()),
            claim_code: claim_code.clone(),
        });
        if let Err(e) = delivered {
            let reverted = self.cards.update(&id, |c| {
                c.withdraw_gift(&claim_code);
                Ok::<(), DomainError>(())
            });
            tracing::warn!(card_id = %id, error = %e, reverted = reverted.is_ok(), "gift notification failed");
            return Err(e.into());
        }

        tracing::info!(card_id = %id, %recipient, "gift card sent");
        Ok(card)
    }

    /// Take ownership of a pending gift by its claim code.
    pub fn claim(&self, actor: &Actor, code: &str) -> MarketplaceResult<GiftCard> {
        let code = ClaimCode::parse(code);
        let (card, ()) = self
            .cards
            .update_first(|c| c.matches_claim(&code), |c| c.claim(actor.user_id, &code))
            .map_err(|e: DomainError| match e {
                DomainError::NotFound(_) => DomainError::not_found("gift"),
                other => other,
            })?;
        tracing::info!(card_id = %card.id, new_owner = %actor.user_id, "gift claimed");
        Ok(card)
    }

    /// Redeem part of a card at the actor's business.
    pub fn redeem(
        &self,
        actor: &Actor,
        id: GiftCardId,
        amount_cents: u64,
        now: DateTime<Utc>,
    ) -> MarketplaceResult<GiftCard> {
        let (card, ()) = self.cards.update(&id, |c| -> MarketplaceResult<()> {
            actor.ensure_acts_for(c.business_id)?;
            c.redeem(amount_cents, actor.user_id, now)?;
            Ok(())
        })?;
        tracing::info!(card_id = %id, amount_cents, balance_cents = card.balance_cents, "gift card redeemed");
        Ok(card)
    }
}

impl core::fmt::Debug for Marketplace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Marketplace").finish_non_exhaustive()
    }
}
