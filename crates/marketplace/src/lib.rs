//! Marketplace domain: businesses, discount offers and gift cards.
//!
//! Plain domain logic over in-memory stores. Authorization of the caller's
//! role happens upstream; this crate only enforces ownership (which business
//! or user a record belongs to).

pub mod business;
pub mod gift_card;
pub mod notify;
pub mod offer;
pub mod service;
pub mod store;

pub use business::{Business, BusinessStatus, NewBusiness};
pub use gift_card::{ClaimCode, GiftCard, GiftCardStatus, PendingGift, Recipient, Redemption};
pub use notify::{GiftNotification, Notifier, NotifyError, RecordingNotifier, TracingNotifier};
pub use offer::{NewOffer, Offer, OfferStatus};
pub use service::{Actor, Marketplace, MarketplaceError};
pub use store::InMemoryStore;
