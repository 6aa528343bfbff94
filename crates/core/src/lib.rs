//! `giftmarket-core`: shared domain building blocks.
//!
//! Identifiers, the domain error model and the entity marker. No IO, no HTTP.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{BusinessId, GiftCardId, OfferId, UserId};
