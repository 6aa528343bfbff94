//! HTTP handlers, one file per area.
//!
//! Each area exposes its `router()` and the `access()` entries that tell the
//! authorization pipeline who may call each of its routes. Paths are written
//! in full (no nesting) so the matched template is exactly the table key.

use axum::Router;

use giftmarket_auth::{RouteTable, RouteTableError};

pub mod admin;
pub mod businesses;
pub mod gift_cards;
pub mod offers;
pub mod sessions;
pub mod system;
pub mod users;

pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(users::router())
        .merge(sessions::router())
        .merge(businesses::router())
        .merge(offers::router())
        .merge(gift_cards::router())
        .merge(admin::router())
}

/// Access rules for every route `router()` serves.
pub fn route_table() -> Result<RouteTable, RouteTableError> {
    RouteTable::from_entries(
        system::access()
            .into_iter()
            .chain(users::access())
            .chain(sessions::access())
            .chain(businesses::access())
            .chain(offers::access())
            .chain(gift_cards::access())
            .chain(admin::access()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use giftmarket_auth::{RoleTag, Verb};

    #[test]
    fn table_builds_without_duplicates() {
        let table = route_table().unwrap();
        assert_eq!(table.len(), 24);
    }

    #[test]
    fn public_routes_are_the_browsing_and_signup_ones() {
        let table = route_table().unwrap();
        let mut public: Vec<_> = table
            .entries()
            .into_iter()
            .filter(|(_, _, d)| d.is_public())
            .map(|(_, _, d)| d.operation())
            .collect();
        public.sort_unstable();
        assert_eq!(
            public,
            [
                "businesses.get",
                "businesses.list",
                "offers.get",
                "offers.list",
                "sessions.create",
                "system.health",
                "users.register",
            ]
        );
    }

    #[test]
    fn moderation_requires_platform_staff() {
        let table = route_table().unwrap();
        for (_, path, d) in table.entries() {
            if path.starts_with("/admin/") {
                assert_eq!(d.required_roles(), [RoleTag::PlatformEmployee], "{path}");
            }
        }
    }

    #[test]
    fn same_path_different_verbs_have_separate_rules() {
        let table = route_table().unwrap();
        let get = table.get(Verb::Get, "/offers/:id").unwrap();
        let delete = table.get(Verb::Delete, "/offers/:id").unwrap();
        assert!(get.is_public());
        assert_eq!(delete.required_roles(), [RoleTag::BusinessAdmin]);
    }
}
