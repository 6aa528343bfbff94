//! `giftmarket-auth`: authentication and authorization boundary.
//!
//! Decoupled from HTTP: the API crate extracts the bearer token and the matched
//! route template, this crate decides.

pub mod authenticator;
pub mod pipeline;
pub mod principal;
pub mod roles;
pub mod route;
pub mod session;
pub mod store;

pub use authenticator::{AuthFailure, TokenAuthenticator};
pub use pipeline::{AuthorizationPipeline, PipelineError, RequestContext};
pub use principal::Principal;
pub use roles::{RoleAssignment, RoleTag, UnknownRole};
pub use route::{RouteDescriptor, RouteTable, RouteTableError, Verb};
pub use session::{Session, SessionToken};
pub use store::{InMemoryPrincipalStore, PrincipalStoreError};
