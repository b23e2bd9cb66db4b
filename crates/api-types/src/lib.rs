//! API types shared between the HTTP surface and the domain services.
//!
//! This crate contains:
//! - Row types (e.g., `Membership`, `Invite`) - the API representation of database entities
//! - Request types (e.g., `CreateInviteRequest`) - API input types
//! - Shared enums (e.g., `MemberRole`, `InviteStatus`)

pub mod company;
pub mod context;
pub mod employee;
pub mod invite;
pub mod membership;
pub mod notification;
pub mod user;

pub use company::*;
pub use context::*;
pub use employee::*;
pub use invite::*;
pub use membership::*;
pub use notification::*;
pub use user::*;
