pub mod company;
pub mod context;
pub mod error;
pub mod invite;
pub mod notification;

pub use company::CompanyService;
pub use context::{ContextResolution, ContextService, NoContextReason};
pub use error::TenancyError;
pub use invite::{AcceptOutcome, InviteService, ResolvedInvite};
pub use notification::NotificationService;

#[cfg(test)]
pub(crate) mod test_support;
