use api_types::InviteStatus;
use db::{
    companies::CompanyError, employees::EmployeeError, invites::InviteError,
    memberships::MembershipError, notifications::NotificationError, users::UserError,
};
use thiserror::Error;

/// Error taxonomy shared by the tenancy core. Validation and authorization
/// failures are resolved locally and returned as typed variants; store
/// failures surface as-is; retry policy belongs to the caller.
#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("not authenticated")]
    Unauthenticated,
    #[error("no active company selected")]
    NoActiveContext,
    #[error("permission denied")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    /// The invite reached a terminal state (or its deadline) before the
    /// requested transition could apply.
    #[error("invite is no longer pending (status: {status})")]
    InviteNoLongerPending { status: InviteStatus },
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),
    /// A guarded update applied zero rows with no explanatory re-read:
    /// the caller lost a concurrent race.
    #[error("conflicting concurrent update")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<UserError> for TenancyError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Database(e) => TenancyError::Database(e),
        }
    }
}

impl From<CompanyError> for TenancyError {
    fn from(err: CompanyError) -> Self {
        match err {
            CompanyError::Database(e) => TenancyError::Database(e),
        }
    }
}

impl From<MembershipError> for TenancyError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::Database(e) => TenancyError::Database(e),
        }
    }
}

impl From<EmployeeError> for TenancyError {
    fn from(err: EmployeeError) -> Self {
        match err {
            EmployeeError::Database(e) => TenancyError::Database(e),
        }
    }
}

impl From<InviteError> for TenancyError {
    fn from(err: InviteError) -> Self {
        match err {
            InviteError::Database(e) => TenancyError::Database(e),
        }
    }
}

impl From<NotificationError> for TenancyError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::Database(e) => TenancyError::Database(e),
        }
    }
}

/// Lowercase + trim, the canonical email form used for all comparisons
/// and lookups.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
