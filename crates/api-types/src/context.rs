use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::MemberRole;

/// The company + role a request is currently scoped to.
///
/// Derived fresh per request from active memberships plus the sticky
/// cookie hint; never cached process-wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ActiveContext {
    pub company_id: Uuid,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ActiveContextResponse {
    pub context: ActiveContext,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SelectCompanyResponse {
    pub context: ActiveContext,
}
