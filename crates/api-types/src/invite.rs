use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::MemberRole;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, EnumString, Display, TS,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Revoked,
    Expired,
}

impl InviteStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(self) -> bool {
        !matches!(self, InviteStatus::Pending)
    }
}

/// Invite row. Only the SHA-256 hash of the token is persisted; the raw
/// token is returned once at creation and delivered out of band.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Invite {
    pub id: Uuid,
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub email: Option<String>,
    pub role: MemberRole,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub status: InviteStatus,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateInviteRequest {
    pub employee_id: Uuid,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateInviteResponse {
    pub invite: Invite,
    /// Raw token, surfaced exactly once.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListInvitesResponse {
    pub invites: Vec<Invite>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ResolveInviteRequest {
    pub token: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ResolveInviteResponse {
    pub invite_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AcceptInviteResponse {
    pub company_id: Uuid,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct RevokeInviteResponse {
    pub status: InviteStatus,
}
