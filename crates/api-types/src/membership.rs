use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, EnumString, Display, TS,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Member,
}

impl MemberRole {
    /// Roles allowed to manage employees and invites for a company.
    pub fn can_manage_members(self) -> bool {
        matches!(self, MemberRole::Owner | MemberRole::Admin)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, EnumString, Display, TS,
)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Removed,
}

/// Membership row: grants `user_id` a role within `company_id`.
/// Rows are never deleted; removal flips `status` to preserve history.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Membership {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: MemberRole,
    pub status: MembershipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Member info for the company admin view.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct MemberWithProfile {
    pub user_id: Uuid,
    pub role: MemberRole,
    pub email: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListMembersResponse {
    pub members: Vec<MemberWithProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateMemberRoleRequest {
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateMemberRoleResponse {
    pub user_id: Uuid,
    pub role: MemberRole,
}
