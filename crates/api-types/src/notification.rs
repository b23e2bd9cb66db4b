use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

use crate::InviteStatus;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, EnumString, Display, TS,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    CompanyInvite,
}

/// Inbox delivery record. Actionability is not stored here; it is derived
/// at read time from the referenced invite's current status.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct UserNotification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub invite_id: Uuid,
    pub company_id: Uuid,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A notification paired with the live status of its invite.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InboxItem {
    pub notification: UserNotification,
    pub invite_status: InviteStatus,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListInboxResponse {
    pub items: Vec<InboxItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UnreadCountResponse {
    pub unread: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct DeclineInviteResponse {
    pub status: InviteStatus,
}
