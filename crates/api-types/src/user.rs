use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

/// Authenticated identity attached to a request by the external identity
/// provider. Immutable from this system's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// Local projection of an identity-provider account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Best-effort marker of the company last explicitly selected.
    pub last_active_company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
