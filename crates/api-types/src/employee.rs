use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

use crate::{InviteStatus, MemberRole};

/// Employee record owned by a company. `user_id` stays empty until the
/// linked invite is accepted; `invitation_status` mirrors that invite.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Employee {
    pub id: Uuid,
    pub company_id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: Option<String>,
    pub display_name: String,
    pub role: MemberRole,
    pub invitation_status: Option<InviteStatus>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateEmployeeRequest {
    pub display_name: String,
    pub email: Option<String>,
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListEmployeesResponse {
    pub employees: Vec<Employee>,
}
