use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use uuid::Uuid;

use crate::MemberRole;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Company row joined with the requesting user's role in it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct CompanyWithRole {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_role: MemberRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ListCompaniesResponse {
    pub companies: Vec<CompanyWithRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCompanyRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateCompanyResponse {
    pub company: CompanyWithRole,
}
