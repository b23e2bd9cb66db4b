use api_types::{CompanyWithRole, MemberRole, MemberWithProfile, Membership};
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct MembershipRepository;

impl MembershipRepository {
    pub async fn find<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Membership>, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, company_id, role, status, created_at, updated_at
            FROM memberships
            WHERE user_id = $1 AND company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_active<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Membership>, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, company_id, role, status, created_at, updated_at
            FROM memberships
            WHERE user_id = $1 AND company_id = $2 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn list_active_by_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<Membership>, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, Membership>(
            r#"
            SELECT user_id, company_id, role, status, created_at, updated_at
            FROM memberships
            WHERE user_id = $1 AND status = 'active'
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Active memberships joined with their company rows, for the
    /// company-picker view.
    pub async fn list_companies_with_role<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<CompanyWithRole>, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, CompanyWithRole>(
            r#"
            SELECT c.id, c.name, c.created_at, c.updated_at, m.role AS user_role
            FROM memberships m
            INNER JOIN companies c ON c.id = m.company_id
            WHERE m.user_id = $1 AND m.status = 'active'
            ORDER BY c.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    pub async fn create<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        role: MemberRole,
    ) -> Result<Membership, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, company_id, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4)
            RETURNING user_id, company_id, role, status, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    /// Insert an active membership, or reactivate a removed row with the
    /// new role. Used by invite acceptance so a re-invited user gets their
    /// historical row back instead of a duplicate.
    pub async fn upsert_active<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        role: MemberRole,
    ) -> Result<Membership, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO memberships (user_id, company_id, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, 'active', $4, $4)
            ON CONFLICT (user_id, company_id) DO UPDATE SET
                role = excluded.role,
                status = 'active',
                updated_at = excluded.updated_at
            RETURNING user_id, company_id, role, status, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    /// Active members of a company joined with their account email, for
    /// the admin member list.
    pub async fn list_members_with_profile<'e, E>(
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<MemberWithProfile>, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, MemberWithProfile>(
            r#"
            SELECT m.user_id, m.role, u.email, m.created_at AS joined_at
            FROM memberships m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.company_id = $1 AND m.status = 'active'
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    pub async fn count_active_owners<'e, E>(
        executor: E,
        company_id: Uuid,
    ) -> Result<i64, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM memberships
            WHERE company_id = $1 AND status = 'active' AND role = 'owner'
            "#,
        )
        .bind(company_id)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }

    pub async fn update_role<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
        role: MemberRole,
    ) -> Result<u64, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET role = $3, updated_at = $4
            WHERE user_id = $1 AND company_id = $2 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(role)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Flip an active membership to removed. Returns the number of rows
    /// changed; 0 means there was nothing active to remove.
    pub async fn remove<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<u64, MembershipError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE memberships
            SET status = 'removed', updated_at = $3
            WHERE user_id = $1 AND company_id = $2 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
