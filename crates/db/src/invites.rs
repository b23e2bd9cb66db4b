use api_types::{Invite, MemberRole};
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InviteError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const INVITE_COLUMNS: &str = "id, company_id, employee_id, email, role, token_hash, status, \
                              expires_at, created_at, revoked_at";

pub struct CreateInviteParams<'a> {
    pub company_id: Uuid,
    pub employee_id: Uuid,
    pub email: Option<&'a str>,
    pub role: MemberRole,
    pub token_hash: &'a str,
    pub expires_at: DateTime<Utc>,
}

pub struct InviteRepository;

impl InviteRepository {
    pub async fn create<'e, E>(
        executor: E,
        params: CreateInviteParams<'_>,
    ) -> Result<Invite, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Invite>(&format!(
            r#"
            INSERT INTO invites (id, company_id, employee_id, email, role, token_hash,
                                 status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
            RETURNING {INVITE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(params.company_id)
        .bind(params.employee_id)
        .bind(params.email)
        .bind(params.role)
        .bind(params.token_hash)
        .bind(params.expires_at)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Invite>, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_token_hash<'e, E>(
        executor: E,
        token_hash: &str,
    ) -> Result<Option<Invite>, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_pending_by_employee<'e, E>(
        executor: E,
        employee_id: Uuid,
    ) -> Result<Option<Invite>, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Invite>(&format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE employee_id = $1 AND status = 'pending'"
        ))
        .bind(employee_id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn list_pending_by_company<'e, E>(
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Invite>, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, Invite>(&format!(
            r#"
            SELECT {INVITE_COLUMNS}
            FROM invites
            WHERE company_id = $1 AND status = 'pending'
            ORDER BY created_at DESC
            "#
        ))
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Bind an email to a still-unbound pending invite. Returns 0 when the
    /// invite is bound already or no longer pending.
    pub async fn bind_email<'e, E>(executor: E, id: Uuid, email: &str) -> Result<u64, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET email = $2
            WHERE id = $1 AND email IS NULL AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Guarded pending→accepted flip. rows_affected = 0 means the caller
    /// lost the race or the invite was never pending; it must re-read to
    /// find out which.
    pub async fn mark_accepted<'e, E>(executor: E, id: Uuid) -> Result<u64, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET status = 'accepted'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Guarded pending→revoked flip, shared by admin revocation and
    /// invitee decline.
    pub async fn mark_revoked<'e, E>(executor: E, id: Uuid) -> Result<u64, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET status = 'revoked', revoked_at = $2
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Lazy expiry write-back: upgrade pending→expired once `expires_at`
    /// has passed, so later reads see the terminal state without
    /// recomputation.
    pub async fn expire_if_due<'e, E>(
        executor: E,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<u64, InviteError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE invites
            SET status = 'expired'
            WHERE id = $1 AND status = 'pending' AND expires_at <= $2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
