use api_types::UserNotification;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, invite_id, company_id, read_at, created_at";

pub struct NotificationRepository;

impl NotificationRepository {
    /// Deliver an invite notification to a user. Idempotent per
    /// (user, invite); a duplicate delivery returns the existing row.
    pub async fn create_for_invite<'e, E>(
        executor: E,
        user_id: Uuid,
        invite_id: Uuid,
        company_id: Uuid,
    ) -> Result<UserNotification, NotificationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, UserNotification>(&format!(
            r#"
            INSERT INTO user_notifications (id, user_id, notification_type, invite_id,
                                            company_id, created_at)
            VALUES ($1, $2, 'company_invite', $3, $4, $5)
            ON CONFLICT (user_id, invite_id) DO UPDATE SET user_id = excluded.user_id
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(invite_id)
        .bind(company_id)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id<'e, E>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<UserNotification>, NotificationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, UserNotification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM user_notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn list_by_user<'e, E>(
        executor: E,
        user_id: Uuid,
    ) -> Result<Vec<UserNotification>, NotificationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, UserNotification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM user_notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Set read_at once; already-read rows are left untouched.
    pub async fn mark_read<'e, E>(executor: E, id: Uuid) -> Result<u64, NotificationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_notifications
            SET read_at = $2
            WHERE id = $1 AND read_at IS NULL
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mark the invite's notification read for its recipient, as part of
    /// the accept/decline transaction.
    pub async fn mark_read_for_invite<'e, E>(
        executor: E,
        invite_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, NotificationError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE user_notifications
            SET read_at = $3
            WHERE invite_id = $1 AND user_id = $2 AND read_at IS NULL
            "#,
        )
        .bind(invite_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
