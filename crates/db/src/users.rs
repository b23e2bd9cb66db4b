use api_types::User;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct UserRepository;

impl UserRepository {
    /// Mirror an identity-provider principal into the local projection.
    /// Email is kept current; everything else is left untouched.
    pub async fn upsert_principal<'e, E>(
        executor: E,
        id: Uuid,
        email: &str,
    ) -> Result<User, UserError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let record = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET
                email = excluded.email,
                updated_at = excluded.updated_at
            RETURNING id, email, first_name, last_name, last_active_company_id,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(now)
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<User>, UserError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, last_active_company_id,
                   created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, UserError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, first_name, last_name, last_active_company_id,
                   created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn set_last_active_company<'e, E>(
        executor: E,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<(), UserError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            r#"
            UPDATE users
            SET last_active_company_id = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }
}
