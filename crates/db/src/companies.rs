use api_types::Company;
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CompanyError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct CompanyRepository;

impl CompanyRepository {
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<Company, CompanyError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Company>, CompanyError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Company>(
            "SELECT id, name, created_at, updated_at FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }
}
