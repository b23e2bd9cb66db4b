use api_types::{Employee, InviteStatus, MemberRole};
use chrono::Utc;
use sqlx::{Executor, Sqlite};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EmployeeError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const EMPLOYEE_COLUMNS: &str = "id, company_id, user_id, email, display_name, role, \
                                invitation_status, is_active, created_at, updated_at";

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub async fn create<'e, E>(
        executor: E,
        company_id: Uuid,
        display_name: &str,
        email: Option<&str>,
        role: MemberRole,
    ) -> Result<Employee, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Employee>(&format!(
            r#"
            INSERT INTO employees (id, company_id, email, display_name, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING {EMPLOYEE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(email)
        .bind(display_name)
        .bind(role)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Employee>, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let record = sqlx::query_as::<_, Employee>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await?;
        Ok(record)
    }

    pub async fn list_by_company<'e, E>(
        executor: E,
        company_id: Uuid,
    ) -> Result<Vec<Employee>, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let records = sqlx::query_as::<_, Employee>(&format!(
            r#"
            SELECT {EMPLOYEE_COLUMNS}
            FROM employees
            WHERE company_id = $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(company_id)
        .fetch_all(executor)
        .await?;
        Ok(records)
    }

    /// Bind an email to an employee that does not have one yet. Returns 0
    /// when the column was already set.
    pub async fn bind_email<'e, E>(
        executor: E,
        id: Uuid,
        email: &str,
    ) -> Result<u64, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET email = $2, updated_at = $3
            WHERE id = $1 AND email IS NULL
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Mirror the linked invite's status. Must run inside the same
    /// transaction as the invite transition it mirrors.
    pub async fn set_invitation_status<'e, E>(
        executor: E,
        id: Uuid,
        status: InviteStatus,
    ) -> Result<u64, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET invitation_status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Link the accepting user and mark the invitation accepted, as one
    /// statement of the acceptance transaction.
    pub async fn link_user<'e, E>(
        executor: E,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, EmployeeError>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            r#"
            UPDATE employees
            SET user_id = $2, invitation_status = 'accepted', updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
