use api_types::{Company, Employee, Invite, MemberRole, Principal};
use chrono::Duration;
use db::{DBService, employees::EmployeeRepository, users::UserRepository};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{company::CompanyService, invite::InviteService};

pub async fn db() -> DBService {
    DBService::new_in_memory().await.expect("in-memory database")
}

pub async fn seed_user(pool: &SqlitePool, email: &str) -> Principal {
    let user = UserRepository::upsert_principal(pool, Uuid::new_v4(), email)
        .await
        .expect("seed user");
    Principal {
        id: user.id,
        email: user.email,
    }
}

pub async fn seed_company(pool: &SqlitePool, name: &str, owner: &Principal) -> Company {
    let (company, _membership) = CompanyService::register(pool, owner, name)
        .await
        .expect("seed company");
    company
}

pub async fn seed_employee(
    pool: &SqlitePool,
    company_id: Uuid,
    display_name: &str,
    email: Option<&str>,
) -> Employee {
    EmployeeRepository::create(pool, company_id, display_name, email, MemberRole::Member)
        .await
        .expect("seed employee")
}

pub async fn invite_employee(
    pool: &SqlitePool,
    admin: &Principal,
    company: &Company,
    employee: &Employee,
) -> (Invite, String) {
    InviteService::create_invite(
        pool,
        admin,
        company.id,
        employee.id,
        MemberRole::Member,
        Duration::hours(72),
    )
    .await
    .expect("create invite")
}
