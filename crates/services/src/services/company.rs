use api_types::{Company, MemberRole, MemberWithProfile, Membership, Principal};
use db::{companies::CompanyRepository, memberships::MembershipRepository};
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

use super::{context::ContextService, error::TenancyError};

pub struct CompanyService;

impl CompanyService {
    /// Register a company. The registering principal becomes its owner,
    /// the one membership that is created without an invite.
    #[instrument(name = "company.register", skip(pool, name), fields(user_id = %principal.id))]
    pub async fn register(
        pool: &SqlitePool,
        principal: &Principal,
        name: &str,
    ) -> Result<(Company, Membership), TenancyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TenancyError::Validation(
                "company name cannot be blank".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;
        let company = CompanyRepository::create(&mut *tx, name).await?;
        let membership =
            MembershipRepository::create(&mut *tx, principal.id, company.id, MemberRole::Owner)
                .await?;
        tx.commit().await?;

        Ok((company, membership))
    }

    pub async fn list_members(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Vec<MemberWithProfile>, TenancyError> {
        ContextService::require_membership(pool, principal, company_id).await?;
        Ok(MembershipRepository::list_members_with_profile(pool, company_id).await?)
    }

    /// Change an active member's role. Owner memberships may only be
    /// touched by an owner, and a company must always retain one.
    #[instrument(
        name = "company.update_member_role",
        skip(pool),
        fields(user_id = %principal.id, company_id = %company_id, member_user_id = %member_user_id)
    )]
    pub async fn update_member_role(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
        member_user_id: Uuid,
        role: MemberRole,
    ) -> Result<Membership, TenancyError> {
        let target = Self::guard_member_change(pool, principal, company_id, member_user_id).await?;

        if target.role == MemberRole::Owner
            && role != MemberRole::Owner
            && MembershipRepository::count_active_owners(pool, company_id).await? <= 1
        {
            return Err(TenancyError::Validation(
                "company must retain at least one owner".to_string(),
            ));
        }

        if MembershipRepository::update_role(pool, member_user_id, company_id, role).await? == 0 {
            return Err(TenancyError::Conflict);
        }
        MembershipRepository::find(pool, member_user_id, company_id)
            .await?
            .ok_or(TenancyError::NotFound("membership"))
    }

    /// Remove a member: the membership row is kept with status flipped,
    /// so re-acceptance of a later invite reactivates it.
    #[instrument(
        name = "company.remove_member",
        skip(pool),
        fields(user_id = %principal.id, company_id = %company_id, member_user_id = %member_user_id)
    )]
    pub async fn remove_member(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<(), TenancyError> {
        let target = Self::guard_member_change(pool, principal, company_id, member_user_id).await?;

        if target.role == MemberRole::Owner
            && MembershipRepository::count_active_owners(pool, company_id).await? <= 1
        {
            return Err(TenancyError::Validation(
                "company must retain at least one owner".to_string(),
            ));
        }

        if MembershipRepository::remove(pool, member_user_id, company_id).await? == 0 {
            // Raced with another removal; the end state is what was asked for.
            return Ok(());
        }
        Ok(())
    }

    async fn guard_member_change(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
        member_user_id: Uuid,
    ) -> Result<Membership, TenancyError> {
        let actor = ContextService::require_manage_role(pool, principal, company_id).await?;
        let target = MembershipRepository::find_active(pool, member_user_id, company_id)
            .await?
            .ok_or(TenancyError::NotFound("membership"))?;
        if target.role == MemberRole::Owner && actor.role != MemberRole::Owner {
            return Err(TenancyError::Forbidden);
        }
        Ok(target)
    }
}
