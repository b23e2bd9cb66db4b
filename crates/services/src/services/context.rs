use api_types::{ActiveContext, CompanyWithRole, Membership, Principal};
use db::{memberships::MembershipRepository, users::UserRepository};
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

use super::error::TenancyError;

/// Why context resolution produced no scoped company.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoContextReason {
    /// The principal has no active memberships at all; route to
    /// onboarding / no-access.
    NoMemberships,
    /// Several active memberships and no usable hint; the caller must
    /// prompt for an explicit choice.
    SelectionRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextResolution {
    Active(ActiveContext),
    NoContext(NoContextReason),
}

pub struct ContextService;

impl ContextService {
    /// Compute the company the current request is scoped to.
    ///
    /// A single active membership always wins, whatever the hint says.
    /// With several memberships the sticky hint must name one of them;
    /// ambiguity is never resolved by picking an arbitrary company.
    #[instrument(name = "context.resolve", skip(pool), fields(user_id = %principal.id))]
    pub async fn resolve_context(
        pool: &SqlitePool,
        principal: &Principal,
        sticky_hint: Option<Uuid>,
    ) -> Result<ContextResolution, TenancyError> {
        let memberships = MembershipRepository::list_active_by_user(pool, principal.id).await?;

        let resolved = match memberships.as_slice() {
            [] => ContextResolution::NoContext(NoContextReason::NoMemberships),
            [only] => ContextResolution::Active(ActiveContext {
                company_id: only.company_id,
                role: only.role,
            }),
            many => match sticky_hint
                .and_then(|hint| many.iter().find(|m| m.company_id == hint))
            {
                Some(hinted) => ContextResolution::Active(ActiveContext {
                    company_id: hinted.company_id,
                    role: hinted.role,
                }),
                None => ContextResolution::NoContext(NoContextReason::SelectionRequired),
            },
        };

        Ok(resolved)
    }

    /// Resolve or fail: tenant-scoped operations call this to turn an
    /// ambiguous or absent selection into a denial.
    pub async fn require_context(
        pool: &SqlitePool,
        principal: &Principal,
        sticky_hint: Option<Uuid>,
    ) -> Result<ActiveContext, TenancyError> {
        match Self::resolve_context(pool, principal, sticky_hint).await? {
            ContextResolution::Active(ctx) => Ok(ctx),
            ContextResolution::NoContext(_) => Err(TenancyError::NoActiveContext),
        }
    }

    /// Explicit company selection. Rejects companies the principal holds
    /// no active membership in; a bad selection is never silently
    /// substituted. Recording the last-active marker is best-effort.
    #[instrument(name = "context.select_company", skip(pool), fields(user_id = %principal.id, company_id = %company_id))]
    pub async fn select_company(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<ActiveContext, TenancyError> {
        let membership = MembershipRepository::find_active(pool, principal.id, company_id)
            .await?
            .ok_or(TenancyError::Forbidden)?;

        if let Err(error) =
            UserRepository::set_last_active_company(pool, principal.id, company_id).await
        {
            tracing::warn!(?error, "failed to record last active company");
        }

        Ok(ActiveContext {
            company_id: membership.company_id,
            role: membership.role,
        })
    }

    pub async fn list_companies(
        pool: &SqlitePool,
        principal: &Principal,
    ) -> Result<Vec<CompanyWithRole>, TenancyError> {
        Ok(MembershipRepository::list_companies_with_role(pool, principal.id).await?)
    }

    /// Active membership of `principal` in `company_id`, or Forbidden.
    pub async fn require_membership(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Membership, TenancyError> {
        MembershipRepository::find_active(pool, principal.id, company_id)
            .await?
            .ok_or(TenancyError::Forbidden)
    }

    /// Membership with member-management rights (owner or admin), or
    /// Forbidden.
    pub async fn require_manage_role(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
    ) -> Result<Membership, TenancyError> {
        let membership = Self::require_membership(pool, principal, company_id).await?;
        if !membership.role.can_manage_members() {
            return Err(TenancyError::Forbidden);
        }
        Ok(membership)
    }
}
