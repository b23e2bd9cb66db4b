use api_types::{
    Company, Invite, InviteStatus, MemberRole, Membership, Principal,
};
use chrono::{DateTime, Duration, Utc};
use db::{
    companies::CompanyRepository,
    employees::EmployeeRepository,
    invites::{CreateInviteParams, InviteError, InviteRepository},
    notifications::NotificationRepository,
    users::UserRepository,
};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::instrument;
use uuid::Uuid;

use super::{
    context::ContextService,
    error::{TenancyError, normalize_email},
};

/// Default validity horizon for a fresh invite.
pub const DEFAULT_INVITE_TTL_HOURS: i64 = 72;

/// Token resolution result: the invite with its email bound, plus the
/// issuing company for display.
#[derive(Debug, Clone)]
pub struct ResolvedInvite {
    pub invite: Invite,
    pub company: Company,
}

/// Successful acceptance: the terminal invite and the membership it
/// granted.
#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub invite: Invite,
    pub membership: Membership,
}

pub struct InviteService;

impl InviteService {
    /// Issue an invite for an employee with no linked user yet. Only the
    /// token's hash is persisted; the raw value is returned once for
    /// out-of-band delivery. A notification is delivered immediately only
    /// when the employee's email already resolves to a known account.
    #[instrument(
        name = "invite.create",
        skip(pool, ttl),
        fields(user_id = %principal.id, company_id = %company_id, employee_id = %employee_id)
    )]
    pub async fn create_invite(
        pool: &SqlitePool,
        principal: &Principal,
        company_id: Uuid,
        employee_id: Uuid,
        role: MemberRole,
        ttl: Duration,
    ) -> Result<(Invite, String), TenancyError> {
        ContextService::require_manage_role(pool, principal, company_id).await?;

        let employee = EmployeeRepository::find_by_id(pool, employee_id)
            .await?
            .filter(|e| e.company_id == company_id)
            .ok_or(TenancyError::NotFound("employee"))?;
        if employee.user_id.is_some() {
            return Err(TenancyError::Validation(
                "employee is already linked to a user account".to_string(),
            ));
        }
        if InviteRepository::find_pending_by_employee(pool, employee_id)
            .await?
            .is_some()
        {
            return Err(TenancyError::Validation(
                "employee already has a pending invite".to_string(),
            ));
        }

        let raw_token = utils::tokens::generate_token();
        let token_hash = utils::tokens::hash_token(&raw_token);
        let email = employee.email.as_deref().map(normalize_email);

        let mut tx = pool.begin().await?;
        let invite = InviteRepository::create(
            &mut *tx,
            CreateInviteParams {
                company_id,
                employee_id,
                email: email.as_deref(),
                role,
                token_hash: &token_hash,
                expires_at: Utc::now() + ttl,
            },
        )
        .await
        .map_err(|error| match &error {
            // The partial unique index closes the check-then-create race:
            // a second concurrent create loses here.
            InviteError::Database(sqlx::Error::Database(db_err))
                if db_err.is_unique_violation() =>
            {
                TenancyError::Conflict
            }
            _ => error.into(),
        })?;
        EmployeeRepository::set_invitation_status(&mut *tx, employee_id, InviteStatus::Pending)
            .await?;

        if let Some(email) = &email {
            if let Some(user) = UserRepository::find_by_email(&mut *tx, email).await? {
                NotificationRepository::create_for_invite(
                    &mut *tx, user.id, invite.id, company_id,
                )
                .await?;
            }
        }
        tx.commit().await?;

        Ok((invite, raw_token))
    }

    /// Resolve an invite by raw token, binding the supplied email to both
    /// invite and employee if neither carries one yet. Re-submitting the
    /// bound email is a no-op success; rebinding is rejected.
    #[instrument(name = "invite.resolve_by_token", skip(pool, raw_token, email))]
    pub async fn resolve_by_token(
        pool: &SqlitePool,
        raw_token: &str,
        email: &str,
    ) -> Result<ResolvedInvite, TenancyError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(TenancyError::Validation(
                "a valid email address is required".to_string(),
            ));
        }

        let token_hash = utils::tokens::hash_token(raw_token.trim());
        let invite = InviteRepository::find_by_token_hash(pool, &token_hash)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;

        let now = Utc::now();
        if let Some(status) = Self::settle_non_pending(pool, &invite, now).await? {
            return Err(TenancyError::InviteNoLongerPending { status });
        }

        let mut tx = pool.begin().await?;
        match invite.email.as_deref() {
            None => {
                if InviteRepository::bind_email(&mut *tx, invite.id, &email).await? == 0 {
                    // Raced with another resolution; re-read to decide.
                    let current = InviteRepository::find_by_id(&mut *tx, invite.id)
                        .await?
                        .ok_or(TenancyError::NotFound("invite"))?;
                    match current.email.as_deref() {
                        Some(bound) if bound == email => {}
                        _ => return Err(TenancyError::Conflict),
                    }
                } else {
                    EmployeeRepository::bind_email(&mut *tx, invite.employee_id, &email).await?;
                }
            }
            Some(bound) if bound == email => {}
            Some(_) => {
                return Err(TenancyError::Validation(
                    "invite is bound to a different email".to_string(),
                ));
            }
        }

        if let Some(user) = UserRepository::find_by_email(&mut *tx, &email).await? {
            NotificationRepository::create_for_invite(
                &mut *tx,
                user.id,
                invite.id,
                invite.company_id,
            )
            .await?;
        }

        let invite = InviteRepository::find_by_id(&mut *tx, invite.id)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;
        let company = CompanyRepository::find_by_id(&mut *tx, invite.company_id)
            .await?
            .ok_or(TenancyError::Database(sqlx::Error::RowNotFound))?;
        tx.commit().await?;

        Ok(ResolvedInvite { invite, company })
    }

    /// Accept a pending invite. The invite flip, membership grant,
    /// employee link and notification read commit atomically, or none do.
    /// Unlike revoke, acceptance of a non-pending invite is always a
    /// rejection: its side effects must not double-apply.
    #[instrument(
        name = "invite.accept",
        skip(pool),
        fields(user_id = %principal.id, invite_id = %invite_id)
    )]
    pub async fn accept(
        pool: &SqlitePool,
        principal: &Principal,
        invite_id: Uuid,
    ) -> Result<AcceptOutcome, TenancyError> {
        let invite = InviteRepository::find_by_id(pool, invite_id)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;

        let now = Utc::now();
        if let Some(status) = Self::settle_non_pending(pool, &invite, now).await? {
            return Err(TenancyError::InviteNoLongerPending { status });
        }

        match invite.email.as_deref() {
            Some(bound) if bound == normalize_email(&principal.email) => {}
            // Unbound or bound to someone else: this principal may not
            // accept, whoever they are.
            _ => return Err(TenancyError::Forbidden),
        }

        let mut tx = pool.begin().await?;
        if InviteRepository::mark_accepted(&mut *tx, invite_id).await? == 0 {
            // Lost the race between the pool read and this write; the
            // transition that beat us decides the report.
            let current = InviteRepository::find_by_id(&mut *tx, invite_id)
                .await?
                .ok_or(TenancyError::NotFound("invite"))?;
            return if current.status.is_terminal() {
                Err(TenancyError::InviteNoLongerPending {
                    status: current.status,
                })
            } else {
                Err(TenancyError::Conflict)
            };
        }

        let membership = db::memberships::MembershipRepository::upsert_active(
            &mut *tx,
            principal.id,
            invite.company_id,
            invite.role,
        )
        .await?;
        EmployeeRepository::link_user(&mut *tx, invite.employee_id, principal.id).await?;
        NotificationRepository::mark_read_for_invite(&mut *tx, invite_id, principal.id).await?;

        let invite = InviteRepository::find_by_id(&mut *tx, invite_id)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;
        tx.commit().await?;

        Ok(AcceptOutcome { invite, membership })
    }

    /// Revoke a pending invite (admin/owner). An already revoked invite
    /// converges as a no-op success; an expired one presents as no longer
    /// pending (persisting the expiry first); an accepted one rejects.
    #[instrument(
        name = "invite.revoke",
        skip(pool),
        fields(user_id = %principal.id, invite_id = %invite_id)
    )]
    pub async fn revoke(
        pool: &SqlitePool,
        principal: &Principal,
        invite_id: Uuid,
    ) -> Result<InviteStatus, TenancyError> {
        let invite = InviteRepository::find_by_id(pool, invite_id)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;
        ContextService::require_manage_role(pool, principal, invite.company_id).await?;

        let mut tx = pool.begin().await?;
        let status = Self::apply_revoke(&mut tx, invite_id, Utc::now()).await?;
        // Commit before reporting: a lazily persisted expiry must survive
        // even though the revoke itself is then rejected.
        tx.commit().await?;
        match status {
            InviteStatus::Revoked => Ok(InviteStatus::Revoked),
            status => Err(TenancyError::InviteNoLongerPending { status }),
        }
    }

    /// The revoke transition proper, inside the caller's transaction so it
    /// can be composed with notification bookkeeping (decline path).
    ///
    /// Returns the settled status: `Revoked` covers both a fresh
    /// transition and the idempotent repeat; `Expired` means the deadline
    /// won and the expiry write is sitting in the transaction, so callers
    /// must commit before turning it into a rejection. Accepted rejects
    /// outright.
    pub(crate) async fn apply_revoke(
        tx: &mut Transaction<'_, Sqlite>,
        invite_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<InviteStatus, TenancyError> {
        let invite = InviteRepository::find_by_id(&mut **tx, invite_id)
            .await?
            .ok_or(TenancyError::NotFound("invite"))?;

        match invite.status {
            InviteStatus::Pending if invite.expires_at <= now => {
                // Deadline passed: persist expiry instead of revoking, so
                // the stored state matches what every reader would derive.
                if InviteRepository::expire_if_due(&mut **tx, invite_id, now).await? == 1 {
                    EmployeeRepository::set_invitation_status(
                        &mut **tx,
                        invite.employee_id,
                        InviteStatus::Expired,
                    )
                    .await?;
                }
                Ok(InviteStatus::Expired)
            }
            InviteStatus::Pending => {
                if InviteRepository::mark_revoked(&mut **tx, invite_id).await? == 1 {
                    EmployeeRepository::set_invitation_status(
                        &mut **tx,
                        invite.employee_id,
                        InviteStatus::Revoked,
                    )
                    .await?;
                    return Ok(InviteStatus::Revoked);
                }
                let current = InviteRepository::find_by_id(&mut **tx, invite_id)
                    .await?
                    .ok_or(TenancyError::NotFound("invite"))?;
                match current.status {
                    InviteStatus::Accepted => Err(TenancyError::InvalidTransition(
                        "cannot revoke an accepted invite",
                    )),
                    InviteStatus::Pending => Err(TenancyError::Conflict),
                    status => Ok(status),
                }
            }
            InviteStatus::Revoked => Ok(InviteStatus::Revoked),
            InviteStatus::Expired => Ok(InviteStatus::Expired),
            InviteStatus::Accepted => Err(TenancyError::InvalidTransition(
                "cannot revoke an accepted invite",
            )),
        }
    }

    /// Lazy-expiry gate used by read-then-act paths: if the invite is
    /// past its deadline the expired status is persisted (with employee
    /// mirror) before the caller's action is rejected. Returns the
    /// effective terminal status, or None when still actionable.
    async fn settle_non_pending(
        pool: &SqlitePool,
        invite: &Invite,
        now: DateTime<Utc>,
    ) -> Result<Option<InviteStatus>, TenancyError> {
        match invite.status {
            InviteStatus::Pending if invite.expires_at <= now => {
                let mut tx = pool.begin().await?;
                if InviteRepository::expire_if_due(&mut *tx, invite.id, now).await? == 1 {
                    EmployeeRepository::set_invitation_status(
                        &mut *tx,
                        invite.employee_id,
                        InviteStatus::Expired,
                    )
                    .await?;
                    tx.commit().await?;
                    return Ok(Some(InviteStatus::Expired));
                }
                drop(tx);
                // Another writer settled it first; report what it chose.
                let current = InviteRepository::find_by_id(pool, invite.id)
                    .await?
                    .ok_or(TenancyError::NotFound("invite"))?;
                Ok(Some(current.status))
            }
            InviteStatus::Pending => Ok(None),
            status => Ok(Some(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;
    use api_types::MembershipStatus;
    use db::memberships::MembershipRepository;

    #[tokio::test]
    async fn full_lifecycle_bind_then_accept() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee =
            test_support::seed_employee(&db.pool, company.id, "Jo Technician", None).await;

        let (invite, token) = InviteService::create_invite(
            &db.pool,
            &owner,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(72),
        )
        .await
        .unwrap();
        assert_eq!(invite.status, InviteStatus::Pending);
        assert!(invite.email.is_none());
        assert_ne!(invite.token_hash, token);

        // Token resolution binds the email to invite and employee.
        let resolved = InviteService::resolve_by_token(&db.pool, &token, "A@x.com")
            .await
            .unwrap();
        assert_eq!(resolved.invite.email.as_deref(), Some("a@x.com"));
        assert_eq!(resolved.company.id, company.id);
        let employee_row = db::employees::EmployeeRepository::find_by_id(&db.pool, employee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee_row.email.as_deref(), Some("a@x.com"));

        // Re-submitting the bound email is a no-op success; rebinding is not.
        InviteService::resolve_by_token(&db.pool, &token, "a@x.com")
            .await
            .unwrap();
        let err = InviteService::resolve_by_token(&db.pool, &token, "b@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Validation(_)));

        // Acceptance by the matching principal applies all effects.
        let invitee = test_support::seed_user(&db.pool, "a@x.com").await;
        let outcome = InviteService::accept(&db.pool, &invitee, invite.id)
            .await
            .unwrap();
        assert_eq!(outcome.invite.status, InviteStatus::Accepted);
        assert_eq!(outcome.membership.role, MemberRole::Member);
        assert_eq!(outcome.membership.status, MembershipStatus::Active);

        let employee_row = db::employees::EmployeeRepository::find_by_id(&db.pool, employee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee_row.user_id, Some(invitee.id));
        assert_eq!(employee_row.invitation_status, Some(InviteStatus::Accepted));
    }

    #[tokio::test]
    async fn accept_requires_matching_identity() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner2@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Sam Dispatcher",
            Some("sam@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        let stranger = test_support::seed_user(&db.pool, "stranger@x.com").await;
        let err = InviteService::accept(&db.pool, &stranger, invite.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden));

        // Nothing changed under the failed accept.
        assert!(
            MembershipRepository::find(&db.pool, stranger.id, company.id)
                .await
                .unwrap()
                .is_none()
        );
        let row = InviteRepository::find_by_id(&db.pool, invite.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, InviteStatus::Pending);
    }

    #[tokio::test]
    async fn concurrent_accepts_produce_one_winner() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner3@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Pat Installer",
            Some("pat@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;
        let invitee = test_support::seed_user(&db.pool, "pat@x.com").await;

        let (a, b) = tokio::join!(
            InviteService::accept(&db.pool, &invitee, invite.id),
            InviteService::accept(&db.pool, &invitee, invite.id),
        );
        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser.unwrap_err(),
            TenancyError::InviteNoLongerPending { .. } | TenancyError::Conflict
        ));

        // Exactly one membership row exists for the pair.
        let memberships = MembershipRepository::list_active_by_user(&db.pool, invitee.id)
            .await
            .unwrap();
        assert_eq!(memberships.len(), 1);
    }

    #[tokio::test]
    async fn expired_invite_is_settled_on_read_and_rejects_actions() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner4@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Lee Electrician",
            Some("lee@x.com"),
        )
        .await;

        let (invite, token) = InviteService::create_invite(
            &db.pool,
            &owner,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(-1),
        )
        .await
        .unwrap();

        let invitee = test_support::seed_user(&db.pool, "lee@x.com").await;
        let err = InviteService::accept(&db.pool, &invitee, invite.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TenancyError::InviteNoLongerPending {
                status: InviteStatus::Expired
            }
        ));

        // The write path persisted the terminal state for later readers.
        let row = InviteRepository::find_by_id(&db.pool, invite.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, InviteStatus::Expired);
        let employee_row = db::employees::EmployeeRepository::find_by_id(&db.pool, employee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee_row.invitation_status, Some(InviteStatus::Expired));

        let err = InviteService::resolve_by_token(&db.pool, &token, "lee@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::InviteNoLongerPending { .. }));

        // Revocation of an expired invite presents the same way.
        let err = InviteService::revoke(&db.pool, &owner, invite.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TenancyError::InviteNoLongerPending {
                status: InviteStatus::Expired
            }
        ));
    }

    #[tokio::test]
    async fn revoke_converges_and_accept_rejects_after_terminal() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner5@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Ira Plumber",
            Some("ira@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        assert_eq!(
            InviteService::revoke(&db.pool, &owner, invite.id)
                .await
                .unwrap(),
            InviteStatus::Revoked
        );
        // Second revoke is a safe no-op returning the current state.
        assert_eq!(
            InviteService::revoke(&db.pool, &owner, invite.id)
                .await
                .unwrap(),
            InviteStatus::Revoked
        );

        let invitee = test_support::seed_user(&db.pool, "ira@x.com").await;
        let err = InviteService::accept(&db.pool, &invitee, invite.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TenancyError::InviteNoLongerPending {
                status: InviteStatus::Revoked
            }
        ));

        let employee_row = db::employees::EmployeeRepository::find_by_id(&db.pool, employee.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(employee_row.invitation_status, Some(InviteStatus::Revoked));
    }

    #[tokio::test]
    async fn revoking_an_accepted_invite_is_rejected() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner6@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Max Roofer",
            Some("max@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        let invitee = test_support::seed_user(&db.pool, "max@x.com").await;
        InviteService::accept(&db.pool, &invitee, invite.id)
            .await
            .unwrap();

        let err = InviteService::revoke(&db.pool, &owner, invite.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn create_requires_manage_role_and_unlinked_employee() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner7@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Kim Locksmith",
            Some("kim@x.com"),
        )
        .await;

        // A plain member of the company cannot issue invites.
        let member = test_support::seed_user(&db.pool, "member@example.com").await;
        MembershipRepository::create(&db.pool, member.id, company.id, MemberRole::Member)
            .await
            .unwrap();
        let err = InviteService::create_invite(
            &db.pool,
            &member,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(72),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden));

        // Second pending invite for the same employee is rejected.
        test_support::invite_employee(&db.pool, &owner, &company, &employee).await;
        let err = InviteService::create_invite(
            &db.pool,
            &owner,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(72),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TenancyError::Validation(_)));
    }

    #[tokio::test]
    async fn accept_reactivates_a_removed_membership() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner8@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;

        // Previously removed member gets re-invited.
        let returning = test_support::seed_user(&db.pool, "back@x.com").await;
        MembershipRepository::create(&db.pool, returning.id, company.id, MemberRole::Member)
            .await
            .unwrap();
        MembershipRepository::remove(&db.pool, returning.id, company.id)
            .await
            .unwrap();

        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Back Again",
            Some("back@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;
        let outcome = InviteService::accept(&db.pool, &returning, invite.id)
            .await
            .unwrap();

        assert_eq!(outcome.membership.status, MembershipStatus::Active);
        let all = MembershipRepository::list_active_by_user(&db.pool, returning.id)
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn unknown_token_is_not_found() {
        let db = test_support::db().await;
        let err = InviteService::resolve_by_token(&db.pool, "not-a-real-token", "x@x.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::NotFound(_)));
    }
}
