use api_types::{InboxItem, InviteStatus, Principal, UserNotification};
use chrono::Utc;
use db::{
    companies::CompanyRepository, employees::EmployeeRepository, invites::InviteRepository,
    notifications::NotificationRepository,
};
use sqlx::SqlitePool;
use tracing::instrument;
use uuid::Uuid;

use super::{error::TenancyError, invite::InviteService};

pub struct NotificationService;

impl NotificationService {
    /// The actionable inbox: the principal's notifications, newest first,
    /// filtered to invites that are still pending after lazy-expiry
    /// evaluation. The inbox is a view over live invite state, never a
    /// snapshot. Notification rows for settled invites persist but are
    /// not actionable and are not returned.
    #[instrument(name = "notification.list_inbox", skip(pool), fields(user_id = %principal.id))]
    pub async fn list_inbox(
        pool: &SqlitePool,
        principal: &Principal,
    ) -> Result<Vec<InboxItem>, TenancyError> {
        let notifications = NotificationRepository::list_by_user(pool, principal.id).await?;
        let now = Utc::now();

        let mut items = Vec::new();
        for notification in notifications {
            // An invite row missing for a delivered notification is
            // corruption, not something to silently drop.
            let invite = InviteRepository::find_by_id(pool, notification.invite_id)
                .await?
                .ok_or(TenancyError::Database(sqlx::Error::RowNotFound))?;

            let status = if invite.status == InviteStatus::Pending && invite.expires_at <= now {
                let mut tx = pool.begin().await?;
                if InviteRepository::expire_if_due(&mut *tx, invite.id, now).await? == 1 {
                    EmployeeRepository::set_invitation_status(
                        &mut *tx,
                        invite.employee_id,
                        InviteStatus::Expired,
                    )
                    .await?;
                }
                tx.commit().await?;
                InviteStatus::Expired
            } else {
                invite.status
            };

            if status != InviteStatus::Pending {
                continue;
            }

            let company = CompanyRepository::find_by_id(pool, invite.company_id)
                .await?
                .ok_or(TenancyError::Database(sqlx::Error::RowNotFound))?;
            items.push(InboxItem {
                notification,
                invite_status: status,
                company_name: company.name,
            });
        }

        Ok(items)
    }

    pub async fn unread_count(
        pool: &SqlitePool,
        principal: &Principal,
    ) -> Result<i64, TenancyError> {
        let items = Self::list_inbox(pool, principal).await?;
        Ok(items
            .iter()
            .filter(|item| item.notification.read_at.is_none())
            .count() as i64)
    }

    /// Mark one of the principal's own notifications read. Foreign
    /// notifications are indistinguishable from absent ones. Already-read
    /// rows are a no-op.
    #[instrument(name = "notification.mark_read", skip(pool), fields(user_id = %principal.id))]
    pub async fn mark_read(
        pool: &SqlitePool,
        principal: &Principal,
        notification_id: Uuid,
    ) -> Result<UserNotification, TenancyError> {
        let notification = Self::owned_notification(pool, principal, notification_id).await?;
        NotificationRepository::mark_read(pool, notification.id).await?;
        NotificationRepository::find_by_id(pool, notification.id)
            .await?
            .ok_or(TenancyError::NotFound("notification"))
    }

    /// Decline the invite behind a notification: ownership check, the
    /// revoke transition, and mark-read compose into one logical unit.
    /// An already revoked invite converges as a no-op success that still
    /// dismisses the notification; an expired one presents as no longer
    /// pending.
    #[instrument(name = "notification.decline", skip(pool), fields(user_id = %principal.id))]
    pub async fn decline_by_notification(
        pool: &SqlitePool,
        principal: &Principal,
        notification_id: Uuid,
    ) -> Result<InviteStatus, TenancyError> {
        let notification = Self::owned_notification(pool, principal, notification_id).await?;

        let mut tx = pool.begin().await?;
        let status = InviteService::apply_revoke(&mut tx, notification.invite_id, Utc::now())
            .await
            .map_err(|error| match error {
                // The notification exists, so its invite must: a missing
                // row here is store corruption, not a user-facing 404.
                TenancyError::NotFound(_) => TenancyError::Database(sqlx::Error::RowNotFound),
                other => other,
            })?;
        if status == InviteStatus::Revoked {
            NotificationRepository::mark_read(&mut *tx, notification.id).await?;
        }
        // Commit either way: a lazily persisted expiry must survive even
        // though the decline itself is then rejected.
        tx.commit().await?;

        match status {
            InviteStatus::Revoked => Ok(InviteStatus::Revoked),
            status => Err(TenancyError::InviteNoLongerPending { status }),
        }
    }

    async fn owned_notification(
        pool: &SqlitePool,
        principal: &Principal,
        notification_id: Uuid,
    ) -> Result<UserNotification, TenancyError> {
        NotificationRepository::find_by_id(pool, notification_id)
            .await?
            .filter(|n| n.user_id == principal.id)
            .ok_or(TenancyError::NotFound("notification"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support;
    use api_types::MemberRole;
    use chrono::Duration;
    use db::users::UserRepository;

    #[tokio::test]
    async fn inbox_lists_only_live_pending_invites() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "tech@x.com").await;

        // Known account at creation time: notification lands immediately.
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Tech One",
            Some("tech@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].notification.invite_id, invite.id);
        assert_eq!(items[0].invite_status, InviteStatus::Pending);
        assert_eq!(items[0].company_name, "Acme Field Co");
        assert_eq!(
            NotificationService::unread_count(&db.pool, &invitee)
                .await
                .unwrap(),
            1
        );

        // Revocation by the admin empties the actionable view even though
        // the notification row persists.
        crate::services::invite::InviteService::revoke(&db.pool, &owner, invite.id)
            .await
            .unwrap();
        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        assert!(items.is_empty());
        let rows = db::notifications::NotificationRepository::list_by_user(&db.pool, invitee.id)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn inbox_settles_expired_invites_on_read() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner2@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "late@x.com").await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Late Joiner",
            Some("late@x.com"),
        )
        .await;

        let (invite, _token) = crate::services::invite::InviteService::create_invite(
            &db.pool,
            &owner,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(-1),
        )
        .await
        .unwrap();

        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        assert!(items.is_empty());

        // The read path wrote the terminal state back.
        let row = db::invites::InviteRepository::find_by_id(&db.pool, invite.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, InviteStatus::Expired);
    }

    #[tokio::test]
    async fn notification_created_late_when_account_appears_at_resolution() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner3@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let employee =
            test_support::seed_employee(&db.pool, company.id, "No Email Yet", None).await;
        let (_invite, token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        // Account registers, then resolves the token with their email.
        let invitee = test_support::seed_user(&db.pool, "new@x.com").await;
        crate::services::invite::InviteService::resolve_by_token(&db.pool, &token, "new@x.com")
            .await
            .unwrap();

        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn mark_read_is_owner_only_and_idempotent() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner4@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "reader@x.com").await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Reader",
            Some("reader@x.com"),
        )
        .await;
        test_support::invite_employee(&db.pool, &owner, &company, &employee).await;

        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        let notification_id = items[0].notification.id;

        // Not the owner: indistinguishable from absent.
        let err = NotificationService::mark_read(&db.pool, &owner, notification_id)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::NotFound(_)));

        let read = NotificationService::mark_read(&db.pool, &invitee, notification_id)
            .await
            .unwrap();
        let first_read_at = read.read_at.unwrap();
        let again = NotificationService::mark_read(&db.pool, &invitee, notification_id)
            .await
            .unwrap();
        assert_eq!(again.read_at.unwrap(), first_read_at);
    }

    #[tokio::test]
    async fn decline_revokes_and_marks_read() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner5@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "decliner@x.com").await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Decliner",
            Some("decliner@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;

        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        let notification_id = items[0].notification.id;

        let status =
            NotificationService::decline_by_notification(&db.pool, &invitee, notification_id)
                .await
                .unwrap();
        assert_eq!(status, InviteStatus::Revoked);

        let row = db::notifications::NotificationRepository::find_by_id(&db.pool, notification_id)
            .await
            .unwrap()
            .unwrap();
        assert!(row.read_at.is_some());
        let invite_row = db::invites::InviteRepository::find_by_id(&db.pool, invite.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(invite_row.status, InviteStatus::Revoked);
    }

    #[tokio::test]
    async fn decline_after_admin_revoke_converges_as_no_op() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner6@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "racer@x.com").await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Racer",
            Some("racer@x.com"),
        )
        .await;
        let (invite, _token) = test_support::invite_employee(&db.pool, &owner, &company, &employee)
            .await;
        let items = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap();
        let notification_id = items[0].notification.id;

        // Admin revocation lands first; the decline that lost the race
        // still succeeds as terminal convergence and dismisses the item.
        crate::services::invite::InviteService::revoke(&db.pool, &owner, invite.id)
            .await
            .unwrap();
        let status =
            NotificationService::decline_by_notification(&db.pool, &invitee, notification_id)
                .await
                .unwrap();
        assert_eq!(status, InviteStatus::Revoked);
        let row = db::notifications::NotificationRepository::find_by_id(&db.pool, notification_id)
            .await
            .unwrap()
            .unwrap();
        assert!(row.read_at.is_some());
    }

    #[tokio::test]
    async fn declining_an_expired_invite_settles_it_and_rejects() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner8@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "slow@x.com").await;
        let employee = test_support::seed_employee(
            &db.pool,
            company.id,
            "Slow Responder",
            Some("slow@x.com"),
        )
        .await;
        let (invite, _token) = crate::services::invite::InviteService::create_invite(
            &db.pool,
            &owner,
            company.id,
            employee.id,
            MemberRole::Member,
            Duration::hours(-1),
        )
        .await
        .unwrap();

        // Read the notification id before the inbox read settles expiry.
        let rows = db::notifications::NotificationRepository::list_by_user(&db.pool, invitee.id)
            .await
            .unwrap();
        let notification_id = rows[0].id;

        let err =
            NotificationService::decline_by_notification(&db.pool, &invitee, notification_id)
                .await
                .unwrap_err();
        assert!(matches!(
            err,
            TenancyError::InviteNoLongerPending {
                status: InviteStatus::Expired
            }
        ));

        // The rejection persisted the terminal state.
        let row = db::invites::InviteRepository::find_by_id(&db.pool, invite.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, InviteStatus::Expired);
    }

    #[tokio::test]
    async fn dangling_invite_reference_is_a_store_failure() {
        let db = test_support::db().await;
        let owner = test_support::seed_user(&db.pool, "owner7@example.com").await;
        let company = test_support::seed_company(&db.pool, "Acme Field Co", &owner).await;
        let invitee = test_support::seed_user(&db.pool, "ghost@x.com").await;

        // Simulate the corruption the schema forbids by construction:
        // a delivered notification whose invite row is gone.
        db::notifications::NotificationRepository::create_for_invite(
            &db.pool,
            invitee.id,
            Uuid::new_v4(),
            company.id,
        )
        .await
        .unwrap();

        let err = NotificationService::list_inbox(&db.pool, &invitee)
            .await
            .unwrap_err();
        assert!(matches!(err, TenancyError::Database(_)));

        let user = UserRepository::find_by_id(&db.pool, invitee.id)
            .await
            .unwrap();
        assert!(user.is_some());
    }
}
