use api_types::{
    DeclineInviteResponse, ListInboxResponse, UnreadCountResponse, UserNotification,
};
use axum::{
    Extension, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use services::services::NotificationService;
use tracing::instrument;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, RequestContext, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_inbox))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/{notification_id}/read", post(mark_read))
        .route("/notifications/{notification_id}/decline", post(decline))
}

#[instrument(name = "notifications.list", skip(state, ctx), fields(user_id = %ctx.principal.id))]
async fn list_inbox(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<ResponseJson<ApiResponse<ListInboxResponse>>, ApiError> {
    let items = NotificationService::list_inbox(state.pool(), &ctx.principal).await?;
    Ok(ResponseJson(ApiResponse::success(ListInboxResponse {
        items,
    })))
}

#[instrument(name = "notifications.unread_count", skip(state, ctx), fields(user_id = %ctx.principal.id))]
async fn unread_count(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<ResponseJson<ApiResponse<UnreadCountResponse>>, ApiError> {
    let unread = NotificationService::unread_count(state.pool(), &ctx.principal).await?;
    Ok(ResponseJson(ApiResponse::success(UnreadCountResponse {
        unread,
    })))
}

#[instrument(
    name = "notifications.mark_read",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, notification_id = %notification_id)
)]
async fn mark_read(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<UserNotification>>, ApiError> {
    let notification =
        NotificationService::mark_read(state.pool(), &ctx.principal, notification_id).await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

#[instrument(
    name = "notifications.decline",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, notification_id = %notification_id)
)]
async fn decline(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<DeclineInviteResponse>>, ApiError> {
    let status =
        NotificationService::decline_by_notification(state.pool(), &ctx.principal, notification_id)
            .await?;
    Ok(ResponseJson(ApiResponse::success(DeclineInviteResponse {
        status,
    })))
}
