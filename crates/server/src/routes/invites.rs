use api_types::{
    AcceptInviteResponse, CreateInviteRequest, CreateInviteResponse, ListInvitesResponse,
    ResolveInviteRequest, ResolveInviteResponse, RevokeInviteResponse,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::{companies::CompanyRepository, invites::InviteRepository};
use services::services::{ContextService, InviteService, TenancyError};
use tracing::instrument;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, RequestContext, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/companies/{company_id}/invites",
            get(list_invites).post(create_invite),
        )
        .route(
            "/companies/{company_id}/invites/{invite_id}/revoke",
            post(revoke_invite),
        )
        .route("/invites/{invite_id}/accept", post(accept_invite))
}

/// Token resolution is the one surface reachable before authentication:
/// the token itself is the credential.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/invites/resolve", post(resolve_invite))
}

#[instrument(
    name = "invites.create",
    skip(state, ctx, payload),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn create_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<CreateInviteRequest>,
) -> Result<ResponseJson<ApiResponse<CreateInviteResponse>>, ApiError> {
    let (invite, token) = InviteService::create_invite(
        state.pool(),
        &ctx.principal,
        company_id,
        payload.employee_id,
        payload.role,
        state.config().invite_ttl,
    )
    .await?;

    let company = CompanyRepository::find_by_id(state.pool(), company_id)
        .await
        .map_err(TenancyError::from)?
        .ok_or(TenancyError::NotFound("company"))?;
    if let Err(error) = state
        .mailer()
        .send_invite(invite.email.as_deref(), &company.name, &token)
        .await
    {
        // Delivery is best-effort; the token is still returned once below.
        tracing::warn!(?error, invite_id = %invite.id, "invite delivery failed");
    }

    Ok(ResponseJson(ApiResponse::success(CreateInviteResponse {
        invite,
        token,
    })))
}

#[instrument(
    name = "invites.list",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn list_invites(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ListInvitesResponse>>, ApiError> {
    ContextService::require_manage_role(state.pool(), &ctx.principal, company_id).await?;
    let invites = InviteRepository::list_pending_by_company(state.pool(), company_id).await?;
    Ok(ResponseJson(ApiResponse::success(ListInvitesResponse {
        invites,
    })))
}

#[instrument(
    name = "invites.revoke",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, invite_id = %invite_id)
)]
async fn revoke_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((company_id, invite_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<RevokeInviteResponse>>, ApiError> {
    // An invite is only addressable under the company that issued it.
    InviteRepository::find_by_id(state.pool(), invite_id)
        .await?
        .filter(|invite| invite.company_id == company_id)
        .ok_or(TenancyError::NotFound("invite"))?;

    let status = InviteService::revoke(state.pool(), &ctx.principal, invite_id).await?;
    Ok(ResponseJson(ApiResponse::success(RevokeInviteResponse {
        status,
    })))
}

#[instrument(name = "invites.resolve", skip(state, payload))]
async fn resolve_invite(
    State(state): State<AppState>,
    Json(payload): Json<ResolveInviteRequest>,
) -> Result<ResponseJson<ApiResponse<ResolveInviteResponse>>, ApiError> {
    let resolved =
        InviteService::resolve_by_token(state.pool(), &payload.token, &payload.email).await?;
    Ok(ResponseJson(ApiResponse::success(ResolveInviteResponse {
        invite_id: resolved.invite.id,
        company_id: resolved.company.id,
        company_name: resolved.company.name,
        role: resolved.invite.role,
        expires_at: resolved.invite.expires_at,
    })))
}

#[instrument(
    name = "invites.accept",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, invite_id = %invite_id)
)]
async fn accept_invite(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(invite_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AcceptInviteResponse>>, ApiError> {
    let outcome = InviteService::accept(state.pool(), &ctx.principal, invite_id).await?;
    Ok(ResponseJson(ApiResponse::success(AcceptInviteResponse {
        company_id: outcome.membership.company_id,
        role: outcome.membership.role,
    })))
}
