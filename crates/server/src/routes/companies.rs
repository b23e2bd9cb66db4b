use api_types::{
    ActiveContextResponse, CompanyWithRole, CreateCompanyRequest, CreateCompanyResponse,
    CreateEmployeeRequest, ListCompaniesResponse, ListEmployeesResponse, ListMembersResponse,
    SelectCompanyResponse, UpdateMemberRoleRequest, UpdateMemberRoleResponse,
};
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use db::employees::EmployeeRepository;
use services::services::{CompanyService, ContextService, TenancyError};
use tracing::instrument;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, RequestContext, cookie, error::ApiError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route("/companies/active", get(active_context))
        .route("/companies/{company_id}/select", post(select_company))
        .route(
            "/companies/{company_id}/employees",
            get(list_employees).post(create_employee),
        )
        .route("/companies/{company_id}/members", get(list_members))
        .route(
            "/companies/{company_id}/members/{user_id}/role",
            post(update_member_role),
        )
        .route(
            "/companies/{company_id}/members/{user_id}/remove",
            post(remove_member),
        )
}

#[instrument(name = "companies.list", skip(state, ctx), fields(user_id = %ctx.principal.id))]
async fn list_companies(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<ResponseJson<ApiResponse<ListCompaniesResponse>>, ApiError> {
    let companies = ContextService::list_companies(state.pool(), &ctx.principal).await?;
    Ok(ResponseJson(ApiResponse::success(ListCompaniesResponse {
        companies,
    })))
}

#[instrument(name = "companies.create", skip(state, ctx, payload), fields(user_id = %ctx.principal.id))]
async fn create_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<ResponseJson<ApiResponse<CreateCompanyResponse>>, ApiError> {
    let (company, membership) =
        CompanyService::register(state.pool(), &ctx.principal, &payload.name).await?;
    Ok(ResponseJson(ApiResponse::success(CreateCompanyResponse {
        company: CompanyWithRole {
            id: company.id,
            name: company.name,
            created_at: company.created_at,
            updated_at: company.updated_at,
            user_role: membership.role,
        },
    })))
}

/// Resolve the company this request is scoped to, from memberships plus
/// the sticky cookie. Ambiguity is a 403, never a guess.
#[instrument(name = "companies.active_context", skip(state, ctx, jar), fields(user_id = %ctx.principal.id))]
async fn active_context(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
) -> Result<ResponseJson<ApiResponse<ActiveContextResponse>>, ApiError> {
    let hint = cookie::sticky_hint(&jar, &state.config().cookie_key());
    let context = ContextService::require_context(state.pool(), &ctx.principal, hint).await?;
    Ok(ResponseJson(ApiResponse::success(ActiveContextResponse {
        context,
    })))
}

/// Explicit company selection: the only place the sticky cookie is
/// written.
#[instrument(
    name = "companies.select",
    skip(state, ctx, jar),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn select_company(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<SelectCompanyResponse>>), ApiError> {
    let context = ContextService::select_company(state.pool(), &ctx.principal, company_id).await?;
    let jar = jar.add(cookie::sticky_cookie(
        &state.config().cookie_key(),
        context.company_id,
    ));
    Ok((
        jar,
        ResponseJson(ApiResponse::success(SelectCompanyResponse { context })),
    ))
}

#[instrument(
    name = "members.list",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn list_members(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ListMembersResponse>>, ApiError> {
    let members = CompanyService::list_members(state.pool(), &ctx.principal, company_id).await?;
    Ok(ResponseJson(ApiResponse::success(ListMembersResponse {
        members,
    })))
}

#[instrument(
    name = "members.update_role",
    skip(state, ctx, payload),
    fields(user_id = %ctx.principal.id, company_id = %company_id, member_user_id = %user_id)
)]
async fn update_member_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((company_id, user_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMemberRoleRequest>,
) -> Result<ResponseJson<ApiResponse<UpdateMemberRoleResponse>>, ApiError> {
    let membership = CompanyService::update_member_role(
        state.pool(),
        &ctx.principal,
        company_id,
        user_id,
        payload.role,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(
        UpdateMemberRoleResponse {
            user_id: membership.user_id,
            role: membership.role,
        },
    )))
}

#[instrument(
    name = "members.remove",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, company_id = %company_id, member_user_id = %user_id)
)]
async fn remove_member(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((company_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    CompanyService::remove_member(state.pool(), &ctx.principal, company_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

#[instrument(
    name = "employees.list",
    skip(state, ctx),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn list_employees(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<ListEmployeesResponse>>, ApiError> {
    ContextService::require_membership(state.pool(), &ctx.principal, company_id).await?;
    let employees = EmployeeRepository::list_by_company(state.pool(), company_id).await?;
    Ok(ResponseJson(ApiResponse::success(ListEmployeesResponse {
        employees,
    })))
}

#[instrument(
    name = "employees.create",
    skip(state, ctx, payload),
    fields(user_id = %ctx.principal.id, company_id = %company_id)
)]
async fn create_employee(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<ResponseJson<ApiResponse<api_types::Employee>>, ApiError> {
    ContextService::require_manage_role(state.pool(), &ctx.principal, company_id).await?;

    let display_name = payload.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError::Tenancy(TenancyError::Validation(
            "employee display name cannot be blank".to_string(),
        )));
    }
    let email = payload
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let employee = EmployeeRepository::create(
        state.pool(),
        company_id,
        display_name,
        email.as_deref(),
        payload.role,
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(employee)))
}
