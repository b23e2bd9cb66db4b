use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::TenancyError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Tenancy(#[from] TenancyError),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<db::employees::EmployeeError> for ApiError {
    fn from(err: db::employees::EmployeeError) -> Self {
        ApiError::Tenancy(err.into())
    }
}

impl From<db::invites::InviteError> for ApiError {
    fn from(err: db::invites::InviteError) -> Self {
        ApiError::Tenancy(err.into())
    }
}

pub(crate) fn status_for(error: &TenancyError) -> StatusCode {
    match error {
        TenancyError::Unauthenticated => StatusCode::UNAUTHORIZED,
        TenancyError::NoActiveContext | TenancyError::Forbidden => StatusCode::FORBIDDEN,
        TenancyError::NotFound(_) => StatusCode::NOT_FOUND,
        TenancyError::Validation(_) => StatusCode::BAD_REQUEST,
        // Terminal-invite conditions present as "no longer available".
        TenancyError::InviteNoLongerPending { .. } | TenancyError::InvalidTransition(_) => {
            StatusCode::GONE
        }
        TenancyError::Conflict => StatusCode::CONFLICT,
        TenancyError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Tenancy(error) => {
                let status = status_for(error);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(?error, "request failed on a store error");
                    (
                        status,
                        "An internal error occurred. Please try again.".to_string(),
                    )
                } else {
                    (status, error.to_string())
                }
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        };

        (status, Json(ApiResponse::<()>::error(&message))).into_response()
    }
}
