use api_types::Principal;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use db::users::UserRepository;
use services::services::TenancyError;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// Identity headers injected by the identity-aware proxy in front of this
/// service. Credential validation happens there; this layer only consumes
/// the result.
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";
pub const PRINCIPAL_EMAIL_HEADER: &str = "x-principal-email";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
}

fn principal_from_headers(headers: &HeaderMap) -> Option<Principal> {
    let id = headers
        .get(PRINCIPAL_ID_HEADER)?
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v).ok())?;
    let email = headers
        .get(PRINCIPAL_EMAIL_HEADER)?
        .to_str()
        .ok()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| v.contains('@'))?;
    Some(Principal { id, email })
}

/// Reject unauthenticated requests and mirror the principal into the
/// local `users` projection so email-based lookups (invite notifications)
/// can resolve it.
pub async fn require_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(principal) = principal_from_headers(request.headers()) else {
        return ApiError::Tenancy(TenancyError::Unauthenticated).into_response();
    };

    if let Err(error) =
        UserRepository::upsert_principal(state.pool(), principal.id, &principal.email).await
    {
        tracing::error!(?error, "failed to mirror principal");
        return ApiError::Tenancy(TenancyError::Database(match error {
            db::users::UserError::Database(e) => e,
        }))
        .into_response();
    }

    request
        .extensions_mut()
        .insert(RequestContext { principal });
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn parses_well_formed_identity_headers() {
        let mut headers = HeaderMap::new();
        let id = Uuid::new_v4();
        headers.insert(PRINCIPAL_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        headers.insert(
            PRINCIPAL_EMAIL_HEADER,
            HeaderValue::from_static("  Tech@Example.COM "),
        );

        let principal = principal_from_headers(&headers).unwrap();
        assert_eq!(principal.id, id);
        assert_eq!(principal.email, "tech@example.com");
    }

    #[test]
    fn missing_or_malformed_headers_yield_no_principal() {
        assert!(principal_from_headers(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(PRINCIPAL_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        headers.insert(PRINCIPAL_EMAIL_HEADER, HeaderValue::from_static("a@x.com"));
        assert!(principal_from_headers(&headers).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(
            PRINCIPAL_ID_HEADER,
            HeaderValue::from_str(&Uuid::new_v4().to_string()).unwrap(),
        );
        headers.insert(PRINCIPAL_EMAIL_HEADER, HeaderValue::from_static("no-at-sign"));
        assert!(principal_from_headers(&headers).is_none());
    }
}
