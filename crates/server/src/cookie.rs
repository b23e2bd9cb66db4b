use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Sticky hint: the company last explicitly selected. Disambiguates only;
/// authorization always re-checks memberships.
pub const ACTIVE_COMPANY_COOKIE: &str = "active_company";

fn sign(key: &[u8], payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).unwrap();
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Signed, httpOnly, path-scoped cookie naming the selected company.
/// Written only on explicit selection; no expiry of its own.
pub fn sticky_cookie(key: &[u8], company_id: Uuid) -> Cookie<'static> {
    let payload = company_id.to_string();
    let value = format!("{payload}.{}", sign(key, &payload));
    Cookie::build((ACTIVE_COMPANY_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/api")
        .build()
}

/// Verify and decode a sticky cookie value. Tampered or malformed values
/// count as absent; the selector then falls back to its ambiguity rules.
pub fn verify_sticky(key: &[u8], value: &str) -> Option<Uuid> {
    let (payload, signature) = value.split_once('.')?;
    let expected = sign(key, payload);
    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Uuid::parse_str(payload).ok()
    } else {
        None
    }
}

pub fn sticky_hint(jar: &CookieJar, key: &[u8]) -> Option<Uuid> {
    jar.get(ACTIVE_COMPANY_COOKIE)
        .and_then(|cookie| verify_sticky(key, cookie.value()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_verifies() {
        let key = [42u8; 32];
        let company_id = Uuid::new_v4();
        let cookie = sticky_cookie(&key, company_id);
        assert_eq!(verify_sticky(&key, cookie.value()), Some(company_id));
        assert!(cookie.http_only().unwrap_or(false));
        assert_eq!(cookie.path(), Some("/api"));
    }

    #[test]
    fn tampered_value_or_wrong_key_is_rejected() {
        let key = [42u8; 32];
        let company_id = Uuid::new_v4();
        let cookie = sticky_cookie(&key, company_id);

        let other_id = Uuid::new_v4();
        let forged = format!(
            "{other_id}.{}",
            cookie.value().split_once('.').unwrap().1
        );
        assert_eq!(verify_sticky(&key, &forged), None);
        assert_eq!(verify_sticky(&[1u8; 32], cookie.value()), None);
        assert_eq!(verify_sticky(&key, "garbage"), None);
    }
}
