use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::CookieJar;
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::GuardError;

pub const DEFAULT_ADMIN_COOKIE: &str = "admin_token";

/// Proof that `require_admin` accepted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminGrant {
    _private: (),
}

// Only the digest of the secret is kept in memory
#[derive(Clone)]
struct SecretDigest([u8; 32]);

impl SecretDigest {
    fn of(value: &str) -> Self {
        Self(Sha256::digest(value.as_bytes()).into())
    }

    // Both sides are fixed-size digests, so neither content nor length leaks
    fn matches(&self, presented: &str) -> bool {
        let presented = Sha256::digest(presented.as_bytes());
        self.0.as_slice().ct_eq(presented.as_slice()).into()
    }
}

/// Shared-secret gate for admin-scoped routes.
///
/// Without a configured secret every request is refused with
/// [`GuardError::Misconfigured`]; there is no open fallback.
#[derive(Clone)]
pub struct AdminGuard {
    secret: Option<SecretDigest>,
    cookie_name: String,
}

impl fmt::Debug for AdminGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminGuard")
            .field("configured", &self.is_configured())
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

impl AdminGuard {
    // An empty secret counts as unset
    pub fn new(secret: Option<&str>, cookie_name: impl Into<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()).map(SecretDigest::of),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn require_admin(&self, headers: &HeaderMap) -> Result<AdminGrant, GuardError> {
        let Some(secret) = &self.secret else {
            return Err(GuardError::Misconfigured);
        };

        let Some(presented) = self.credential(headers) else {
            return Err(GuardError::Unauthorized);
        };

        if !secret.matches(&presented) {
            return Err(GuardError::Forbidden);
        }

        debug!("admin credential accepted");
        Ok(AdminGrant { _private: () })
    }

    // Bearer header first, then the httpOnly cookie. Blank values count as absent.
    fn credential(&self, headers: &HeaderMap) -> Option<String> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| {
                let (scheme, token) = value.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        bearer.or_else(|| {
            CookieJar::from_headers(headers)
                .get(&self.cookie_name)
                .map(|cookie| cookie.value().to_string())
                .filter(|value| !value.is_empty())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn guard(secret: Option<&str>) -> AdminGuard {
        AdminGuard::new(secret, DEFAULT_ADMIN_COOKIE)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    #[test]
    fn missing_credential_is_unauthorized() {
        let err = guard(Some("s3cret")).require_admin(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized));
    }

    #[test]
    fn wrong_credential_is_forbidden() {
        let err = guard(Some("s3cret")).require_admin(&bearer("nope")).unwrap_err();
        assert!(matches!(err, GuardError::Forbidden));
    }

    #[test]
    fn prefix_of_secret_is_forbidden() {
        let err = guard(Some("s3cret")).require_admin(&bearer("s3cre")).unwrap_err();
        assert!(matches!(err, GuardError::Forbidden));
    }

    #[test]
    fn correct_bearer_is_admitted() {
        assert!(guard(Some("s3cret")).require_admin(&bearer("s3cret")).is_ok());
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer s3cret"));
        assert!(guard(Some("s3cret")).require_admin(&headers).is_ok());
    }

    #[test]
    fn non_bearer_scheme_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic s3cret"));
        let err = guard(Some("s3cret")).require_admin(&headers).unwrap_err();
        assert!(matches!(err, GuardError::Unauthorized));
    }

    #[test]
    fn cookie_credential_is_admitted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_token=s3cret"),
        );
        assert!(guard(Some("s3cret")).require_admin(&headers).is_ok());
    }

    #[test]
    fn custom_cookie_name() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("ops_key=s3cret"));
        let guard = AdminGuard::new(Some("s3cret"), "ops_key");
        assert!(guard.require_admin(&headers).is_ok());
    }

    #[test]
    fn unset_secret_fails_closed() {
        let guard = guard(None);
        assert!(!guard.is_configured());

        let err = guard.require_admin(&bearer("anything")).unwrap_err();
        assert!(matches!(err, GuardError::Misconfigured));

        let err = guard.require_admin(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, GuardError::Misconfigured));
    }

    #[test]
    fn empty_secret_fails_closed_even_for_empty_credential() {
        let guard = guard(Some(""));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(header::COOKIE, HeaderValue::from_static("admin_token="));

        let err = guard.require_admin(&headers).unwrap_err();
        assert!(matches!(err, GuardError::Misconfigured));
    }

    #[test]
    fn debug_output_hides_secret() {
        let rendered = format!("{:?}", guard(Some("s3cret")));
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("configured: true"));
    }
}
