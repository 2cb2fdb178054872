//! Token issuing, verification, password hashing and the auth extractors.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use docket_core::{defaults, User, ROLE_ADMIN};

use crate::error::ApiError;
use crate::AppState;

const AUTHORIZATION_BEARER_PREFIX: &str = "Bearer ";

pub const MSG_TOKEN_MISSING: &str = "Akses ditolak. Token tidak ditemukan.";
pub const MSG_TOKEN_EXPIRED: &str = "Token sudah kadaluarsa. Silakan login kembali.";
pub const MSG_TOKEN_INVALID: &str = "Token tidak valid.";
pub const MSG_ADMIN_ONLY: &str = "Akses ditolak. Hanya admin yang diizinkan.";

/// Claims carried by every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Sign a token for `user` valid for `ttl_secs` from `now`.
pub fn issue_token(
    secret: &str,
    user: &User,
    ttl_secs: i64,
    now: DateTime<Utc>,
) -> Result<String, ApiError> {
    let iat = now.timestamp();
    let claims = Claims {
        user_id: user.id,
        role: user.role.clone(),
        iat,
        exp: iat + ttl_secs,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(docket_core::Error::Internal(format!("Token signing failed: {e}"))))
}

/// Verify signature and expiry of `token`.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    if token.len() > defaults::MAX_TOKEN_LENGTH {
        return Err(ApiError::unauthorized(MSG_TOKEN_INVALID));
    }

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::unauthorized(MSG_TOKEN_EXPIRED),
        _ => ApiError::unauthorized(MSG_TOKEN_INVALID),
    })
}

/// Token from the `Authorization` header. A bare token without the
/// `Bearer ` prefix is accepted as well.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = raw.strip_prefix(AUTHORIZATION_BEARER_PREFIX).unwrap_or(raw).trim();
    (!token.is_empty()).then_some(token)
}

/// Hash a password into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(docket_core::Error::Internal(format!("Password hashing failed: {e}"))))
}

/// Check `password` against a stored PHC string. Malformed hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// An authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized(MSG_TOKEN_MISSING))?;
        verify_token(&state.config.jwt_secret, token).map(AuthUser)
    }
}

/// An authenticated caller with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            tracing::warn!(
                subsystem = "api",
                component = "auth",
                user_id = claims.user_id,
                "Admin route denied"
            );
            return Err(ApiError::Forbidden(MSG_ADMIN_ONLY.to_string()));
        }
        Ok(AdminUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    fn user(role: &str) -> User {
        User {
            id: 7,
            username: "budi".to_string(),
            email: "budi@example.com".to_string(),
            password_hash: String::new(),
            role: role.to_string(),
            position: None,
            phone: None,
            office: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_then_verify() {
        let token = issue_token(SECRET, &user("admin"), 3600, Utc::now()).unwrap();
        let claims = verify_token(SECRET, &token).unwrap();
        assert_eq!(claims.user_id, 7);
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_claims_use_camel_case_user_id() {
        let claims = Claims {
            user_id: 7,
            role: "user".into(),
            exp: 10,
            iat: 0,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["userId"], 7);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issued = Utc::now() - chrono::Duration::hours(3);
        let token = issue_token(SECRET, &user("user"), 3600, issued).unwrap();
        match verify_token(SECRET, &token) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, MSG_TOKEN_EXPIRED),
            other => panic!("expected expiry rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(SECRET, &user("user"), 3600, Utc::now()).unwrap();
        match verify_token("other", &token) {
            Err(ApiError::Unauthorized(msg)) => assert_eq!(msg, MSG_TOKEN_INVALID),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_token_rejected() {
        let token = "a".repeat(defaults::MAX_TOKEN_LENGTH + 1);
        assert!(verify_token(SECRET, &token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc"));
        assert_eq!(extract_bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah", &hash));
        assert!(!verify_password("rahasia123", "not-a-phc-string"));
    }
}
