use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::AUTH_COOKIE_NAME;
use crate::response::AppError;
use crate::state::AppState;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|v| v.to_string())
        .map_err(|e| AppError::internal(&format!("password hash failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(&format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Verified against when the account does not exist so both paths cost the same.
pub fn dummy_password_hash() -> String {
    "$argon2id$v=19$m=19456,t=2,p=1$ZHVtbXlzYWx0ZHVtbXk$YWJjZGVmZ2hpamtsbW5vcHFyc3R1dnd4eXoxMjM0NTY".to_string()
}

/// Hex SHA-256, used to store email tokens without keeping the raw value.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: String,
}

pub fn sign_session_token(
    user_id: &str,
    email: &str,
    secret: &str,
    expires_in_hours: u64,
) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(expires_in_hours as i64);
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
        jti: uuid::Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(&format!("jwt sign failed: {e}")))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.algorithms = vec![Algorithm::HS256];

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth_header| auth_header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn extract_cookie_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let prefix = format!("{cookie_name}=");
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookie| cookie.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
        .filter(|token| !token.is_empty())
}

/// Bearer header first, then the session cookie.
pub fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie_token(headers, AUTH_COOKIE_NAME))
}

pub fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{AUTH_COOKIE_NAME}={token}; HttpOnly; Path=/; SameSite=Strict; Max-Age={max_age_secs}"
    )
}

pub fn cleared_session_cookie() -> String {
    format!("{AUTH_COOKIE_NAME}=; HttpOnly; Path=/; SameSite=Strict; Max-Age=0")
}

/// Authenticated caller. Rejects with 401 when the token is missing, invalid,
/// or names an account that no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
}

/// Optional identity: anonymous callers get `MaybeUser(None)`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

fn resolve_user(headers: &HeaderMap, app_state: &AppState) -> Result<CurrentUser, AppError> {
    let token = extract_token_from_headers(headers)
        .ok_or_else(|| AppError::unauthorized("Missing authentication token"))?;
    let claims = verify_jwt(&token, &app_state.config().jwt_secret)?;

    let user = app_state
        .repos()
        .users
        .get_auth_user(&claims.sub)?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;

    Ok(CurrentUser {
        user_id: user.id,
        email: user.email,
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        resolve_user(&parts.headers, &app_state)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match resolve_user(&parts.headers, &app_state) {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(e) if e.is_operational => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn password_hash_and_verify() {
        let hash = hash_password("password123").unwrap();
        assert!(verify_password("password123", &hash).unwrap());
        assert!(!verify_password("password124", &hash).unwrap());
    }

    #[test]
    fn jwt_round_trip_carries_email() {
        let token = sign_session_token("u1", "a@test.com", "secret", 1).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.email, "a@test.com");
        assert!(!claims.jti.is_empty());
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; auth_token=from-cookie"),
        );
        assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(extract_token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", 604800);
        assert!(cookie.starts_with("auth_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(session_cookie("abc", 3600).ends_with("Max-Age=3600"));
        assert!(cleared_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn token_hash_is_hex_sha256() {
        let hashed = hash_token("abc");
        assert_eq!(hashed.len(), 64);
        assert_eq!(hashed, hash_token("abc"));
    }
}
