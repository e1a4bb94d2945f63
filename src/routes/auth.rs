use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::auth::{cleared_session_cookie, session_cookie, MaybeUser};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify-email", post(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyEmailRequest {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResendVerificationRequest {
    #[serde(default)]
    email: String,
}

async fn signup(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let base_url = state.config().public_base_url();
    let outcome = state
        .accounts()
        .signup(&req.name, &req.email, &req.password, &base_url)
        .await?;
    Ok(ok(outcome))
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let result = state.accounts().login(&req.email, &req.password)?;
    let mut response = ok(result.outcome).into_response();
    if let Some(token) = result.token {
        append_set_cookie(
            &mut response,
            &session_cookie(&token, state.config().session_max_age_secs()),
        )?;
    }
    Ok(response)
}

async fn logout() -> Result<Response, AppError> {
    let mut response = ok(serde_json::json!({
        "success": true,
        "message": "Logged out",
    }))
    .into_response();
    append_set_cookie(&mut response, &cleared_session_cookie())?;
    Ok(response)
}

async fn verify_email(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(ok(state.accounts().verify_email(&req.token)?))
}

async fn resend_verification(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResendVerificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let base_url = state.config().public_base_url();
    Ok(ok(state
        .accounts()
        .resend_verification(&req.email, &base_url)?))
}

/// The caller's email, or `null` for anonymous callers.
async fn me(MaybeUser(user): MaybeUser) -> impl IntoResponse {
    ok(user.map(|u| u.email))
}

fn append_set_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::internal(&format!("cookie header invalid: {e}")))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
