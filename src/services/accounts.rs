use std::sync::Arc;

use chrono::Utc;
use rand::RngCore;
use serde::Serialize;

use crate::auth::{self, hash_password, hash_token, verify_password};
use crate::constants::EMAIL_TOKEN_BYTES;
use crate::response::AppError;
use crate::services::mailer::{verification_email, Mailer};
use crate::store::operations::auth_users::{AuthUser, AuthUserRepository};
use crate::store::operations::email_tokens::{EmailToken, EmailTokenRepository};
use crate::store::StoreError;
use crate::validation::{is_valid_email, validate_name, validate_password};

const INVALID_CREDENTIALS: &str = "Incorrect email address or password";
const RESEND_MESSAGE: &str =
    "If an unverified account exists for this address, a new verification email has been sent";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
}

impl From<&AuthUser> for PublicUser {
    fn from(value: &AuthUser) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            email: value.email.clone(),
            email_verified: value.email_verified,
        }
    }
}

/// Result of an account flow. Expected failures (bad input, duplicate email,
/// wrong password) are reported here with `success: false`, not as errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    pub user: Option<PublicUser>,
}

impl AuthOutcome {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            user: None,
        }
    }

    fn success(message: &str, user: &AuthUser) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            user: Some(PublicUser::from(user)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoginResult {
    pub outcome: AuthOutcome,
    /// Signed session token, present only on success.
    pub token: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn AuthUserRepository>,
    tokens: Arc<dyn EmailTokenRepository>,
    mailer: Arc<dyn Mailer>,
    jwt_secret: String,
    jwt_expires_in_hours: u64,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn AuthUserRepository>,
        tokens: Arc<dyn EmailTokenRepository>,
        mailer: Arc<dyn Mailer>,
        jwt_secret: &str,
        jwt_expires_in_hours: u64,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            jwt_secret: jwt_secret.to_string(),
            jwt_expires_in_hours,
        }
    }

    /// Creates an unverified account and emails a verification link built on `base_url`.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
        base_url: &str,
    ) -> Result<AuthOutcome, AppError> {
        if let Err(msg) = validate_name(name) {
            return Ok(AuthOutcome::failure(msg));
        }
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Ok(AuthOutcome::failure("Enter a valid email address"));
        }
        if let Err(msg) = validate_password(password) {
            return Ok(AuthOutcome::failure(msg));
        }

        let user = AuthUser::new(name, &email, hash_password(password)?);
        match self.users.create_auth_user(&user) {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                return Ok(AuthOutcome::failure(
                    "This email address is already registered",
                ));
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!(user_id = %user.id, email = %mask_email_for_log(&user.email), "Account created");

        self.send_verification(&user, base_url)?;

        Ok(AuthOutcome::success(
            "Registration complete. Check your inbox to verify your email address",
            &user,
        ))
    }

    pub fn verify_email(&self, raw_token: &str) -> Result<AuthOutcome, AppError> {
        let raw_token = raw_token.trim();
        if raw_token.is_empty() {
            return Ok(AuthOutcome::failure("Verification token is required"));
        }
        let token_hash = hash_token(raw_token);
        let Some(token) = self.tokens.get_email_token(&token_hash)? else {
            return Ok(AuthOutcome::failure("Invalid or expired verification link"));
        };

        if token.is_expired(Utc::now()) {
            self.tokens.delete_email_token(&token_hash)?;
            tracing::info!(user_id = %token.user_id, "Expired verification token rejected");
            return Ok(AuthOutcome::failure("Invalid or expired verification link"));
        }

        let user = match self.users.set_email_verified(&token.user_id) {
            Ok(user) => user,
            Err(StoreError::NotFound { .. }) => {
                self.tokens.delete_email_token(&token_hash)?;
                return Ok(AuthOutcome::failure("Invalid or expired verification link"));
            }
            Err(e) => return Err(e.into()),
        };
        self.tokens.delete_email_token(&token_hash)?;
        tracing::info!(user_id = %user.id, "Email verified");

        Ok(AuthOutcome::success("Email address verified", &user))
    }

    /// Always answers with the same message so callers cannot probe for accounts.
    pub fn resend_verification(&self, email: &str, base_url: &str) -> Result<AuthOutcome, AppError> {
        if let Some(user) = self.users.get_auth_user_by_email(email)? {
            if !user.email_verified {
                self.send_verification(&user, base_url)?;
            }
        }
        Ok(AuthOutcome {
            success: true,
            message: RESEND_MESSAGE.to_string(),
            user: None,
        })
    }

    pub fn login(&self, email: &str, password: &str) -> Result<LoginResult, AppError> {
        let failed = |message: &str| LoginResult {
            outcome: AuthOutcome::failure(message),
            token: None,
        };

        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Ok(failed("Enter a valid email address"));
        }
        if password.is_empty() {
            return Ok(failed("Enter your password"));
        }

        let Some(user) = self.users.get_auth_user_by_email(&email)? else {
            // Burn the same argon2 work as a real check.
            let _ = verify_password(password, &auth::dummy_password_hash());
            return Ok(failed(INVALID_CREDENTIALS));
        };
        if !verify_password(password, &user.password_hash)? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Ok(failed(INVALID_CREDENTIALS));
        }
        if !user.email_verified {
            return Ok(failed(
                "Email address not verified. Check your inbox for the verification link",
            ));
        }

        let token = auth::sign_session_token(
            &user.id,
            &user.email,
            &self.jwt_secret,
            self.jwt_expires_in_hours,
        )?;
        tracing::info!(user_id = %user.id, "Login succeeded");

        Ok(LoginResult {
            outcome: AuthOutcome::success("Logged in", &user),
            token: Some(token),
        })
    }

    /// Stores a fresh token and hands the email to a background task.
    /// Delivery failures are logged and never reach the caller.
    fn send_verification(&self, user: &AuthUser, base_url: &str) -> Result<(), AppError> {
        let raw_token = generate_email_token();
        self.tokens
            .put_email_token(&hash_token(&raw_token), &EmailToken::issue(&user.id))?;

        let link = format!(
            "{}/verify-email?token={raw_token}",
            base_url.trim_end_matches('/')
        );
        let message = verification_email(&user.email, &user.name, &link);
        let mailer = Arc::clone(&self.mailer);
        let user_id = user.id.clone();
        tokio::spawn(async move {
            match mailer.send(message).await {
                Ok(()) => tracing::debug!(user_id = %user_id, "Verification email sent"),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Verification email failed")
                }
            }
        });
        Ok(())
    }
}

fn generate_email_token() -> String {
    let mut bytes = [0u8; EMAIL_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn mask_email_for_log(email: &str) -> String {
    let Some((local, domain)) = email.trim().split_once('@') else {
        return "***".to_string();
    };
    let mask = |part: &str| {
        part.chars()
            .next()
            .map(|ch| format!("{ch}***"))
            .unwrap_or_else(|| "***".to_string())
    };
    format!("{}@{}", mask(local), mask(domain))
}
