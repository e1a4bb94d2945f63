use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

pub const EMAIL_TOKEN_TTL_HOURS: i64 = 24;

/// Pending email verification, stored under the SHA-256 hash of the emailed token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailToken {
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

impl EmailToken {
    pub fn issue(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            expires_at: Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

pub trait EmailTokenRepository: Send + Sync {
    fn put_email_token(&self, token_hash: &str, token: &EmailToken) -> Result<(), StoreError>;

    fn get_email_token(&self, token_hash: &str) -> Result<Option<EmailToken>, StoreError>;

    /// Returns `false` when the token was already gone.
    fn delete_email_token(&self, token_hash: &str) -> Result<bool, StoreError>;

    fn purge_expired_email_tokens(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

impl EmailTokenRepository for Store {
    fn put_email_token(&self, token_hash: &str, token: &EmailToken) -> Result<(), StoreError> {
        let key = keys::email_token_key(token_hash)?;
        self.email_tokens
            .insert(key.as_bytes(), Self::serialize(token)?)?;
        Ok(())
    }

    fn get_email_token(&self, token_hash: &str) -> Result<Option<EmailToken>, StoreError> {
        let key = keys::email_token_key(token_hash)?;
        match self.email_tokens.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    fn delete_email_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let key = keys::email_token_key(token_hash)?;
        Ok(self.email_tokens.remove(key.as_bytes())?.is_some())
    }

    fn purge_expired_email_tokens(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut expired_keys = Vec::new();
        for item in self.email_tokens.iter() {
            let (key, value) = item?;
            match Self::deserialize::<EmailToken>(&value) {
                Ok(token) if token.is_expired(now) => expired_keys.push(key),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unreadable email token");
                    expired_keys.push(key);
                }
            }
        }

        let count = expired_keys.len();
        for key in expired_keys {
            self.email_tokens.remove(key)?;
        }
        Ok(count)
    }
}
