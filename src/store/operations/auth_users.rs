use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{map_tx_error, Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    /// Always stored lower-cased.
    pub email: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn new(name: &str, email: &str, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password_hash,
            email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

pub trait AuthUserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    fn create_auth_user(&self, user: &AuthUser) -> Result<(), StoreError>;

    fn get_auth_user(&self, user_id: &str) -> Result<Option<AuthUser>, StoreError>;

    fn get_auth_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError>;

    fn set_email_verified(&self, user_id: &str) -> Result<AuthUser, StoreError>;

    fn count_auth_users(&self) -> Result<usize, StoreError>;
}

impl AuthUserRepository for Store {
    fn create_auth_user(&self, user: &AuthUser) -> Result<(), StoreError> {
        let user_key = keys::auth_user_key(&user.id)?;
        let email_key = keys::auth_user_email_index_key(&user.email);
        let user_bytes = Self::serialize(user)?;
        let email = user.email.clone();
        let user_id = user.id.clone();

        // Record and email index land together or not at all.
        self.auth_users
            .transaction(|tx| {
                if tx.get(email_key.as_bytes())?.is_some() {
                    return sled::transaction::abort(StoreError::conflict("user_email", &email));
                }
                tx.insert(email_key.as_bytes(), user_id.as_bytes())?;
                tx.insert(user_key.as_bytes(), user_bytes.as_slice())?;
                Ok(())
            })
            .map_err(map_tx_error)
    }

    fn get_auth_user(&self, user_id: &str) -> Result<Option<AuthUser>, StoreError> {
        let key = keys::auth_user_key(user_id)?;
        match self.auth_users.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    fn get_auth_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError> {
        let index_key = keys::auth_user_email_index_key(email);
        let Some(user_id_raw) = self.auth_users.get(index_key.as_bytes())? else {
            return Ok(None);
        };
        let user_id = match String::from_utf8(user_id_raw.to_vec()) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid UTF-8 in user email index");
                return Ok(None);
            }
        };
        self.get_auth_user(&user_id)
    }

    fn set_email_verified(&self, user_id: &str) -> Result<AuthUser, StoreError> {
        let mut user = self
            .get_auth_user(user_id)?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        let key = keys::auth_user_key(user_id)?;
        self.auth_users
            .insert(key.as_bytes(), Self::serialize(&user)?)?;
        Ok(user)
    }

    fn count_auth_users(&self) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for item in self.auth_users.iter() {
            let (key, _) = item?;
            if !key.starts_with(keys::EMAIL_INDEX_PREFIX.as_bytes()) {
                count += 1;
            }
        }
        Ok(count)
    }
}
