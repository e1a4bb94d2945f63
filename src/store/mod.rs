pub mod keys;
pub mod memory;
pub mod migrate;
pub mod operations;
pub mod seed;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::TransactionError;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub words: sled::Tree,
    pub word_order: sled::Tree,
    pub learning_history: sled::Tree,
    pub auth_users: sled::Tree,
    pub email_tokens: sled::Tree,
    pub meta: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(entity: &str, key: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }

    pub fn conflict(entity: &str, key: &str) -> Self {
        Self::Conflict {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let words = db.open_tree(trees::WORDS)?;
        let word_order = db.open_tree(trees::WORD_ORDER)?;
        let learning_history = db.open_tree(trees::LEARNING_HISTORY)?;
        let auth_users = db.open_tree(trees::AUTH_USERS)?;
        let email_tokens = db.open_tree(trees::EMAIL_TOKENS)?;
        let meta = db.open_tree(trees::META)?;

        Ok(Self {
            db,
            words,
            word_order,
            learning_history,
            auth_users,
            email_tokens,
            meta,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Monotonic sequence used to keep insertion order in ordering indexes.
    pub(crate) fn next_seq(&self) -> Result<u64, StoreError> {
        Ok(self.db.generate_id()?)
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Maps a sled transaction failure whose abort payload is already a `StoreError`.
pub(crate) fn map_tx_error(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(inner) => inner,
        TransactionError::Storage(se) => StoreError::Sled(se),
    }
}
