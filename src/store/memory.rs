//! In-memory repository implementations with the same observable behaviour as
//! the sled-backed [`Store`](crate::store::Store). Used by tests and by
//! callers that want a throwaway dataset.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::store::keys;
use crate::store::operations::auth_users::{AuthUser, AuthUserRepository};
use crate::store::operations::email_tokens::{EmailToken, EmailTokenRepository};
use crate::store::operations::learning_history::{
    LearningHistoryRecord, LearningHistoryRepository,
};
use crate::store::operations::words::{Word, WordRepository};
use crate::store::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    words: RwLock<Vec<Word>>,
    history: RwLock<Vec<LearningHistoryRecord>>,
    users: RwLock<HashMap<String, AuthUser>>,
    email_tokens: RwLock<BTreeMap<String, EmailToken>>,
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>, StoreError> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>, StoreError> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_words(words: impl IntoIterator<Item = Word>) -> Result<Self, StoreError> {
        let store = Self::new();
        for word in words {
            store.create_word(&word)?;
        }
        Ok(store)
    }
}

impl WordRepository for MemoryStore {
    fn list_words(&self) -> Result<Vec<Word>, StoreError> {
        Ok(read(&self.words)?.clone())
    }

    fn get_word(&self, word_id: &str) -> Result<Option<Word>, StoreError> {
        Ok(read(&self.words)?.iter().find(|w| w.id == word_id).cloned())
    }

    fn create_word(&self, word: &Word) -> Result<(), StoreError> {
        word.validate()?;
        keys::word_key(&word.id)?;
        let mut words = write(&self.words)?;
        match words.iter_mut().find(|w| w.id == word.id) {
            Some(existing) => *existing = word.clone(),
            None => words.push(word.clone()),
        }
        Ok(())
    }

    fn update_word(&self, word: &Word) -> Result<(), StoreError> {
        word.validate()?;
        let mut words = write(&self.words)?;
        let existing = words
            .iter_mut()
            .find(|w| w.id == word.id)
            .ok_or_else(|| StoreError::not_found("word", &word.id))?;
        *existing = word.clone();
        Ok(())
    }

    fn count_words(&self) -> Result<usize, StoreError> {
        Ok(read(&self.words)?.len())
    }
}

impl LearningHistoryRepository for MemoryStore {
    fn list_history(&self) -> Result<Vec<LearningHistoryRecord>, StoreError> {
        Ok(read(&self.history)?.clone())
    }

    fn list_history_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<LearningHistoryRecord>, StoreError> {
        Ok(read(&self.history)?
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn create_history(&self, record: &LearningHistoryRecord) -> Result<bool, StoreError> {
        keys::history_user_prefix(&record.user_id)?;
        keys::word_key(&record.word_id)?;
        let mut history = write(&self.history)?;
        if history.iter().any(|r| r.same_interaction(record)) {
            return Ok(false);
        }
        if history.iter().any(|r| r.id == record.id) {
            return Err(StoreError::conflict("learning_history", &record.id));
        }
        history.push(record.clone());
        Ok(true)
    }

    fn delete_history(&self, record_id: &str) -> Result<bool, StoreError> {
        let mut history = write(&self.history)?;
        let before = history.len();
        history.retain(|r| r.id != record_id);
        Ok(history.len() != before)
    }

    fn count_history(&self) -> Result<usize, StoreError> {
        Ok(read(&self.history)?.len())
    }
}

impl AuthUserRepository for MemoryStore {
    fn create_auth_user(&self, user: &AuthUser) -> Result<(), StoreError> {
        let mut users = write(&self.users)?;
        let email = user.email.trim().to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::conflict("user_email", &user.email));
        }
        let mut stored = user.clone();
        stored.email = email;
        users.insert(stored.id.clone(), stored);
        Ok(())
    }

    fn get_auth_user(&self, user_id: &str) -> Result<Option<AuthUser>, StoreError> {
        Ok(read(&self.users)?.get(user_id).cloned())
    }

    fn get_auth_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, StoreError> {
        let email = email.trim().to_lowercase();
        Ok(read(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn set_email_verified(&self, user_id: &str) -> Result<AuthUser, StoreError> {
        let mut users = write(&self.users)?;
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| StoreError::not_found("user", user_id))?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    fn count_auth_users(&self) -> Result<usize, StoreError> {
        Ok(read(&self.users)?.len())
    }
}

impl EmailTokenRepository for MemoryStore {
    fn put_email_token(&self, token_hash: &str, token: &EmailToken) -> Result<(), StoreError> {
        keys::email_token_key(token_hash)?;
        write(&self.email_tokens)?.insert(token_hash.to_string(), token.clone());
        Ok(())
    }

    fn get_email_token(&self, token_hash: &str) -> Result<Option<EmailToken>, StoreError> {
        Ok(read(&self.email_tokens)?.get(token_hash).cloned())
    }

    fn delete_email_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(write(&self.email_tokens)?.remove(token_hash).is_some())
    }

    fn purge_expired_email_tokens(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut tokens = write(&self.email_tokens)?;
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired(now));
        Ok(before - tokens.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::operations::learning_history::InteractionKind;
    use crate::store::operations::words::sample_word;

    #[test]
    fn words_keep_insertion_order_and_replace_in_place() {
        let store = MemoryStore::with_words(["1", "2", "10"].map(|id| sample_word(id, 1))).unwrap();
        let mut edited = sample_word("2", 5);
        edited.prompt = "edited".to_string();
        store.create_word(&edited).unwrap();

        let words = store.list_words().unwrap();
        let ids: Vec<&str> = words.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
        assert_eq!(words[1].prompt, "edited");
    }

    #[test]
    fn history_dedup_matches_sled_store() {
        let store = MemoryStore::new();
        let record = LearningHistoryRecord::new("a", "3", InteractionKind::PassiveLearning);
        assert!(store.create_history(&record).unwrap());
        assert!(!store
            .create_history(&LearningHistoryRecord::new("a", "3", InteractionKind::PassiveLearning))
            .unwrap());
        assert!(store
            .create_history(&LearningHistoryRecord::new("a", "3", InteractionKind::ChoiceTest))
            .unwrap());
        assert_eq!(store.count_history_by_user("a").unwrap(), 2);
        assert_eq!(store.delete_history_by_user("a").unwrap(), 2);
        assert_eq!(store.count_history().unwrap(), 0);
    }

    #[test]
    fn email_is_unique_case_insensitively() {
        let store = MemoryStore::new();
        store
            .create_auth_user(&AuthUser::new("A", "a@test.com", "h".to_string()))
            .unwrap();
        let err = store
            .create_auth_user(&AuthUser::new("B", "A@TEST.com", "h".to_string()))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }
}
