use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::store::keys;
use crate::store::{map_tx_error, Store, StoreError};

/// A flashcard: a prompt in one language paired with one or more answers in another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: String,
    pub prompt: String,
    /// Ordered; the first answer is the canonical one used for audio playback.
    pub answers: Vec<String>,
    pub difficulty: u8,
    pub frequency: u8,
    pub situation: String,
}

impl Word {
    pub fn canonical_answer(&self) -> Option<&str> {
        self.answers.first().map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.prompt.trim().is_empty() {
            return Err(StoreError::Validation("prompt is required".to_string()));
        }
        if self.answers.is_empty() || self.answers.iter().any(|a| a.trim().is_empty()) {
            return Err(StoreError::Validation(
                "at least one non-empty answer is required".to_string(),
            ));
        }
        if self.difficulty == 0 || self.frequency == 0 {
            return Err(StoreError::Validation(
                "difficulty and frequency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

pub trait WordRepository: Send + Sync {
    /// All words in enumeration order (insertion order for both stores).
    fn list_words(&self) -> Result<Vec<Word>, StoreError>;

    fn get_word(&self, word_id: &str) -> Result<Option<Word>, StoreError>;

    /// Inserts the word; an existing word with the same id is replaced in place.
    fn create_word(&self, word: &Word) -> Result<(), StoreError>;

    fn update_word(&self, word: &Word) -> Result<(), StoreError>;

    fn count_words(&self) -> Result<usize, StoreError>;

    fn words_by_difficulty(&self, difficulty: u8) -> Result<Vec<Word>, StoreError> {
        Ok(self
            .list_words()?
            .into_iter()
            .filter(|w| w.difficulty == difficulty)
            .collect())
    }
}

impl WordRepository for Store {
    fn list_words(&self) -> Result<Vec<Word>, StoreError> {
        let mut words = Vec::with_capacity(self.word_order.len());
        for item in self.word_order.iter() {
            let (_, value) = item?;
            let word_id = String::from_utf8_lossy(&value);
            match self.get_word(&word_id)? {
                Some(word) => words.push(word),
                None => tracing::warn!(word_id = %word_id, "Word order index points at missing word"),
            }
        }
        Ok(words)
    }

    fn get_word(&self, word_id: &str) -> Result<Option<Word>, StoreError> {
        // An id that cannot be a key cannot name a stored word.
        let Ok(key) = keys::word_key(word_id) else {
            return Ok(None);
        };
        match self.words.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    fn create_word(&self, word: &Word) -> Result<(), StoreError> {
        word.validate()?;
        let key = keys::word_key(&word.id)?;
        let value = Self::serialize(word)?;
        let order_key = keys::word_order_key(self.next_seq()?);
        let word_id = word.id.clone();

        // Word and its ordering entry are committed together; a replace keeps the old position.
        (&self.words, &self.word_order)
            .transaction(|(words, order)| {
                let existed = words.insert(key.as_bytes(), value.as_slice())?.is_some();
                if !existed {
                    order.insert(&order_key[..], word_id.as_bytes())?;
                }
                Ok(())
            })
            .map_err(map_tx_error)
    }

    fn update_word(&self, word: &Word) -> Result<(), StoreError> {
        word.validate()?;
        let key = match keys::word_key(&word.id) {
            Ok(key) if self.words.contains_key(key.as_bytes())? => key,
            _ => return Err(StoreError::not_found("word", &word.id)),
        };
        self.words.insert(key.as_bytes(), Self::serialize(word)?)?;
        Ok(())
    }

    fn count_words(&self) -> Result<usize, StoreError> {
        Ok(self.words.len())
    }
}

#[cfg(test)]
pub(crate) fn sample_word(id: &str, difficulty: u8) -> Word {
    Word {
        id: id.to_string(),
        prompt: format!("prompt-{id}"),
        answers: vec![format!("answer-{id}"), format!("alt-{id}")],
        difficulty,
        frequency: 3,
        situation: "daily".to_string(),
    }
}
