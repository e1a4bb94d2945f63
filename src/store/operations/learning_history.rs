use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{map_tx_error, Store, StoreError};

/// How the user interacted with a word. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InteractionKind {
    /// Flashcard shown and flipped.
    PassiveLearning,
    ChoiceTest,
    WritingTest,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [
        InteractionKind::PassiveLearning,
        InteractionKind::ChoiceTest,
        InteractionKind::WritingTest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PassiveLearning => "passiveLearning",
            Self::ChoiceTest => "choiceTest",
            Self::WritingTest => "writingTest",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::Validation(format!("unknown interaction kind: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningHistoryRecord {
    pub id: String,
    pub user_id: String,
    pub word_id: String,
    pub interaction_kind: InteractionKind,
}

impl LearningHistoryRecord {
    pub fn new(user_id: &str, word_id: &str, interaction_kind: InteractionKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            word_id: word_id.to_string(),
            interaction_kind,
        }
    }

    /// Two records describe the same interaction when user, word and kind all match.
    pub fn same_interaction(&self, other: &LearningHistoryRecord) -> bool {
        self.user_id == other.user_id
            && self.word_id == other.word_id
            && self.interaction_kind == other.interaction_kind
    }
}

/// Append-only log of study interactions, deduplicated per (user, word, kind).
pub trait LearningHistoryRepository: Send + Sync {
    fn list_history(&self) -> Result<Vec<LearningHistoryRecord>, StoreError>;

    fn list_history_by_user(&self, user_id: &str)
        -> Result<Vec<LearningHistoryRecord>, StoreError>;

    /// Returns `false` without writing when the same interaction is already recorded.
    fn create_history(&self, record: &LearningHistoryRecord) -> Result<bool, StoreError>;

    /// Returns `false` when no record has this id.
    fn delete_history(&self, record_id: &str) -> Result<bool, StoreError>;

    fn count_history(&self) -> Result<usize, StoreError>;

    fn count_history_by_user(&self, user_id: &str) -> Result<usize, StoreError> {
        Ok(self.list_history_by_user(user_id)?.len())
    }

    fn delete_all_history(&self) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for record in self.list_history()? {
            if self.delete_history(&record.id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn delete_history_by_user(&self, user_id: &str) -> Result<usize, StoreError> {
        let mut deleted = 0;
        for record in self.list_history_by_user(user_id)? {
            if self.delete_history(&record.id)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Stored value under `rec:{id}`; `seq` locates the ordering and user index keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HistoryEntry {
    pub seq: u64,
    pub record: LearningHistoryRecord,
}

impl Store {
    pub(crate) fn get_history_entry(
        &self,
        record_id: &str,
    ) -> Result<Option<HistoryEntry>, StoreError> {
        let key = keys::history_record_key(record_id)?;
        match self.learning_history.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    fn collect_indexed_history(
        &self,
        prefix: &str,
    ) -> Result<Vec<LearningHistoryRecord>, StoreError> {
        let mut records = Vec::new();
        for item in self.learning_history.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            let record_id = String::from_utf8_lossy(&value);
            match self.get_history_entry(&record_id)? {
                Some(entry) => records.push(entry.record),
                None => {
                    tracing::warn!(record_id = %record_id, "History index points at missing record")
                }
            }
        }
        Ok(records)
    }

    fn count_prefix(&self, prefix: &str) -> Result<usize, StoreError> {
        let mut count = 0usize;
        for item in self.learning_history.scan_prefix(prefix.as_bytes()) {
            let _ = item?;
            count += 1;
        }
        Ok(count)
    }
}

impl LearningHistoryRepository for Store {
    fn list_history(&self) -> Result<Vec<LearningHistoryRecord>, StoreError> {
        self.collect_indexed_history(keys::HISTORY_ORDER_PREFIX)
    }

    fn list_history_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<LearningHistoryRecord>, StoreError> {
        let prefix = keys::history_user_prefix(user_id)?;
        self.collect_indexed_history(&prefix)
    }

    fn create_history(&self, record: &LearningHistoryRecord) -> Result<bool, StoreError> {
        keys::word_key(&record.word_id)?;

        // Check-then-insert is not atomic across concurrent requests for the same triple.
        let existing = self.list_history_by_user(&record.user_id)?;
        if existing.iter().any(|r| r.same_interaction(record)) {
            tracing::debug!(
                user_id = %record.user_id,
                word_id = %record.word_id,
                kind = %record.interaction_kind,
                "Interaction already recorded, skipping"
            );
            return Ok(false);
        }

        let seq = self.next_seq()?;
        let record_key = keys::history_record_key(&record.id)?;
        let order_key = keys::history_order_key(seq);
        let user_key = keys::history_user_index_key(&record.user_id, seq)?;
        let entry = Self::serialize(&HistoryEntry {
            seq,
            record: record.clone(),
        })?;
        let record_id = record.id.clone();

        self.learning_history
            .transaction(|tx| {
                if tx.get(record_key.as_bytes())?.is_some() {
                    return sled::transaction::abort(StoreError::conflict(
                        "learning_history",
                        &record_id,
                    ));
                }
                tx.insert(record_key.as_bytes(), entry.as_slice())?;
                tx.insert(order_key.as_bytes(), record_id.as_bytes())?;
                tx.insert(user_key.as_bytes(), record_id.as_bytes())?;
                Ok(())
            })
            .map_err(map_tx_error)?;

        Ok(true)
    }

    fn delete_history(&self, record_id: &str) -> Result<bool, StoreError> {
        let Some(entry) = self.get_history_entry(record_id)? else {
            return Ok(false);
        };

        let record_key = keys::history_record_key(record_id)?;
        let order_key = keys::history_order_key(entry.seq);
        let user_key = keys::history_user_index_key(&entry.record.user_id, entry.seq)?;

        self.learning_history
            .transaction(|tx| {
                tx.remove(record_key.as_bytes())?;
                tx.remove(order_key.as_bytes())?;
                tx.remove(user_key.as_bytes())?;
                Ok(())
            })
            .map_err(map_tx_error)?;

        Ok(true)
    }

    fn count_history(&self) -> Result<usize, StoreError> {
        self.count_prefix(keys::HISTORY_RECORD_PREFIX)
    }

    fn count_history_by_user(&self, user_id: &str) -> Result<usize, StoreError> {
        let prefix = keys::history_user_prefix(user_id)?;
        self.count_prefix(&prefix)
    }
}
