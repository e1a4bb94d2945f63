use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::store::operations::learning_history::{
    LearningHistoryRecord, LearningHistoryRepository,
};
use crate::store::operations::words::{Word, WordRepository};
use crate::store::StoreError;

/// Least-studied-first ordering.
///
/// A word's study count is the number of `history` records carrying its id,
/// whatever the interaction kind. The sort is stable, so words with equal
/// counts keep their position in `words`. Duplicate ids in `words` are
/// reported once.
pub fn select_for_study(
    words: Vec<Word>,
    history: &[LearningHistoryRecord],
    limit: usize,
) -> Vec<Word> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in history {
        *counts.entry(record.word_id.as_str()).or_default() += 1;
    }

    let mut seen = HashSet::new();
    let mut ranked: Vec<(usize, Word)> = words
        .into_iter()
        .filter(|w| seen.insert(w.id.clone()))
        .map(|w| (counts.get(w.id.as_str()).copied().unwrap_or(0), w))
        .collect();
    ranked.sort_by_key(|(count, _)| *count);

    ranked.into_iter().take(limit).map(|(_, w)| w).collect()
}

#[derive(Clone)]
pub struct StudySelector {
    words: Arc<dyn WordRepository>,
    history: Arc<dyn LearningHistoryRepository>,
}

impl StudySelector {
    pub fn new(
        words: Arc<dyn WordRepository>,
        history: Arc<dyn LearningHistoryRepository>,
    ) -> Self {
        Self { words, history }
    }

    pub fn select(&self, user_id: &str, limit: usize) -> Result<Vec<Word>, StoreError> {
        let words = self.words.list_words()?;
        let history = self.history.list_history_by_user(user_id)?;
        let selected = select_for_study(words, &history, limit);
        tracing::debug!(
            user_id,
            limit,
            history = history.len(),
            selected = selected.len(),
            "Selected words for study"
        );
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::operations::learning_history::InteractionKind;
    use crate::store::operations::words::sample_word;
    use crate::store::seed::seed_starter_words;

    fn ids(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.id.as_str()).collect()
    }

    #[test]
    fn no_history_keeps_listing_order() {
        let words: Vec<Word> = ["b", "a", "c"].iter().map(|id| sample_word(id, 1)).collect();
        let selected = select_for_study(words, &[], 2);
        assert_eq!(ids(&selected), vec!["b", "a"]);
    }

    #[test]
    fn studied_words_move_back_and_ties_are_stable() {
        let words: Vec<Word> = ["1", "2", "3"].iter().map(|id| sample_word(id, 1)).collect();
        let history = vec![
            LearningHistoryRecord::new("u", "1", InteractionKind::PassiveLearning),
            LearningHistoryRecord::new("u", "1", InteractionKind::ChoiceTest),
            LearningHistoryRecord::new("u", "2", InteractionKind::WritingTest),
        ];
        let selected = select_for_study(words, &history, 10);
        assert_eq!(ids(&selected), vec!["3", "2", "1"]);
    }

    #[test]
    fn duplicate_ids_are_reported_once() {
        let words = vec![sample_word("1", 1), sample_word("1", 2), sample_word("2", 1)];
        let selected = select_for_study(words, &[], 10);
        assert_eq!(ids(&selected), vec!["1", "2"]);
    }

    #[test]
    fn selector_over_seeded_store_puts_viewed_word_last() {
        let store = Arc::new(MemoryStore::new());
        seed_starter_words(store.as_ref()).unwrap();
        store
            .create_history(&LearningHistoryRecord::new("a", "1", InteractionKind::PassiveLearning))
            .unwrap();

        let selector = StudySelector::new(store.clone(), store.clone());
        let selected = selector.select("a", 12).unwrap();

        assert_eq!(
            ids(&selected),
            vec!["2", "3", "4", "5", "6", "7", "8", "9", "10", "1"]
        );
        assert_eq!(ids(&selector.select("other", 3).unwrap()), vec!["1", "2", "3"]);
    }
}
