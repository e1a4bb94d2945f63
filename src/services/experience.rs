use serde::Serialize;

use crate::constants::EXP_PER_INTERACTION;
use crate::store::operations::learning_history::LearningHistoryRepository;
use crate::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub history_count: usize,
    pub experience: u64,
}

impl Experience {
    pub fn from_count(history_count: usize) -> Self {
        Self {
            history_count,
            experience: history_count as u64 * EXP_PER_INTERACTION,
        }
    }
}

/// Recomputed from the history on every call.
pub fn experience_for_user(
    history: &dyn LearningHistoryRepository,
    user_id: &str,
) -> Result<Experience, StoreError> {
    Ok(Experience::from_count(history.count_history_by_user(user_id)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::operations::learning_history::{InteractionKind, LearningHistoryRecord};

    #[test]
    fn experience_is_ten_per_record() {
        let store = MemoryStore::new();
        assert_eq!(experience_for_user(&store, "a").unwrap().experience, 0);

        for kind in InteractionKind::ALL {
            store
                .create_history(&LearningHistoryRecord::new("a", "1", kind))
                .unwrap();
        }
        store
            .create_history(&LearningHistoryRecord::new("a", "1", InteractionKind::ChoiceTest))
            .unwrap();

        let exp = experience_for_user(&store, "a").unwrap();
        assert_eq!(exp, Experience { history_count: 3, experience: 30 });
    }
}
