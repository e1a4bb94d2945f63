use crate::store::operations::words::{Word, WordRepository};
use crate::store::StoreError;

/// (id, prompt, answers, difficulty, frequency, situation)
const STARTER_WORDS: &[(&str, &str, &[&str], u8, u8, &str)] = &[
    ("1", "おはよう", &["good morning", "morning"], 1, 5, "greeting"),
    ("2", "ありがとう", &["thank you", "thanks"], 1, 5, "greeting"),
    ("3", "すみません", &["excuse me", "sorry"], 1, 5, "daily"),
    ("4", "駅", &["station", "train station"], 1, 4, "travel"),
    ("5", "切符", &["ticket"], 2, 3, "travel"),
    ("6", "予約", &["reservation", "booking"], 2, 4, "restaurant"),
    ("7", "お会計", &["the bill", "check"], 2, 4, "restaurant"),
    ("8", "締め切り", &["deadline"], 3, 3, "business"),
    ("9", "打ち合わせ", &["meeting", "briefing"], 3, 4, "business"),
    ("10", "見積もり", &["estimate", "quotation", "quote"], 4, 2, "business"),
];

pub fn starter_words() -> Vec<Word> {
    STARTER_WORDS
        .iter()
        .map(|(id, prompt, answers, difficulty, frequency, situation)| Word {
            id: (*id).to_string(),
            prompt: (*prompt).to_string(),
            answers: answers.iter().map(|a| (*a).to_string()).collect(),
            difficulty: *difficulty,
            frequency: *frequency,
            situation: (*situation).to_string(),
        })
        .collect()
}

/// Inserts the starter word list when the store holds no words. Returns how many were written.
pub fn seed_starter_words(words: &dyn WordRepository) -> Result<usize, StoreError> {
    if words.count_words()? > 0 {
        tracing::debug!("Word store not empty, skipping seed");
        return Ok(0);
    }
    let starter = starter_words();
    for word in &starter {
        words.create_word(word)?;
    }
    tracing::info!(count = starter.len(), "Seeded starter words");
    Ok(starter.len())
}
