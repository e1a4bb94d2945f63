use serde_json::{json, Value};

pub fn word_payload(id: Option<&str>, prompt: &str, difficulty: u8) -> Value {
    let mut payload = json!({
        "prompt": prompt,
        "answers": ["answer", "alt answer"],
        "difficulty": difficulty,
        "frequency": 3,
        "situation": "test",
    });
    if let Some(id) = id {
        payload["id"] = json!(id);
    }
    payload
}

pub fn interaction(word_id: &str, kind: &str) -> Value {
    json!({ "wordId": word_id, "interactionKind": kind })
}

pub fn interaction_for(user_id: &str, word_id: &str, kind: &str) -> Value {
    json!({ "userId": user_id, "wordId": word_id, "interactionKind": kind })
}

pub fn ids(words: &Value) -> Vec<String> {
    words
        .as_array()
        .expect("array of words")
        .iter()
        .map(|w| w["id"].as_str().expect("word id").to_string())
        .collect()
}
