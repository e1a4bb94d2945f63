use crate::store::StoreError;

/// Key segments are joined with `:` so a segment must never contain one.
fn validate_segment(kind: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{kind} must not be empty")));
    }
    if value.contains(':') {
        return Err(StoreError::Validation(format!(
            "{kind} must not contain ':'"
        )));
    }
    Ok(())
}

pub fn word_key(word_id: &str) -> Result<String, StoreError> {
    validate_segment("word id", word_id)?;
    Ok(word_id.to_string())
}

pub fn word_order_key(seq: u64) -> [u8; 8] {
    seq.to_be_bytes()
}

pub const HISTORY_RECORD_PREFIX: &str = "rec:";
pub const HISTORY_ORDER_PREFIX: &str = "seq:";

pub fn history_record_key(record_id: &str) -> Result<String, StoreError> {
    validate_segment("history id", record_id)?;
    Ok(format!("{HISTORY_RECORD_PREFIX}{record_id}"))
}

pub fn history_order_key(seq: u64) -> String {
    format!("{HISTORY_ORDER_PREFIX}{seq:020}")
}

pub fn history_user_index_key(user_id: &str, seq: u64) -> Result<String, StoreError> {
    validate_segment("user id", user_id)?;
    Ok(format!("user:{user_id}:{seq:020}"))
}

pub fn history_user_prefix(user_id: &str) -> Result<String, StoreError> {
    validate_segment("user id", user_id)?;
    Ok(format!("user:{user_id}:"))
}

pub const EMAIL_INDEX_PREFIX: &str = "email:";

pub fn auth_user_key(user_id: &str) -> Result<String, StoreError> {
    validate_segment("user id", user_id)?;
    Ok(user_id.to_string())
}

pub fn auth_user_email_index_key(email: &str) -> String {
    format!("{EMAIL_INDEX_PREFIX}{}", email.trim().to_lowercase())
}

pub fn email_token_key(token_hash: &str) -> Result<String, StoreError> {
    validate_segment("token hash", token_hash)?;
    Ok(token_hash.to_string())
}
