pub mod auth_users;
pub mod email_tokens;
pub mod learning_history;
pub mod words;
