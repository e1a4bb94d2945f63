pub const WORDS: &str = "words";
pub const WORD_ORDER: &str = "word_order";
pub const LEARNING_HISTORY: &str = "learning_history";
pub const AUTH_USERS: &str = "auth_users";
pub const EMAIL_TOKENS: &str = "email_tokens";
pub const META: &str = "meta";
