/// Words returned by the study selector when the caller gives no limit.
pub const DEFAULT_STUDY_LIMIT: usize = 12;

/// Experience granted per recorded interaction, flat across interaction kinds.
pub const EXP_PER_INTERACTION: u64 = 10;

pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Random bytes in an email verification token before hex encoding.
pub const EMAIL_TOKEN_BYTES: usize = 32;
