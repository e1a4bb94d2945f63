use chrono::Utc;

use crate::store::operations::email_tokens::EmailTokenRepository;

/// Removes verification tokens that are past their expiry.
pub async fn run(tokens: &dyn EmailTokenRepository) {
    tracing::debug!("email_token_cleanup: start");
    match tokens.purge_expired_email_tokens(Utc::now()) {
        Ok(count) => {
            if count > 0 {
                tracing::info!(cleaned = count, "email_token_cleanup: done");
            }
        }
        Err(e) => tracing::error!(error = %e, "email_token_cleanup failed"),
    }
}
