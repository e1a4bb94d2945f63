use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::middleware::rate_limit::RateLimitState;
use crate::services::accounts::AccountService;
use crate::services::mailer::Mailer;
use crate::services::study::StudySelector;
use crate::store::memory::MemoryStore;
use crate::store::operations::auth_users::AuthUserRepository;
use crate::store::operations::email_tokens::EmailTokenRepository;
use crate::store::operations::learning_history::LearningHistoryRepository;
use crate::store::operations::words::WordRepository;
use crate::store::Store;

/// Repository handles injected into the application. Each one can be backed
/// by a different implementation.
#[derive(Clone)]
pub struct Repositories {
    pub words: Arc<dyn WordRepository>,
    pub history: Arc<dyn LearningHistoryRepository>,
    pub users: Arc<dyn AuthUserRepository>,
    pub email_tokens: Arc<dyn EmailTokenRepository>,
}

impl Repositories {
    pub fn from_store(store: Arc<Store>) -> Self {
        Self {
            words: store.clone(),
            history: store.clone(),
            users: store.clone(),
            email_tokens: store,
        }
    }

    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            words: store.clone(),
            history: store.clone(),
            users: store.clone(),
            email_tokens: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    repos: Repositories,
    accounts: AccountService,
    study: StudySelector,
    rate_limit: Arc<RateLimitState>,
    config: Arc<Config>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        config: &Config,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        let accounts = AccountService::new(
            repos.users.clone(),
            repos.email_tokens.clone(),
            mailer,
            &config.jwt_secret,
            config.jwt_expires_in_hours,
        );
        let study = StudySelector::new(repos.words.clone(), repos.history.clone());
        let rate_limit = Arc::new(RateLimitState::new(
            config.rate_limit.window_secs,
            config.rate_limit.max_requests,
        ));

        Self {
            repos,
            accounts,
            study,
            rate_limit,
            config: Arc::new(config.clone()),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn repos(&self) -> &Repositories {
        &self.repos
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn study(&self) -> &StudySelector {
        &self.study
    }

    pub fn rate_limit(&self) -> &Arc<RateLimitState> {
        &self.rate_limit
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
