use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use word_refresher::config::{Config, MailConfig, MailProvider, RateLimitConfig, WorkerConfig};
use word_refresher::routes::build_router;
use word_refresher::services::mailer::MemoryMailer;
use word_refresher::state::{AppState, Repositories};
use word_refresher::store::seed::seed_starter_words;
use word_refresher::store::Store;

pub const TEST_BASE_URL: &str = "http://app.test";
pub const TEST_PORT: u16 = 8765;
pub const SPA_INDEX: &str = "<!doctype html><title>word refresher</title>";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub store: Arc<Store>,
    pub mailer: MemoryMailer,
    _temp_dir: TempDir,
}

pub struct TestOptions {
    pub auth_limit: u64,
    pub seed_words: bool,
    pub app_base_url: Option<String>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            auth_limit: 1_000,
            seed_words: true,
            app_base_url: Some(TEST_BASE_URL.to_string()),
        }
    }
}

pub async fn spawn_with(options: TestOptions) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("word-refresher-test.sled");
    let static_dir = temp_dir.path().join("public");
    std::fs::create_dir_all(&static_dir).expect("static dir");
    std::fs::write(static_dir.join("index.html"), SPA_INDEX).expect("index.html");

    // Built directly so parallel tests never race on process env vars.
    let config = Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: TEST_PORT,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path: sled_path.to_string_lossy().to_string(),
        jwt_secret: format!("integration-test-jwt-secret-{}", uuid::Uuid::new_v4()),
        jwt_expires_in_hours: 24,
        cors_origin: "http://localhost:5173".to_string(),
        trust_proxy: false,
        app_base_url: options.app_base_url,
        static_dir: static_dir.to_string_lossy().to_string(),
        seed_words: options.seed_words,
        rate_limit: RateLimitConfig {
            window_secs: 60,
            max_requests: options.auth_limit,
        },
        worker: WorkerConfig { is_leader: false },
        mail: MailConfig {
            provider: MailProvider::Log,
            from_name: "Word Refresher".to_string(),
        },
    };

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");
    let repos = Repositories::from_store(store.clone());
    if options.seed_words {
        seed_starter_words(repos.words.as_ref()).expect("seed words");
    }

    let mailer = MemoryMailer::new();
    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(repos, Arc::new(mailer.clone()), &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        store,
        mailer,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(TestOptions::default()).await
}

pub async fn spawn_empty_app() -> TestApp {
    spawn_with(TestOptions {
        seed_words: false,
        ..TestOptions::default()
    })
    .await
}

pub async fn spawn_with_auth_limit(auth_limit: u64) -> TestApp {
    spawn_with(TestOptions {
        auth_limit,
        ..TestOptions::default()
    })
    .await
}

pub async fn spawn_without_base_url() -> TestApp {
    spawn_with(TestOptions {
        app_base_url: None,
        ..TestOptions::default()
    })
    .await
}
